//! Logger setup. Every line starts with `c` and the seconds since start, so the log can be
//! interleaved with solver output on a terminal.

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;
use std::time::Instant;

/// Builds the logger. `RUST_LOG` takes precedence, otherwise `level` is used.
pub fn build_logger_for_level(level: LevelFilter) {
    let start_time = Instant::now();
    let env = Env::default().default_filter_or(level.as_str());
    Builder::from_env(env)
        .format(move |buf, record| {
            let elapsed = start_time.elapsed().as_millis();
            writeln!(buf, "c {:>6}.{:03} [{:<5}] - {}", elapsed / 1000, elapsed % 1000, record.level(), record.args())
        })
        .init();
}

/// Builds the logger with `default_level` raised by `verbosity` levels, unless `RUST_LOG` is set.
pub fn build_logger_for_verbosity(default_level: LevelFilter, verbosity: usize) {
    build_logger_for_level(level_from_verbosity(default_level, verbosity));
}

fn level_from_verbosity(default_level: LevelFilter, verbosity: usize) -> LevelFilter {
    let levels = [
        LevelFilter::Off,
        LevelFilter::Error,
        LevelFilter::Warn,
        LevelFilter::Info,
        LevelFilter::Debug,
        LevelFilter::Trace,
    ];
    let index = levels.iter().position(|l| *l == default_level).unwrap_or(0) + verbosity;
    levels.get(index).copied().unwrap_or(LevelFilter::Trace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_from_verbosity_test() {
        assert_eq!(level_from_verbosity(LevelFilter::Off, 5), LevelFilter::Trace);
        assert_eq!(level_from_verbosity(LevelFilter::Warn, 1), LevelFilter::Info);
        assert_eq!(level_from_verbosity(LevelFilter::Error, 0), LevelFilter::Error);
        assert_eq!(level_from_verbosity(LevelFilter::Trace, 3), LevelFilter::Trace);
    }
}
