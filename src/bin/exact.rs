use std::error;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use clap::{Arg, Command};
use log::{error, info, warn, LevelFilter};
use regex::Regex;

use dfvs_solver::{
    dfvs_instance::DFVSInstance,
    branch_and_bound::{BranchAndBound, PolicyKind, SolverConfig},
    log::build_logger_for_verbosity,
};

pub fn main() -> Result<(), Box<dyn error::Error>> {
    let m = Command::new("exact")
        .about("Computes a minimum directed feedback vertex set of an edge list")
        .arg(Arg::new("input")
             .index(1)
             .takes_value(true)
             .help("Edge list to read, stdin if omitted"))
        .arg(Arg::new("timeout")
             .short('t')
             .long("timeout")
             .takes_value(true)
             .validator_regex(Regex::new("^[0-9]+$")?, "the timeout is a number of seconds")
             .help("Time limit in seconds"))
        .arg(Arg::new("policy")
             .short('p')
             .long("policy")
             .takes_value(true)
             .possible_values(["max-min-degree", "input-order", "min-degree"])
             .default_value("max-min-degree"))
        .arg(Arg::new("no-packing")
             .long("no-packing")
             .help("Disables the packing lower bounds"))
        .arg(Arg::new("exhaustive")
             .long("exhaustive-below")
             .takes_value(true)
             .validator_regex(Regex::new("^[0-9]+$")?, "expected a number of nodes")
             .help("Solves components with at most this many nodes by enumeration"))
        .arg(Arg::new("optimum")
             .long("optimum")
             .takes_value(true)
             .validator_regex(Regex::new("^[0-9]+$")?, "expected a solution size")
             .help("Known optimum the solution is checked against"))
        .arg(Arg::new("verbose")
             .short('v')
             .multiple_occurrences(true))
        .get_matches();
    build_logger_for_verbosity(LevelFilter::Warn, m.occurrences_of("verbose") as usize);

    let time_limit = m.value_of("timeout").map(|t| t.parse::<u64>()).transpose()?.map(Duration::from_secs);
    let policy: PolicyKind = m.value_of("policy").unwrap_or("max-min-degree").parse()?;
    let exhaustive_threshold = m.value_of("exhaustive").map(|t| t.parse::<usize>()).transpose()?.unwrap_or(0);
    let config = SolverConfig {
        time_limit,
        policy,
        use_packing: !m.is_present("no-packing"),
        exhaustive_threshold,
    };

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = interrupt.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    let mut instance = match m.value_of("input") {
        Some(path) => {
            let path = PathBuf::from(path);
            let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            DFVSInstance::read_edge_list(&name, BufReader::new(File::open(&path)?))?
        },
        None => {
            let stdin = io::stdin();
            let lock = stdin.lock();
            DFVSInstance::read_edge_list("stdin", lock)?
        },
    };
    instance.known_optimum = m.value_of("optimum").map(|o| o.parse::<usize>()).transpose()?;
    info!("{}: {} nodes, {} edges", instance.name, instance.graph.num_nodes(), instance.graph.num_edges());

    let mut solver = BranchAndBound::new(config).with_interrupt(interrupt);
    match instance.solve(&mut solver) {
        Ok(solution) => {
            info!("{}: solution with {} nodes", instance.name, solution.len());
            let stdout = io::stdout();
            instance.write_solution(&solution, stdout.lock())?;
            Ok(())
        },
        Err(e) if e.is_cancellation() => {
            warn!("{}: no solution within the time budget ({})", instance.name, e);
            Err(Box::new(e))
        },
        Err(e) => {
            error!("{}", e);
            Err(Box::new(e))
        },
    }
}
