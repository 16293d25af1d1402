use std::ops::AddAssign;
use log::info;
use crate::reduction_rules::RuleCounts;

/// Counters of a branch and bound run. `time_took` is in milliseconds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    pub rounds: u64,
    pub calls: u64,
    pub branches: u64,
    pub infeasible_branches: u64,
    pub packing_prunes: u64,
    pub parent_prunes: u64,
    pub reductions: RuleCounts,
    pub time_took: u128,
}

impl SearchStats {

    pub fn new() -> Self {
        SearchStats::default()
    }

    /// Writes all counters as one line at info level.
    pub fn log(&self, name: &str) {
        info!(
            "{}: rounds {}, calls {}, branches {}, infeasible {}, packing prunes {}, parent prunes {}, reduced by loops {} / sources and sinks {} / merges {}, {} ms",
            name,
            self.rounds,
            self.calls,
            self.branches,
            self.infeasible_branches,
            self.packing_prunes,
            self.parent_prunes,
            self.reductions.loops,
            self.reductions.sources_sinks,
            self.reductions.merges,
            self.time_took,
        );
    }
}

impl AddAssign for SearchStats {
    fn add_assign(&mut self, other: Self) {
        self.rounds += other.rounds;
        self.calls += other.calls;
        self.branches += other.branches;
        self.infeasible_branches += other.infeasible_branches;
        self.packing_prunes += other.packing_prunes;
        self.parent_prunes += other.parent_prunes;
        self.reductions += other.reductions;
        self.time_took += other.time_took;
    }
}
