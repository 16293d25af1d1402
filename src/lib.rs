pub mod cust_errors;
pub mod other_ds;
pub mod digraph;
pub mod scc;
pub mod cycle_finder;
pub mod reduction_rules;
pub mod packing;
pub mod branch_and_bound;
pub mod exhaustive;
pub mod dfvs_instance;
pub mod stats;
pub mod log;
