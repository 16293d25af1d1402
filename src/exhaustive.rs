//! A simple exhaustive search to provide cross-validation for the branch and bound algorithm and
//! exact weights for small structures.
//!
//! All candidate solutions with a given number of nodes are enumerated. If none of them is a
//! solution the number is increased, so the first feasible solution is the smallest one.

use std::time::Duration;
use fxhash::FxHashSet;
use itertools::Itertools;
use crate::digraph::Digraph;
use crate::branch_and_bound::{Deadline, ExactSolver};
use crate::cust_errors::ProcessingError;

/// Largest graph the enumeration accepts, one bit per node.
pub const MAX_EXHAUSTIVE_NODES: usize = 64;

/// Number of candidate solutions between two deadline checks.
const CHECK_INTERVAL: usize = 1 << 12;

/// Graphs are encoded as one out-neighbor bitmask per local node.
type Masks = Vec<u64>;

/// Maps the existing nodes among `nodes` to local ids `0..s` and returns the out-neighbor masks
/// of the induced subgraph together with the mapping.
fn induced_masks(graph: &Digraph, nodes: &[usize]) -> (Masks, Vec<usize>) {
    let local: Vec<usize> = nodes.iter().copied().filter(|n| graph.has_node(*n)).unique().collect();
    assert!(local.len() <= MAX_EXHAUSTIVE_NODES, "exhaustive search is limited to 64 nodes");
    let masks = local.iter()
        .map(|node| {
            local.iter()
                .enumerate()
                .filter(|(_, trg)| graph.has_edge((*node, **trg)))
                .fold(0u64, |mask, (i, _)| mask | (1 << i))
        }).collect();
    (masks, local)
}

/// Checks if the subgraph on the local nodes in `alive` is acyclic by peeling off sinks.
fn is_acyclic(masks: &[u64], mut alive: u64) -> bool {
    loop {
        let sinks = (0..masks.len())
            .filter(|i| alive & (1 << i) != 0 && masks[*i] & alive == 0)
            .fold(0u64, |acc, i| acc | (1 << i));
        if sinks == 0 {
            return alive == 0
        }
        alive &= !sinks;
    }
}

/// Returns a smallest set of local ids whose removal leaves the graph acyclic. `deadline` is
/// checked once per solution size and every `CHECK_INTERVAL` candidates.
fn smallest_solution(masks: &[u64], deadline: &Deadline) -> Result<Vec<usize>, ProcessingError> {
    let s = masks.len();
    let full: u64 = if s == 64 { u64::MAX } else { (1u64 << s) - 1 };
    for k in 0..=s {
        deadline.check()?;
        for (tried, removed) in (0..s).combinations(k).enumerate() {
            if tried % CHECK_INTERVAL == CHECK_INTERVAL - 1 {
                deadline.check()?;
            }
            let removed_mask = removed.iter().fold(0u64, |acc, i| acc | (1 << i));
            if is_acyclic(masks, full & !removed_mask) {
                return Ok(removed)
            }
        }
    }
    unreachable!("removing every node leaves an acyclic graph")
}

/// Size of a minimum directed feedback vertex set of the subgraph induced by the existing nodes
/// among `nodes`.
pub fn min_fvs_of_induced(graph: &Digraph, nodes: &[usize]) -> usize {
    let (masks, _) = induced_masks(graph, nodes);
    smallest_solution(&masks, &Deadline::default()).expect("no deadline given").len()
}

/// Computes a minimum directed feedback vertex set of `graph` by enumeration, giving up with
/// `ProcessingError::OutOfTime` or `ProcessingError::Interrupted` once `deadline` says so.
/// Graphs with more than `MAX_EXHAUSTIVE_NODES` nodes are rejected as an invalid parameter.
pub fn exhaustive_search_until(graph: &Digraph, deadline: &Deadline) -> Result<FxHashSet<usize>, ProcessingError> {
    if graph.num_nodes() > MAX_EXHAUSTIVE_NODES {
        return Err(ProcessingError::InvalidParameter(
            format!("exhaustive search is limited to {} nodes, got {}", MAX_EXHAUSTIVE_NODES, graph.num_nodes())))
    }
    let nodes: Vec<usize> = graph.nodes().collect();
    let (masks, local) = induced_masks(graph, &nodes);
    let solution = smallest_solution(&masks, deadline)?;
    Ok(solution.into_iter().map(|i| local[i]).collect())
}

/// Computes a minimum directed feedback vertex set of `graph` by enumeration.
///
/// # Panics
/// Panics if `graph` has more than `MAX_EXHAUSTIVE_NODES` nodes.
pub fn exhaustive_search(graph: &Digraph) -> FxHashSet<usize> {
    exhaustive_search_until(graph, &Deadline::default()).expect("small graph without deadline")
}

/// The exhaustive search as an `ExactSolver`.
#[derive(Debug, Default, Clone)]
pub struct ExhaustiveSearch {
    pub time_limit: Option<Duration>,
}

impl ExactSolver for ExhaustiveSearch {
    fn solve(&mut self, graph: &Digraph) -> Result<FxHashSet<usize>, ProcessingError> {
        exhaustive_search_until(graph, &Deadline::new(self.time_limit, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhaustive_search_loops_test() {
        let g = Digraph::from_edges(vec![(0, 0), (2, 2), (0, 1), (1, 2)]);
        assert_eq!(exhaustive_search(&g), vec![0, 2].into_iter().collect::<FxHashSet<usize>>());
    }

    #[test]
    fn induced_weight_test() {
        // Bidirected clique on 4 nodes plus a node 4 on a single triangle with 0 and 1.
        let mut edges = Vec::new();
        for u in 0..4 {
            for v in 0..4 {
                if u != v {
                    edges.push((u, v));
                }
            }
        }
        edges.extend(vec![(0, 4), (4, 1)]);
        let g = Digraph::from_edges(edges);
        assert_eq!(min_fvs_of_induced(&g, &[0, 1]), 1);
        assert_eq!(min_fvs_of_induced(&g, &[0, 1, 2]), 2);
        assert_eq!(min_fvs_of_induced(&g, &[0, 1, 2, 3]), 3);
        assert_eq!(min_fvs_of_induced(&g, &[0, 1, 4]), 1);
        // Deleted nodes are ignored.
        let mut h = g.clone();
        h.remove_node(3);
        assert_eq!(min_fvs_of_induced(&h, &[0, 1, 2, 3]), 2);
    }

    #[test]
    fn exact_solver_test() {
        let g = Digraph::from_edges(vec![(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 2)]);
        let mut solver = ExhaustiveSearch::default();
        let solution = solver.solve(&g).unwrap();
        assert_eq!(solution, vec![2].into_iter().collect::<FxHashSet<usize>>());
    }

    #[test]
    fn too_large_test() {
        let edges: Vec<(usize, usize)> = (0..70).flat_map(|i| vec![(i, (i + 1) % 70), ((i + 1) % 70, i)]).collect();
        let g = Digraph::from_edges(edges);
        let mut solver = ExhaustiveSearch::default();
        assert!(matches!(solver.solve(&g), Err(ProcessingError::InvalidParameter(_))));
    }

    #[test]
    fn deadline_test() {
        let g = Digraph::from_edges(vec![(0, 1), (1, 0), (1, 2), (2, 1)]);
        let mut solver = ExhaustiveSearch { time_limit: Some(Duration::from_secs(0)) };
        assert_eq!(solver.solve(&g), Err(ProcessingError::OutOfTime));
    }
}
