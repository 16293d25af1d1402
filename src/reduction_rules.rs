//! Kernelization by the simple rules, applied to a fixed point.
//!
//! The rules are, in priority order:
//! Rule 1: Remove loop nodes and add them to the solution.
//! Rule 2: Remove sources and sinks.
//! Rule 3.1: Merge node v with only one incoming neighbor u, back into u.
//! Rule 3.2: Merge node v with only one outgoing neighbor w, into w.
//! Rule 0 (implicit): Multi edges are merged, the adjacency lists are sets.
//!
//! Only nodes whose neighborhood changed are looked at again (the dirty queue).

use std::collections::VecDeque;
use std::ops::AddAssign;
use fxhash::FxHashSet;
use crate::digraph::Digraph;
use crate::other_ds::NodeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Loop,
    SourceSink,
    MergeBack,
    MergeFront,
}

/// Number of successful applications per rule.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RuleCounts {
    pub loops: usize,
    pub sources_sinks: usize,
    pub merges: usize,
}

impl RuleCounts {
    fn record(&mut self, rule: Rule) {
        match rule {
            Rule::Loop => self.loops += 1,
            Rule::SourceSink => self.sources_sinks += 1,
            Rule::MergeBack | Rule::MergeFront => self.merges += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.loops + self.sources_sinks + self.merges
    }
}

impl AddAssign for RuleCounts {
    fn add_assign(&mut self, other: Self) {
        self.loops += other.loops;
        self.sources_sinks += other.sources_sinks;
        self.merges += other.merges;
    }
}

/// Applies the simple rules on a `Digraph` until no rule applies anymore.
/// The queue can be reused for many graphs.
#[derive(Debug, Default, Clone)]
pub struct Reducer {
    queue: VecDeque<usize>,
    queued: NodeSet,
    pub counts: RuleCounts,
}

impl Reducer {

    pub fn new() -> Self {
        Reducer::default()
    }

    fn mark(&mut self, node: usize) {
        if self.queued.insert(node) {
            self.queue.push_back(node);
        }
    }

    /// Reduces `graph` exhaustively, starting with every node as dirty.
    /// Returns the nodes that were forced into the solution.
    pub fn reduce(&mut self, graph: &mut Digraph) -> FxHashSet<usize> {
        let nodes: Vec<usize> = graph.nodes().collect();
        self.reduce_around(graph, nodes)
    }

    /// Reduces `graph` exhaustively, starting with the nodes in `dirty`. Nodes that do not exist
    /// (anymore) are skipped.
    /// Returns the nodes that were forced into the solution.
    ///
    /// If `graph` was at a fixed point before some alteration, passing all nodes whose
    /// neighborhood changed by that alteration is enough to reach a fixed point again.
    pub fn reduce_around<I: IntoIterator<Item=usize>>(&mut self, graph: &mut Digraph, dirty: I) -> FxHashSet<usize> {
        let mut forced = FxHashSet::default();
        for node in dirty {
            self.mark(node);
        }
        while let Some(node) = self.queue.pop_front() {
            self.queued.remove(&node);
            if !graph.has_node(node) {
                continue
            }
            if let Some(rule) = self.apply_at(graph, node, &mut forced) {
                self.counts.record(rule);
            }
        }
        debug_assert!(graph.check_symmetry());
        forced
    }

    /// Applies the first applicable rule at `node` and marks all nodes with a changed
    /// neighborhood.
    fn apply_at(&mut self, graph: &mut Digraph, node: usize, forced: &mut FxHashSet<usize>) -> Option<Rule> {
        // Rule 1: Add nodes with loops to the solution, remove it:
        if graph.has_self_loop(node) {
            let (ins, outs) = graph.remove_node(node).expect("`node` exists");
            forced.insert(node);
            ins.union(&outs).filter(|n| **n != node).for_each(|n| self.mark(*n));
            return Some(Rule::Loop)
        }
        let in_degree = graph.in_degree(node).expect("`node` exists");
        let out_degree = graph.out_degree(node).expect("`node` exists");
        // Rule 2: Remove sources and sinks:
        if in_degree == 0 || out_degree == 0 {
            let (ins, outs) = graph.remove_node(node).expect("`node` exists");
            ins.union(&outs).for_each(|n| self.mark(*n));
            return Some(Rule::SourceSink)
        }
        // Rule 3.1: Merge node v with only one incoming neighbor u, back into u.
        if in_degree == 1 {
            let into = *graph.ins(node).iter().next().expect("Indegree of `node` is 1");
            let outs = graph.merge_into_back(node, into).expect("Nodes are suited for this operation");
            self.mark(into);
            outs.iter().for_each(|n| self.mark(*n));
            return Some(Rule::MergeBack)
        }
        // Rule 3.2: Merge node v with only one outgoing neighbor w, into w.
        if out_degree == 1 {
            let into = *graph.outs(node).iter().next().expect("Outdegree of `node` is 1");
            let ins = graph.merge_into_front(node, into).expect("Nodes are suited for this operation");
            self.mark(into);
            ins.iter().for_each(|n| self.mark(*n));
            return Some(Rule::MergeFront)
        }
        None
    }
}

/// Checks if none of the simple rules applies to any node of `graph`.
pub fn is_reduced(graph: &Digraph) -> bool {
    graph.nodes().all(|node| {
        !graph.has_self_loop(node) &&
            graph.in_degree(node).expect("`node` exists") > 1 &&
            graph.out_degree(node).expect("`node` exists") > 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    fn random_graph(rng: &mut StdRng, n: usize, p: f64) -> Digraph {
        let mut g = Digraph::with_nodes(n);
        for u in 0..n {
            for v in 0..n {
                if rng.gen_bool(p) {
                    g.add_arc((u, v));
                }
            }
        }
        g
    }

    #[test]
    fn reduction_test() {
        // A cycle 0 -> 2 -> 4 -> 6 -> 0 with trees hanging on it.
        let mut g = Digraph::from_edges(vec![
            (0, 1), (0, 2), (2, 1), (2, 4), (3, 0), (4, 1), (4, 6), (5, 0), (5, 3), (5, 6), (6, 7), (6, 0),
        ]);
        let mut reducer = Reducer::new();
        let forced = reducer.reduce(&mut g);
        assert_eq!(g.num_nodes(), 0);
        assert_eq!(forced.len(), 1);
        assert!([0, 2, 4, 6].iter().any(|n| forced.contains(n)));
        assert_eq!(reducer.counts.loops, 1);
        // Nodes 1 and 7 are sinks.
        assert!(reducer.counts.sources_sinks >= 2);
        assert_eq!(reducer.counts.total(), 1 + reducer.counts.sources_sinks + reducer.counts.merges);
    }

    #[test]
    fn mutual_pairs_are_kept_test() {
        // A bidirected triangle is already reduced.
        let mut g = Digraph::from_edges(vec![(0, 1), (1, 0), (1, 2), (2, 1), (0, 2), (2, 0)]);
        let before = g.clone();
        let forced = Reducer::new().reduce(&mut g);
        assert!(forced.is_empty());
        assert_eq!(g, before);
        assert!(is_reduced(&g));
    }

    #[test]
    fn loop_rule_test() {
        let mut g = Digraph::from_edges(vec![(0, 0), (0, 1), (1, 2), (2, 0), (2, 3), (3, 2)]);
        let forced = Reducer::new().reduce(&mut g);
        assert!(forced.contains(&0));
        assert_eq!(forced.len(), 2);
        assert_eq!(g.num_nodes(), 0);
    }

    #[test]
    fn reduce_around_test() {
        let mut g = Digraph::from_edges(vec![(0, 1), (1, 0), (1, 2), (2, 1), (0, 2), (2, 0), (2, 3), (3, 2), (3, 0), (0, 3)]);
        let mut reducer = Reducer::new();
        assert!(reducer.reduce(&mut g).is_empty());
        let (ins, outs) = g.remove_node(3).unwrap();
        let forced = reducer.reduce_around(&mut g, ins.union(&outs).copied());
        assert!(forced.is_empty());
        assert!(is_reduced(&g));
        assert_eq!(g.num_nodes(), 3);
    }

    #[test]
    fn idempotence_test() {
        let mut rng = StdRng::seed_from_u64(7);
        for round in 0..200 {
            let n = 3 + round % 10;
            let mut g = random_graph(&mut rng, n, 0.25);
            let mut reducer = Reducer::new();
            let first = reducer.reduce(&mut g);
            assert!(is_reduced(&g));
            let once = g.clone();
            let second = reducer.reduce(&mut g);
            assert!(second.is_empty());
            assert_eq!(g, once);
            assert!(first.iter().all(|n| !g.has_node(*n)));
        }
    }
}
