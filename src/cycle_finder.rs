//! Breadth first search for short cycles.
//!
//! A `CycleFinder` owns its visitor state (visit index, parent pointer and depth of each node)
//! and can be reused for any number of searches on any number of graphs. Only the entries that
//! were touched by the last search are cleared on `reset()`.

use std::collections::VecDeque;
use fxhash::FxHashSet;
use crate::digraph::Digraph;

#[derive(Debug, Default, Clone)]
pub struct CycleFinder {
    visit_index: Vec<Option<usize>>,
    parent: Vec<Option<usize>>,
    depth: Vec<usize>,
    touched: Vec<usize>,
    queue: VecDeque<usize>,
}

impl CycleFinder {

    pub fn new() -> Self {
        CycleFinder::default()
    }

    /// Clears the visitor state of the last search.
    pub fn reset(&mut self) {
        for node in self.touched.drain(..) {
            self.visit_index[node] = None;
            self.parent[node] = None;
            self.depth[node] = 0;
        }
        self.queue.clear();
    }

    fn prepare(&mut self, graph: &Digraph) {
        self.reset();
        let n = graph.num_reserved_nodes();
        if self.visit_index.len() < n {
            self.visit_index.resize(n, None);
            self.parent.resize(n, None);
            self.depth.resize(n, 0);
        }
    }

    fn visit(&mut self, node: usize, parent: Option<usize>, depth: usize) {
        self.visit_index[node] = Some(self.touched.len());
        self.parent[node] = parent;
        self.depth[node] = depth;
        self.touched.push(node);
    }

    /// The order in which `node` was reached by the last search, if it was reached.
    pub fn visit_index(&self, node: usize) -> Option<usize> {
        self.visit_index.get(node).copied().flatten()
    }

    /// Finds a shortest cycle containing `root`, of at most `max_len` nodes if given.
    /// The cycle starts with `root` and follows the edge direction. A loop is returned as
    /// `vec![root]`.
    ///
    /// # Panics
    /// Panics if `root` is not a node of `graph`.
    pub fn shortest_cycle_through(&mut self, graph: &Digraph, root: usize, max_len: Option<usize>) -> Option<Vec<usize>> {
        assert!(graph.has_node(root), "the root of a cycle search exists");
        self.prepare(graph);
        if graph.has_self_loop(root) {
            return Some(vec![root])
        }
        let limit = max_len.unwrap_or(usize::MAX);
        self.visit(root, None, 0);
        self.queue.push_back(root);
        while let Some(current) = self.queue.pop_front() {
            let depth = self.depth[current];
            // A cycle closed from `current` has `depth + 1` nodes.
            if depth + 1 > limit {
                break
            }
            for neigh in graph.outs(current) {
                if *neigh == root {
                    return Some(self.trace_back(root, current))
                }
                if self.visit_index[*neigh].is_none() {
                    self.visit(*neigh, Some(current), depth + 1);
                    self.queue.push_back(*neigh);
                }
            }
        }
        None
    }

    /// Follows parent pointers from `tail` back to `root`.
    fn trace_back(&self, root: usize, tail: usize) -> Vec<usize> {
        let mut cycle = vec![tail];
        let mut current = tail;
        while current != root {
            current = self.parent[current].expect("every visited node but `root` has a parent");
            cycle.push(current);
        }
        cycle.reverse();
        cycle
    }

    /// Returns a shortest cycle of `graph` or `None` if `graph` is acyclic.
    pub fn shortest_cycle(&mut self, graph: &Digraph) -> Option<Vec<usize>> {
        self.best_cycle_by(graph, |_, _| 0)
    }

    /// Returns a shortest cycle of `graph`. Among the shortest cycles found, the one with the
    /// highest sum of minimum direct degrees (`min(in degree, out degree)`) is picked.
    pub fn best_cycle(&mut self, graph: &Digraph) -> Option<Vec<usize>> {
        self.best_cycle_by(graph, |g, node| g.min_direct_degree(node).expect("cycle nodes exist") as i64)
    }

    /// Returns a shortest cycle of `graph`, ties are broken by the highest sum of `score` over the
    /// nodes of the cycle and then by the order of the roots.
    pub fn best_cycle_by<F>(&mut self, graph: &Digraph, score: F) -> Option<Vec<usize>>
        where F: Fn(&Digraph, usize) -> i64 {
        let mut best: Option<(Vec<usize>, i64)> = None;
        let roots: Vec<usize> = graph.nodes().collect();
        for root in roots {
            if graph.in_degree(root) == Some(0) || graph.out_degree(root) == Some(0) {
                continue
            }
            let max_len = best.as_ref().map(|(cycle, _)| cycle.len());
            if let Some(cycle) = self.shortest_cycle_through(graph, root, max_len) {
                if cycle.len() == 1 {
                    self.reset();
                    return Some(cycle)
                }
                let value: i64 = cycle.iter().map(|node| score(graph, *node)).sum();
                let better = match &best {
                    None => true,
                    Some((best_cycle, best_value)) => cycle.len() < best_cycle.len() ||
                        (cycle.len() == best_cycle.len() && value > *best_value),
                };
                if better {
                    best = Some((cycle, value));
                }
            }
        }
        self.reset();
        best.map(|(cycle, _)| cycle)
    }
}

/// Checks if `cycle` is a directed cycle of `graph`.
pub fn is_cycle_of(graph: &Digraph, cycle: &[usize]) -> bool {
    if cycle.is_empty() || !cycle.iter().all(|node| graph.has_node(*node)) {
        return false
    }
    let mut seen = FxHashSet::default();
    if !cycle.iter().all(|node| seen.insert(*node)) {
        return false
    }
    (0..cycle.len()).all(|i| graph.has_edge((cycle[i], cycle[(i + 1) % cycle.len()])))
}
