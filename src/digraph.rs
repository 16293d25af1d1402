//! Directed, dynamic graph datastructure.
//! The main fields are the two adjacency lists `in_list` and `out_list` which respectively hold
//! all incoming and outgoing neighbors of a node in a `FxHashSet`. A removed node is represented
//! by `None` in both lists and never appears in the neighborhood of any other node.
//!
//! Cloning a `Digraph` is a flat copy of the two lists, which is what every search branch does.

use std::cmp::min;
use fxhash::FxHashSet;

/// The graph datastructure
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Digraph {
    in_list: Vec<Option<FxHashSet<usize>>>,
    out_list: Vec<Option<FxHashSet<usize>>>,
}

// Construction
impl Digraph {

    /// Returns a graph with the nodes `0..n` and no edges.
    pub fn with_nodes(n: usize) -> Self {
        Digraph {
            in_list: vec![Some(FxHashSet::default()); n],
            out_list: vec![Some(FxHashSet::default()); n],
        }
    }

    /// Builds a graph from a list of arcs, creating every node that is referenced.
    pub fn from_edges<I: IntoIterator<Item=(usize, usize)>>(edges: I) -> Self {
        let mut graph = Digraph::default();
        for edge in edges {
            graph.add_arc(edge);
        }
        graph
    }

    /// Makes sure `node` exists. Reserves ids up to `node` if necessary, the reserved ids in
    /// between stay deleted.
    pub fn ensure_node(&mut self, node: usize) {
        if node >= self.out_list.len() {
            self.out_list.resize(node + 1, None);
            self.in_list.resize(node + 1, None);
        }
        if self.out_list[node].is_none() {
            self.out_list[node] = Some(FxHashSet::default());
            self.in_list[node] = Some(FxHashSet::default());
        }
    }

    /// Adds the directed edge `(src, trg)` and creates missing endpoints.
    /// Returns `true` if the edge was not present before.
    pub fn add_arc(&mut self, (src, trg): (usize, usize)) -> bool {
        self.ensure_node(src);
        self.ensure_node(trg);
        self.add_edge_checked((src, trg))
    }
}

// Queries
impl Digraph {

    /// Returns a hashset of the neighborhood of outgoing nodes of `node` if `node` was not already deleted.
    pub fn out_neighbors(&self, node: usize) -> &Option<FxHashSet<usize>> {
        &self.out_list[node]
    }

    /// Returns a hashset of the neighborhood of incoming nodes of `node` if `node` was not already deleted.
    pub fn in_neighbors(&self, node: usize) -> &Option<FxHashSet<usize>> {
        &self.in_list[node]
    }

    /// Outgoing neighbors of an existing node.
    ///
    /// # Panics
    /// Panics if `node` was deleted.
    pub fn outs(&self, node: usize) -> &FxHashSet<usize> {
        self.out_list[node].as_ref().expect("`node` exists")
    }

    /// Incoming neighbors of an existing node.
    ///
    /// # Panics
    /// Panics if `node` was deleted.
    pub fn ins(&self, node: usize) -> &FxHashSet<usize> {
        self.in_list[node].as_ref().expect("`node` exists")
    }

    /// Returns a hashset of the strongly connected neighborhood of `node`, or None if `node` was
    /// already removed.
    pub fn strong_neighbors(&self, node: usize) -> Option<FxHashSet<usize>> {
        if let Some(in_set) = &self.in_list[node] {
            let out_set = &self.out_list[node].as_ref().expect("`node` exists");
            let strong_neighbors = in_set.intersection(out_set).copied().filter(|n| *n != node).collect::<FxHashSet<_>>();
            Some(strong_neighbors)
        } else {
            None
        }
    }

    /// Returns the amount of Nodes including the removed once.
    pub fn num_reserved_nodes(&self) -> usize {
        self.out_list.len()
    }

    /// Returns an iterator over all undeleted nodes.
    pub fn nodes(&self) -> impl Iterator<Item=usize> + '_ {
       self.out_list.iter()
           .enumerate()
           .filter_map(|(index, node)| {
               if node.is_some() {
                   Some(index)
               } else {
                   None
               }
           })
    }

    /// Returns the number of nodes in the graph.
    pub fn num_nodes(&self) -> usize {
        self.nodes().count()
    }

    /// Checks if `node` exists.
    pub fn has_node(&self, node: usize) -> bool {
        self.out_list.len() > node && self.out_list[node].is_some() && self.in_list[node].is_some()
    }

    /// Returns the number of edges in the graph.
    pub fn num_edges(&self) -> usize {
        self.out_list.iter().flatten().map(|outs| outs.len()).sum()
    }

    /// Checks if `edge` exists.
    pub fn has_edge(&self, edge: (usize, usize)) -> bool {
        self.out_list.len() > edge.0 && self.out_list[edge.0].as_ref().filter(|outs| outs.contains(&edge.1)).is_some()
    }

    /// Checks if `node` has an edge to itself.
    pub fn has_self_loop(&self, node: usize) -> bool {
        self.has_edge((node, node))
    }

    /// Returns the edges of the subgraph induced by `set`, sorted.
    pub fn induced_arcs(&self, set: &[usize]) -> Vec<(usize, usize)> {
        let members: FxHashSet<usize> = set.iter().copied().collect();
        let mut arcs: Vec<(usize, usize)> = set.iter()
            .copied()
            .filter(|node| self.has_node(*node))
            .flat_map(|node| {
                self.outs(node)
                    .iter()
                    .copied()
                    .filter(|trg| members.contains(trg))
                    .map(move |trg| (node, trg))
                    .collect::<Vec<_>>()
            }).collect();
        arcs.sort_unstable();
        arcs
    }

    /// Returns the out degree of `node` or None if `node` was deleted.
    ///
    /// # Panics
    /// Panics if node id is out of bounds.
    pub fn out_degree(&self, node: usize) -> Option<usize> {
        self.out_list[node].as_ref().map(|outs| outs.len())
    }

    /// Returns the in degree of `node` or None if `node` was deleted.
    ///
    /// # Panics
    /// Panics if node id is out of bounds.
    pub fn in_degree(&self, node: usize) -> Option<usize> {
        self.in_list[node].as_ref().map(|ins| ins.len())
    }

    /// Returns the degree of `node` or None if `node` was deleted.
    ///
    /// # Panics
    /// Panics if node id is out of bounds.
    pub fn degree(&self, node: usize) -> Option<usize> {
        if let Some(in_degree) = self.in_degree(node) {
            self.out_degree(node).map(|out_degree| in_degree + out_degree)
        } else {
            None
        }
    }

    /// Returns the minimum between outgoing and incoming degree of `node` or None if `node` was
    /// deleted.
    ///
    /// # Panics
    /// Panics if node id is out of bounds.
    pub fn min_direct_degree(&self, node: usize) -> Option<usize> {
        if let Some(in_degree) = self.in_degree(node) {
            self.out_degree(node).map(|out_degree| min(in_degree,out_degree))
        } else {
            None
        }
    }

    /// Checks the adjacency invariant: `trg` is in the out list of `src` iff `src` is in the in
    /// list of `trg`, and no list refers to a deleted node.
    pub fn check_symmetry(&self) -> bool {
        if self.in_list.len() != self.out_list.len() {
            return false
        }
        for node in 0..self.out_list.len() {
            match (&self.in_list[node], &self.out_list[node]) {
                (None, None) => continue,
                (Some(ins), Some(outs)) => {
                    for trg in outs {
                        if !self.in_list.get(*trg).and_then(|l| l.as_ref()).map_or(false, |l| l.contains(&node)) {
                            return false
                        }
                    }
                    for src in ins {
                        if !self.out_list.get(*src).and_then(|l| l.as_ref()).map_or(false, |l| l.contains(&node)) {
                            return false
                        }
                    }
                },
                _ => return false,
            }
        }
        true
    }

    /// Build a subgraph given the set `node_set` of nodes the subgraph will contain.
    /// Node ids are kept.
    pub fn build_subgraph(&self, node_set: &FxHashSet<usize>) -> Self {
        let in_list = self.in_list.iter()
            .enumerate()
            .map(|(i, opt_list)| {
                if node_set.contains(&i) {
                    opt_list.as_ref().map(|list| list.intersection(node_set).copied().collect::<FxHashSet<usize>>())
                }
                else {
                    None
                }
            }).collect::<Vec<Option<FxHashSet<usize>>>>();
        let out_list = self.out_list.iter()
            .enumerate()
            .map(|(i, opt_list)| {
                if node_set.contains(&i) {
                    opt_list.as_ref().map(|list| list.intersection(node_set).copied().collect::<FxHashSet<usize>>())
                }
                else {
                    None
                }
            }).collect::<Vec<Option<FxHashSet<usize>>>>();
        Digraph{
            in_list,
            out_list,
        }
    }
}

// Dynamic operations.
impl Digraph {

    /// Removes the node `node` and all adjacent edges from the graph.
    /// Returns the a tuple of incoming and outgoing neighbors if the node was removed
    /// successfully. Returns None if the node did not exist.
    ///
    /// # Panics
    /// Panics if the node index is out of bounds or the graph is broken.
    pub fn remove_node(&mut self, node: usize) -> Option<(FxHashSet<usize>, FxHashSet<usize>)> {
        if let Some(in_neighbors) = self.in_list[node].take() {
            for in_neighbor in &in_neighbors {
                if *in_neighbor != node {
                    self.out_list[*in_neighbor].as_mut().expect("neighbors of existing nodes exist").remove(&node);
                }
            }
            let out_neighbors = self.out_list[node].take().expect("`in_list` and `out_list` agree on `node`");
            for out_neighbor in &out_neighbors {
                if *out_neighbor != node {
                    self.in_list[*out_neighbor].as_mut().expect("neighbors of existing nodes exist").remove(&node);
                }
            }
            Some((in_neighbors, out_neighbors))
        } else {
            None
        }
    }

    /// Reinsert a node that was deleted earlier with the neighborhoods returned by
    /// `remove_node()`. Returns false if the node was not deleted properly.
    pub fn reinsert_node(&mut self, node: usize, in_neighbors: FxHashSet<usize>,
                         out_neighbors: FxHashSet<usize>) -> bool {
        if self.in_list[node].is_some() || self.out_list[node].is_some() {
            return false
        }
        for in_neighbor in &in_neighbors {
            if *in_neighbor != node {
                self.out_list[*in_neighbor].as_mut().expect("It was there as `node` was deleted").insert(node);
            }
        }
        for out_neighbor in &out_neighbors {
            if *out_neighbor != node {
                self.in_list[*out_neighbor].as_mut().expect("It was there as `node` was deleted").insert(node);
            }
        }
        self.in_list[node] = Some(in_neighbors);
        self.out_list[node] = Some(out_neighbors);
        true
    }

    /// Adds the directed edge `(src, trg)` to the graph if not already present.
    /// Returns true if the edge was added.
    ///
    /// # Panics
    /// Panics if a node index is invalid or one of the nodes was deleted.
    pub fn add_edge_checked(&mut self, (src, trg): (usize, usize)) -> bool {
        assert!(self.has_node(src) && self.has_node(trg), "edges can only be added between existing nodes");
        let added = self.out_list[src].as_mut().expect("`src` exists").insert(trg);
        self.in_list[trg].as_mut().expect("`trg` exists").insert(src);
        added
    }

    /// Merges `node` with it's only incoming neighbor `into`: every outgoing neighbor of `node`
    /// becomes an outgoing neighbor of `into` and `node` is removed. Every cycle through `node`
    /// also runs through `into`, so the cycles of the graph are preserved.
    /// Returns the outgoing neighbors of `node`, or None if `into` is not the only incoming
    /// neighbor of `node` (a loop at `node` also prevents the merge).
    ///
    /// # Panics
    /// Panics if any index is out of bounds
    pub fn merge_into_back(&mut self, node: usize, into: usize) -> Option<FxHashSet<usize>> {
        if node == into || self.in_degree(node) != Some(1) || !self.has_edge((into, node)) {
            return None
        }
        let (_, outs) = self.remove_node(node).expect("`node` exists");
        for trg in &outs {
            self.add_edge_checked((into, *trg));
        }
        Some(outs)
    }

    /// Merges `node` with it's only outgoing neighbor `into`: every incoming neighbor of `node`
    /// becomes an incoming neighbor of `into` and `node` is removed.
    /// Returns the incoming neighbors of `node`, or None if `into` is not the only outgoing
    /// neighbor of `node`.
    ///
    /// # Panics
    /// Panics if any index is out of bounds
    pub fn merge_into_front(&mut self, node: usize, into: usize) -> Option<FxHashSet<usize>> {
        if node == into || self.out_degree(node) != Some(1) || !self.has_edge((node, into)) {
            return None
        }
        let (ins, _) = self.remove_node(node).expect("`node` exists");
        for src in &ins {
            self.add_edge_checked((*src, into));
        }
        Some(ins)
    }

    /// Removes `node` and adds an edge from each of its incoming neighbors to each of its outgoing
    /// neighbors, so a path through `node` is replaced by a direct edge. This is how a node that
    /// must never be deleted is taken out of a branch.
    /// Returns the neighbors that got new edges, or None if `node` does not exist or carries a
    /// loop (such a node can't be bypassed).
    ///
    /// # Panics
    /// Panics if `node` is out of bounds.
    pub fn bypass_node(&mut self, node: usize) -> Option<FxHashSet<usize>> {
        if !self.has_node(node) || self.has_self_loop(node) {
            return None
        }
        let (ins, outs) = self.remove_node(node).expect("`node` exists");
        let mut touched: FxHashSet<usize> = FxHashSet::default();
        for src in &ins {
            for trg in &outs {
                self.add_edge_checked((*src, *trg));
            }
            touched.insert(*src);
        }
        touched.extend(outs.iter().copied());
        Some(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(nodes: &[usize]) -> FxHashSet<usize> {
        nodes.iter().copied().collect()
    }

    #[test]
    fn add_arc_creates_endpoints_test() {
        let mut g = Digraph::default();
        assert!(g.add_arc((0, 4)));
        assert!(!g.add_arc((0, 4)));
        assert_eq!(g.num_reserved_nodes(), 5);
        assert_eq!(g.num_nodes(), 2);
        assert_eq!(g.num_edges(), 1);
        assert!(!g.has_node(2));
        assert!(g.check_symmetry());
    }

    #[test]
    fn remove_and_reinsert_test() {
        let mut g = Digraph::from_edges(vec![(0, 1), (1, 2), (2, 0), (1, 1), (2, 1)]);
        let original = g.clone();
        let (ins, outs) = g.remove_node(1).unwrap();
        assert_eq!(ins, set(&[0, 1, 2]));
        assert_eq!(outs, set(&[1, 2]));
        assert!(g.check_symmetry());
        assert!(g.nodes().all(|n| !g.ins(n).contains(&1) && !g.outs(n).contains(&1)));
        assert!(g.remove_node(1).is_none());
        assert!(g.reinsert_node(1, ins, outs));
        assert_eq!(g, original);
    }

    #[test]
    fn clone_is_independent_test() {
        let g = Digraph::from_edges(vec![(0, 1), (1, 0)]);
        let mut copy = g.clone();
        copy.remove_node(0);
        assert_eq!(g.num_nodes(), 2);
        assert_eq!(g.num_edges(), 2);
        assert_eq!(copy.num_nodes(), 1);
    }

    #[test]
    fn merge_test() {
        // 0 -> 1 -> {2, 3}, 2 -> 0, 3 -> 0
        let mut g = Digraph::from_edges(vec![(0, 1), (1, 2), (1, 3), (2, 0), (3, 0)]);
        assert!(g.merge_into_back(2, 0).is_none());
        assert_eq!(g.merge_into_back(1, 0), Some(set(&[2, 3])));
        assert_eq!(g.outs(0), &set(&[2, 3]));
        assert!(g.check_symmetry());
        // 2 -> 0 is the only outgoing edge of 2
        assert_eq!(g.merge_into_front(2, 0), Some(set(&[0])));
        assert!(g.has_self_loop(0));
        assert!(g.check_symmetry());
    }

    #[test]
    fn bypass_test() {
        let mut g = Digraph::from_edges(vec![(0, 1), (1, 2), (2, 0), (3, 1), (1, 3)]);
        let touched = g.bypass_node(1).unwrap();
        assert_eq!(touched, set(&[0, 2, 3]));
        assert!(g.has_edge((0, 2)));
        assert!(g.has_edge((3, 3)));
        assert!(g.has_edge((0, 3)));
        assert!(g.has_edge((3, 2)));
        assert!(g.check_symmetry());
        assert!(g.bypass_node(3).is_none());
    }

    #[test]
    fn subgraph_and_strong_neighbors_test() {
        let g = Digraph::from_edges(vec![(0, 1), (1, 0), (1, 2), (2, 3), (3, 1), (0, 0)]);
        assert_eq!(g.strong_neighbors(0), Some(set(&[1])));
        assert_eq!(g.min_direct_degree(1), Some(2));
        let sub = g.build_subgraph(&set(&[1, 2, 3]));
        assert_eq!(sub.num_nodes(), 3);
        assert_eq!(sub.num_edges(), 3);
        assert!(sub.check_symmetry());
        assert_eq!(g.induced_arcs(&[0, 1]), vec![(0, 0), (0, 1), (1, 0)]);
    }
}
