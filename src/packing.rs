//! Lower bounds from packings of disjoint structures.
//!
//! A packing is a set of pairwise node disjoint units. Each unit carries a weight that is at most
//! the size of a minimum feedback vertex set of the subgraph induced by its nodes, so every
//! solution contains at least `weight` nodes of each unit and the sum of the weights is a lower
//! bound on the size of any solution.
//!
//! Units start as cycles (loops, mutual pairs, shortest cycles of the unused part of the graph)
//! and are grown by neighbors as long as this raises their weight. A bidirected clique on `r`
//! nodes for example ends up as one unit with weight `r - 1`.
//!
//! Along a branch, units of the parent that avoid all deleted nodes stay valid for the child,
//! even if some of their nodes were merged away by reductions or excluded from deletion.

use fxhash::FxHashSet;
use itertools::Itertools;
use crate::digraph::Digraph;
use crate::cycle_finder::CycleFinder;
use crate::exhaustive::min_fvs_of_induced;

/// Units never grow beyond this many nodes, the weight of a unit is computed by enumeration.
pub const MAX_UNIT_SIZE: usize = 6;

/// Number of growth candidates that are evaluated per step.
const MAX_CANDIDATES: usize = 16;

/// Number of units an `improve()` call tries to swap for two or more cycles.
const MAX_SWAPS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub nodes: Vec<usize>,
    pub weight: usize,
}

impl Cycle {
    pub fn contains(&self, node: usize) -> bool {
        self.nodes.contains(&node)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Packing {
    cycles: Vec<Cycle>,
    used: FxHashSet<usize>,
    forbidden: FxHashSet<usize>,
    size: usize,
}

/// Removes sources and sinks from `residual`, starting at `start`, until none is left.
fn peel<I: IntoIterator<Item=usize>>(residual: &mut Digraph, start: I) {
    let mut stack: Vec<usize> = start.into_iter().collect();
    while let Some(node) = stack.pop() {
        if !residual.has_node(node) {
            continue
        }
        if residual.in_degree(node) == Some(0) || residual.out_degree(node) == Some(0) {
            let (ins, outs) = residual.remove_node(node).expect("`node` exists");
            stack.extend(ins);
            stack.extend(outs);
        }
    }
}

/// Adds nodes of `residual` to `cycle` while this increases its weight in `graph`. Nodes of the
/// unit itself need not be part of `residual`.
/// Only nodes that have edges from and to the unit are considered.
fn grow(graph: &Digraph, residual: &Digraph, cycle: &mut Cycle) {
    while cycle.nodes.len() < MAX_UNIT_SIZE {
        let present: Vec<usize> = cycle.nodes.iter().copied().filter(|n| graph.has_node(*n)).collect();
        let candidates: Vec<usize> = present.iter()
            .flat_map(|node| graph.outs(*node).iter().chain(graph.ins(*node).iter()))
            .copied()
            .filter(|w| residual.has_node(*w) && !cycle.contains(*w))
            .unique()
            .filter_map(|w| {
                let from_unit = present.iter().filter(|n| graph.has_edge((**n, w))).count();
                let to_unit = present.iter().filter(|n| graph.has_edge((w, **n))).count();
                if from_unit > 0 && to_unit > 0 {
                    Some((w, from_unit + to_unit))
                } else {
                    None
                }
            })
            .sorted_by(|(w_a, s_a), (w_b, s_b)| s_b.cmp(s_a).then(w_a.cmp(w_b)))
            .take(MAX_CANDIDATES)
            .map(|(w, _)| w)
            .collect();
        let grown = candidates.into_iter().find_map(|w| {
            let mut nodes = present.clone();
            nodes.push(w);
            let weight = min_fvs_of_induced(graph, &nodes);
            if weight > cycle.weight {
                Some((w, weight))
            } else {
                None
            }
        });
        match grown {
            Some((w, weight)) => {
                cycle.nodes.push(w);
                cycle.weight = weight;
            },
            None => break,
        }
    }
}

impl Packing {

    fn from_cycles(cycles: Vec<Cycle>, forbidden: FxHashSet<usize>) -> Self {
        let used = cycles.iter().flat_map(|c| c.nodes.iter().copied()).collect();
        let size = cycles.iter().map(|c| c.weight).sum();
        Packing {
            cycles,
            used,
            forbidden,
            size,
        }
    }

    /// Greedily packs `graph`: loops and mutual pairs first, then shortest cycles that prefer
    /// nodes of low degree. Every unit is grown right after it was found.
    pub fn build(graph: &Digraph) -> Self {
        let mut packing = Packing::default();
        packing.fill(graph);
        packing
    }

    /// The lower bound given by this packing.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Checks if `node` belongs to some unit.
    pub fn contains(&self, node: usize) -> bool {
        self.used.contains(&node)
    }

    /// The part of `graph` no unit uses.
    fn unused_part(&self, graph: &Digraph) -> Digraph {
        let mut unused = graph.clone();
        for node in &self.used {
            if unused.has_node(*node) {
                unused.remove_node(*node);
            }
        }
        unused
    }

    /// The part of `graph` no unit uses, without sources and sinks.
    fn residual(&self, graph: &Digraph) -> Digraph {
        let mut residual = self.unused_part(graph);
        let nodes: Vec<usize> = residual.nodes().collect();
        peel(&mut residual, nodes);
        residual
    }

    /// Turns `nodes` into a unit, grows it and removes it from `residual`.
    fn push(&mut self, graph: &Digraph, residual: &mut Digraph, nodes: Vec<usize>) {
        let weight = if nodes.len() <= MAX_UNIT_SIZE {
            min_fvs_of_induced(graph, &nodes).max(1)
        } else {
            1
        };
        let mut cycle = Cycle { nodes, weight };
        grow(graph, residual, &mut cycle);
        let mut touched = Vec::new();
        for node in &cycle.nodes {
            self.used.insert(*node);
            if let Some((ins, outs)) = residual.remove_node(*node) {
                touched.extend(ins);
                touched.extend(outs);
            }
        }
        peel(residual, touched);
        self.size += cycle.weight;
        self.cycles.push(cycle);
    }

    /// Packs the unused part of `graph` until it is acyclic.
    fn fill(&mut self, graph: &Digraph) {
        let mut residual = self.residual(graph);
        self.fill_residual(graph, &mut residual);
    }

    fn fill_residual(&mut self, graph: &Digraph, residual: &mut Digraph) {
        let nodes: Vec<usize> = residual.nodes().collect();
        for node in nodes {
            if !residual.has_node(node) {
                continue
            }
            if residual.has_self_loop(node) {
                self.push(graph, residual, vec![node]);
                continue
            }
            let partner = residual.strong_neighbors(node)
                .and_then(|neighs| neighs.into_iter().min_by_key(|n| (graph.degree(*n).unwrap_or(0), *n)));
            if let Some(partner) = partner {
                self.push(graph, residual, vec![node, partner]);
            }
        }
        let mut finder = CycleFinder::new();
        while let Some(cycle) = finder.best_cycle_by(residual, |_, n| -(graph.degree(n).unwrap_or(0) as i64)) {
            self.push(graph, residual, cycle);
        }
    }

    /// Derives the packing of a child from `self`, the packing of its parent.
    ///
    /// `graph` is the child, `deleted` holds the nodes the branch put into the solution (the
    /// branching node and the nodes forced by reductions) and `forbidden` the nodes that must not
    /// be deleted below the child. Units containing a deleted node are dropped, all others are
    /// kept and the unused part of `graph` is packed again.
    pub fn update(&self, graph: &Digraph, deleted: &FxHashSet<usize>, forbidden: &FxHashSet<usize>) -> Self {
        let kept = self.cycles.iter()
            .filter(|c| !c.nodes.iter().any(|n| deleted.contains(n)))
            .cloned()
            .collect();
        let forbidden = self.forbidden.union(forbidden).copied().collect();
        let mut packing = Packing::from_cycles(kept, forbidden);
        packing.fill(graph);
        packing
    }

    /// Checks if some unit has fewer nodes left that may still be deleted than its weight.
    /// No solution of `graph` respecting the forbidden nodes exists then.
    pub fn is_infeasible(&self, graph: &Digraph) -> bool {
        self.cycles.iter().any(|c| {
            c.nodes.iter().filter(|n| graph.has_node(**n) && !self.forbidden.contains(*n)).count() < c.weight
        })
    }

    /// Tries to raise the bound on `graph`. Units are grown first, then units of weight one are
    /// swapped for two or more disjoint cycles where possible, finally the unused part is packed.
    /// The size never decreases.
    pub fn improve(&self, graph: &Digraph) -> Self {
        let mut next = self.clone();
        // Not peeled, a neighbor of a packed unit may be a source or sink of the unused part.
        let mut unused = next.unused_part(graph);
        for i in 0..next.cycles.len() {
            let before = next.cycles[i].nodes.len();
            let weight = next.cycles[i].weight;
            grow(graph, &unused, &mut next.cycles[i]);
            next.size += next.cycles[i].weight - weight;
            for node in next.cycles[i].nodes[before..].to_vec() {
                next.used.insert(node);
                unused.remove_node(node);
            }
        }
        let mut attempts = 0;
        let mut i = 0;
        while i < next.cycles.len() && attempts < MAX_SWAPS {
            if next.cycles[i].weight == 1 {
                attempts += 1;
                if let Some(swapped) = next.try_swap(graph, i) {
                    next = swapped;
                    continue
                }
            }
            i += 1;
        }
        next.fill(graph);
        debug_assert!(next.size >= self.size);
        next
    }

    /// Replaces unit `i` by a cycle through one of its nodes that avoids its other nodes, and
    /// whatever can be packed afterwards. Returns the new packing if it is larger.
    fn try_swap(&self, graph: &Digraph, i: usize) -> Option<Self> {
        let mut others = self.cycles.clone();
        let unit = others.swap_remove(i);
        let base = Packing::from_cycles(others, self.forbidden.clone());
        let mut finder = CycleFinder::new();
        for x in unit.nodes.iter().copied().filter(|n| graph.has_node(*n)) {
            let mut around = base.residual(graph);
            for node in unit.nodes.iter().filter(|n| **n != x) {
                if around.has_node(*node) {
                    around.remove_node(*node);
                }
            }
            if !around.has_node(x) {
                continue
            }
            if let Some(first) = finder.shortest_cycle_through(&around, x, None) {
                let mut trial = base.clone();
                let mut residual = trial.residual(graph);
                trial.push(graph, &mut residual, first);
                trial.fill_residual(graph, &mut residual);
                if trial.size > self.size {
                    return Some(trial)
                }
            }
        }
        None
    }

    /// Checks the structural invariants of the packing against `graph`: units are disjoint, the
    /// bookkeeping is consistent, and each unit whose nodes all exist in `graph` is not heavier
    /// than its minimum feedback vertex set.
    pub fn verify(&self, graph: &Digraph) -> bool {
        let mut seen = FxHashSet::default();
        for cycle in &self.cycles {
            if cycle.weight == 0 || cycle.weight > cycle.nodes.len() {
                return false
            }
            if !cycle.nodes.iter().all(|n| seen.insert(*n)) {
                return false
            }
            if cycle.nodes.iter().all(|n| graph.has_node(*n)) && cycle.nodes.len() <= MAX_UNIT_SIZE
                && min_fvs_of_induced(graph, &cycle.nodes) < cycle.weight {
                return false
            }
        }
        seen == self.used && self.cycles.iter().map(|c| c.weight).sum::<usize>() == self.size
    }
}
