//! Strongly connected components.
//!
//! Tarjan's algorithm, written with an explicit stack so very long paths do not exhaust the call
//! stack. Components are returned in reverse topological order of the condensation: a component
//! only has edges into components that were returned before it.

use fxhash::FxHashSet;
use crate::digraph::Digraph;

/// Per node state of a Tarjan run. Indexed by node id and reset before each run, so nothing
/// leaks into other traversals.
#[derive(Debug, Default, Clone)]
pub struct TarjanState {
    index: Vec<Option<usize>>,
    low_link: Vec<usize>,
    on_stack: Vec<bool>,
}

impl TarjanState {
    pub fn new() -> Self {
        TarjanState::default()
    }

    /// Clears all marks and makes room for `n` node ids.
    pub fn reset(&mut self, n: usize) {
        self.index.clear();
        self.index.resize(n, None);
        self.low_link.clear();
        self.low_link.resize(n, 0);
        self.on_stack.clear();
        self.on_stack.resize(n, false);
    }
}

impl Digraph {

    /// Finds the strongly connected components of `self` in reverse topological order.
    pub fn find_strongly_connected_components(&self) -> Vec<FxHashSet<usize>> {
        let mut state = TarjanState::new();
        self.find_strongly_connected_components_with(&mut state)
    }

    /// Same as `find_strongly_connected_components()`, reusing `state`.
    pub fn find_strongly_connected_components_with(&self, state: &mut TarjanState) -> Vec<FxHashSet<usize>> {
        state.reset(self.num_reserved_nodes());
        let mut sccs = Vec::new();
        let mut next_index = 0;
        let mut stack: Vec<usize> = Vec::new();
        // Each frame holds a node and the not yet visited part of its outgoing neighborhood.
        let mut call_stack: Vec<(usize, Vec<usize>)> = Vec::new();
        for root in self.nodes() {
            if state.index[root].is_some() {
                continue
            }
            state.index[root] = Some(next_index);
            state.low_link[root] = next_index;
            next_index += 1;
            stack.push(root);
            state.on_stack[root] = true;
            call_stack.push((root, self.outs(root).iter().copied().collect()));
            while let Some((node, pending)) = call_stack.last_mut() {
                let node = *node;
                if let Some(neigh) = pending.pop() {
                    match state.index[neigh] {
                        None => {
                            state.index[neigh] = Some(next_index);
                            state.low_link[neigh] = next_index;
                            next_index += 1;
                            stack.push(neigh);
                            state.on_stack[neigh] = true;
                            call_stack.push((neigh, self.outs(neigh).iter().copied().collect()));
                        },
                        Some(neigh_index) => {
                            if state.on_stack[neigh] && neigh_index < state.low_link[node] {
                                state.low_link[node] = neigh_index;
                            }
                        },
                    }
                    continue
                }
                // All neighbors done: close `node`.
                call_stack.pop();
                if let Some((parent, _)) = call_stack.last() {
                    if state.low_link[node] < state.low_link[*parent] {
                        state.low_link[*parent] = state.low_link[node];
                    }
                }
                if Some(state.low_link[node]) == state.index[node] {
                    let mut scc = FxHashSet::default();
                    loop {
                        let member = stack.pop().expect("`node` is still on the stack");
                        state.on_stack[member] = false;
                        scc.insert(member);
                        if member == node {
                            break
                        }
                    }
                    sccs.push(scc);
                }
            }
        }
        sccs
    }

    /// Returns the strongly connected components that contain at least one cycle: components with
    /// more than one node or a single node with a loop.
    pub fn cyclic_components(&self) -> Vec<FxHashSet<usize>> {
        self.find_strongly_connected_components()
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.has_self_loop(*scc.iter().next().expect("components are not empty"))
            })
            .collect()
    }

    /// Splits `self` into one subgraph per cyclic component. Node ids are kept, edges between
    /// components are dropped. Nodes on no cycle do not appear in any subgraph.
    pub fn split_into_cyclic_components(&self) -> Vec<Self> {
        self.cyclic_components()
            .iter()
            .map(|scc| self.build_subgraph(scc))
            .collect()
    }

    /// Checks if `self` contains a cycle.
    pub fn has_cycle(&self) -> bool {
        self.nodes().any(|node| self.has_self_loop(node)) ||
            self.find_strongly_connected_components().iter().any(|scc| scc.len() > 1)
    }

    /// Checks if `self` is acyclic after removing `solution`.
    pub fn is_acyclic_without(&self, solution: &FxHashSet<usize>) -> bool {
        let mut clone = self.clone();
        for node in solution {
            if clone.has_node(*node) {
                clone.remove_node(*node);
            }
        }
        !clone.has_cycle()
    }
}
