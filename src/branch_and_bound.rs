//! Exact solver by branching on the nodes of short cycles.
//!
//! Every solution contains a node of each cycle. For a branching cycle `v_1, ..., v_l` the
//! i-th branch deletes `v_i` and excludes `v_1, ..., v_{i-1}` from deletion. Excluded nodes are
//! bypassed: they are removed and each of their incoming neighbors gets an edge to each of their
//! outgoing neighbors, which keeps every cycle through them alive.
//!
//! The budget `k` is raised by one per round (iterative deepening), starting at the larger of a
//! counting bound and the packing bound. Every call works on a graph at a reduction fixed point,
//! so a graph is acyclic iff it is empty.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use fxhash::FxHashSet;
use log::{debug, info, trace};
use crate::digraph::Digraph;
use crate::cycle_finder::CycleFinder;
use crate::reduction_rules::{Reducer, RuleCounts};
use crate::packing::Packing;
use crate::exhaustive::{exhaustive_search_until, MAX_EXHAUSTIVE_NODES};
use crate::stats::SearchStats;
use crate::cust_errors::ProcessingError;

/// Common interface of the exact solvers.
pub trait ExactSolver {
    /// Returns a minimum directed feedback vertex set of `graph`.
    fn solve(&mut self, graph: &Digraph) -> Result<FxHashSet<usize>, ProcessingError>;
}

/// Picks the branching cycle of a graph and the order in which its nodes are tried.
pub trait BranchingPolicy {
    fn select(&self, graph: &Digraph, finder: &mut CycleFinder) -> Option<Vec<usize>>;
}

/// Best cycle, nodes with higher `min(in degree, out degree)` first.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaxMinDegree;

impl BranchingPolicy for MaxMinDegree {
    fn select(&self, graph: &Digraph, finder: &mut CycleFinder) -> Option<Vec<usize>> {
        let mut cycle = finder.best_cycle(graph)?;
        cycle.sort_by_key(|node| Reverse(graph.min_direct_degree(*node).expect("cycle nodes exist")));
        Some(cycle)
    }
}

/// Best cycle, nodes in the order of the cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputOrder;

impl BranchingPolicy for InputOrder {
    fn select(&self, graph: &Digraph, finder: &mut CycleFinder) -> Option<Vec<usize>> {
        finder.best_cycle(graph)
    }
}

/// Shortest cycle, nodes with lower degree first.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinDegree;

impl BranchingPolicy for MinDegree {
    fn select(&self, graph: &Digraph, finder: &mut CycleFinder) -> Option<Vec<usize>> {
        let mut cycle = finder.shortest_cycle(graph)?;
        cycle.sort_by_key(|node| graph.degree(*node).expect("cycle nodes exist"));
        Some(cycle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    MaxMinDegree,
    InputOrder,
    MinDegree,
}

impl PolicyKind {
    pub fn policy(&self) -> Box<dyn BranchingPolicy> {
        match self {
            PolicyKind::MaxMinDegree => Box::new(MaxMinDegree),
            PolicyKind::InputOrder => Box::new(InputOrder),
            PolicyKind::MinDegree => Box::new(MinDegree),
        }
    }
}

impl Default for PolicyKind {
    fn default() -> Self {
        PolicyKind::MaxMinDegree
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max-min-degree" => Ok(PolicyKind::MaxMinDegree),
            "input-order" => Ok(PolicyKind::InputOrder),
            "min-degree" => Ok(PolicyKind::MinDegree),
            _ => Err(format!("unknown branching policy {:?}", s)),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::MaxMinDegree => write!(f, "max-min-degree"),
            PolicyKind::InputOrder => write!(f, "input-order"),
            PolicyKind::MinDegree => write!(f, "min-degree"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    /// Wall clock budget of one top level call.
    pub time_limit: Option<Duration>,
    pub policy: PolicyKind,
    pub use_packing: bool,
    /// Components with at most this many nodes (after reduction) are solved by enumeration.
    /// 0 turns this off.
    pub exhaustive_threshold: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_limit: None,
            policy: PolicyKind::default(),
            use_packing: true,
            exhaustive_threshold: 0,
        }
    }
}

impl SolverConfig {
    /// Rejects settings the solver cannot honor.
    pub fn validate(&self) -> Result<(), ProcessingError> {
        if self.exhaustive_threshold > MAX_EXHAUSTIVE_NODES {
            return Err(ProcessingError::InvalidParameter(
                format!("the exhaustive threshold is at most {}, got {}", MAX_EXHAUSTIVE_NODES, self.exhaustive_threshold)))
        }
        Ok(())
    }
}

/// The point in time a search has to end and an optional flag that cancels it from outside.
#[derive(Debug, Default, Clone)]
pub struct Deadline {
    at: Option<Instant>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl Deadline {
    pub fn new(time_limit: Option<Duration>, interrupt: Option<Arc<AtomicBool>>) -> Self {
        Deadline {
            at: time_limit.map(|limit| Instant::now() + limit),
            interrupt,
        }
    }

    pub fn check(&self) -> Result<(), ProcessingError> {
        if let Some(flag) = &self.interrupt {
            if flag.load(Ordering::Relaxed) {
                return Err(ProcessingError::Interrupted)
            }
        }
        match self.at {
            Some(at) if Instant::now() >= at => Err(ProcessingError::OutOfTime),
            _ => Ok(()),
        }
    }
}

/// Smallest `k` such that deleting the `k` nodes of highest degree could leave few enough edges
/// for an acyclic graph on the remaining `n - k` nodes, which has at most `(n-k)(n-k-1)/2`
/// edges.
pub fn closed_form_lower_bound(graph: &Digraph) -> usize {
    let n = graph.num_nodes();
    let m = graph.num_edges();
    let mut degrees: Vec<usize> = graph.nodes().map(|node| graph.degree(node).expect("`node` exists")).collect();
    degrees.sort_unstable_by(|a, b| b.cmp(a));
    let mut removed = 0;
    for k in 0..n {
        let r = n - k;
        if m.saturating_sub(removed) <= r * (r - 1) / 2 {
            return k
        }
        removed += degrees[k];
    }
    n
}

pub struct BranchAndBound {
    config: SolverConfig,
    interrupt: Option<Arc<AtomicBool>>,
    deadline: Deadline,
    policy: Box<dyn BranchingPolicy>,
    finder: CycleFinder,
    reducer: Reducer,
    /// Counters of the last component.
    pub stats: SearchStats,
    /// Counters of all components since construction.
    pub total: SearchStats,
}

impl BranchAndBound {

    pub fn new(config: SolverConfig) -> Self {
        let policy = config.policy.policy();
        BranchAndBound {
            config,
            interrupt: None,
            deadline: Deadline::default(),
            policy,
            finder: CycleFinder::new(),
            reducer: Reducer::new(),
            stats: SearchStats::new(),
            total: SearchStats::new(),
        }
    }

    /// Every search checks `flag` and stops with `ProcessingError::Interrupted` once it is set.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Starts the clock for a top level call. All components solved afterwards share the time
    /// limit.
    pub fn start(&mut self) -> Result<(), ProcessingError> {
        self.config.validate()?;
        self.deadline = Deadline::new(self.config.time_limit, self.interrupt.clone());
        Ok(())
    }

    /// Solves the cyclic `components` left after reducing `graph`, `forced` being the nodes the
    /// reduction put into the solution. The union is checked against `graph`.
    pub fn solve_split(&mut self, graph: &Digraph, forced: FxHashSet<usize>, components: &[Digraph])
                       -> Result<FxHashSet<usize>, ProcessingError> {
        let mut solution = forced;
        for (i, component) in components.iter().enumerate() {
            info!("component {}/{} with {} nodes and {} edges",
                  i + 1, components.len(), component.num_nodes(), component.num_edges());
            solution.extend(self.solve_component(component)?);
        }
        if !graph.is_acyclic_without(&solution) {
            return Err(ProcessingError::InvalidSolution("graph still has a cycle".to_owned()))
        }
        Ok(solution)
    }

    /// Solves a single component by iterative deepening. The component is reduced first.
    pub fn solve_component(&mut self, component: &Digraph) -> Result<FxHashSet<usize>, ProcessingError> {
        let start = Instant::now();
        self.stats = SearchStats::new();
        self.reducer.counts = RuleCounts::default();
        let mut graph = component.clone();
        let mut solution = self.reducer.reduce(&mut graph);
        let n = graph.num_nodes();
        debug!("component reduced to {} nodes and {} edges, {} nodes forced", n, graph.num_edges(), solution.len());
        if n > 0 {
            self.deadline.check()?;
            if n <= self.config.exhaustive_threshold {
                solution.extend(exhaustive_search_until(&graph, &self.deadline)?);
            } else {
                solution.extend(self.deepen(&graph)?);
            }
        }
        self.stats.reductions = self.reducer.counts;
        self.stats.time_took = start.elapsed().as_millis();
        self.stats.log(&format!("component with {} nodes", component.num_nodes()));
        self.total += self.stats;
        Ok(solution)
    }

    /// Raises the budget until the search finds a solution of the reduced, non empty `graph`.
    fn deepen(&mut self, graph: &Digraph) -> Result<FxHashSet<usize>, ProcessingError> {
        let packing = if self.config.use_packing {
            Packing::build(graph)
        } else {
            Packing::default()
        };
        let closed_form = closed_form_lower_bound(graph);
        let mut k = closed_form.max(packing.size());
        info!("lower bounds: closed form {}, packing {} ({} units)", closed_form, packing.size(), packing.len());
        while k <= graph.num_nodes() {
            self.stats.rounds += 1;
            info!("round with k = {}", k);
            if let Some(solution) = self.search(graph, k, &packing)? {
                return Ok(solution)
            }
            k += 1;
        }
        Err(ProcessingError::GraphError("no solution up to the number of nodes".to_owned()))
    }

    /// Searches a solution of the reduced `graph` with at most `k` nodes. `packing` is a valid
    /// lower bound for `graph`.
    fn search(&mut self, graph: &Digraph, k: usize, packing: &Packing) -> Result<Option<FxHashSet<usize>>, ProcessingError> {
        self.deadline.check()?;
        self.stats.calls += 1;
        if graph.num_nodes() == 0 {
            return Ok(Some(FxHashSet::default()))
        }
        if k == 0 {
            return Ok(None)
        }
        let cycle = self.policy.select(graph, &mut self.finder)
            .ok_or_else(|| ProcessingError::GraphError("reduced graph without a cycle".to_owned()))?;
        trace!("k = {}, branching on {:?}", k, cycle);
        // `rest` is `graph` with all nodes excluded so far bypassed, `rest_packing` a bound for it.
        let mut rest = graph.clone();
        let mut rest_packing = packing.clone();
        let mut rest_touched: FxHashSet<usize> = FxHashSet::default();
        let mut excluded: FxHashSet<usize> = FxHashSet::default();
        for v in cycle {
            self.stats.branches += 1;
            if let Some(solution) = self.branch(&rest, &rest_touched, v, k, &rest_packing, &excluded)? {
                return Ok(Some(solution))
            }
            // Every remaining solution avoids `v`.
            match rest.bypass_node(v) {
                Some(touched) => rest_touched.extend(touched),
                None => {
                    self.stats.infeasible_branches += 1;
                    return Ok(None)
                },
            }
            rest_touched.remove(&v);
            excluded.insert(v);
            if self.config.use_packing {
                rest_packing = rest_packing.update(&rest, &FxHashSet::default(), &excluded).improve(&rest);
                if rest_packing.size() > k || rest_packing.is_infeasible(&rest) {
                    trace!("remaining siblings need more than {} nodes", k);
                    self.stats.parent_prunes += 1;
                    return Ok(None)
                }
            }
        }
        Ok(None)
    }

    /// Deletes `v` from `rest`, reduces and searches the child with the remaining budget.
    /// `touched` holds the nodes of `rest` that may violate the reduction fixed point.
    fn branch(&mut self, rest: &Digraph, touched: &FxHashSet<usize>, v: usize, k: usize, packing: &Packing,
              excluded: &FxHashSet<usize>) -> Result<Option<FxHashSet<usize>>, ProcessingError> {
        let mut child = rest.clone();
        let (ins, outs) = child.remove_node(v).expect("cycle nodes exist");
        let dirty: Vec<usize> = ins.into_iter()
            .chain(outs.into_iter())
            .chain(touched.iter().copied())
            .filter(|n| *n != v)
            .collect();
        let forced = self.reducer.reduce_around(&mut child, dirty);
        let cost = 1 + forced.len();
        if cost > k {
            self.stats.infeasible_branches += 1;
            return Ok(None)
        }
        let next_k = k - cost;
        let child_packing = if self.config.use_packing {
            let mut deleted = forced.clone();
            deleted.insert(v);
            let updated = packing.update(&child, &deleted, excluded);
            if updated.size() > next_k || updated.is_infeasible(&child) {
                self.stats.packing_prunes += 1;
                return Ok(None)
            }
            updated
        } else {
            Packing::default()
        };
        Ok(self.search(&child, next_k, &child_packing)?.map(|mut solution| {
            solution.insert(v);
            solution.extend(forced);
            solution
        }))
    }
}

impl ExactSolver for BranchAndBound {
    fn solve(&mut self, graph: &Digraph) -> Result<FxHashSet<usize>, ProcessingError> {
        self.start()?;
        let mut kernel = graph.clone();
        let forced = self.reducer.reduce(&mut kernel);
        let components = kernel.split_into_cyclic_components();
        self.solve_split(graph, forced, &components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;
    use crate::exhaustive::ExhaustiveSearch;

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

    fn bidirected_clique(nodes: &[usize]) -> Vec<(usize, usize)> {
        nodes.iter()
            .cartesian_product(nodes.iter())
            .filter(|(u, v)| u != v)
            .map(|(u, v)| (*u, *v))
            .collect()
    }

    fn solve(graph: &Digraph) -> FxHashSet<usize> {
        BranchAndBound::new(SolverConfig::default()).solve(graph).unwrap()
    }

    #[test]
    fn bridged_triangles_test() {
        // A -> B -> C -> A and E -> F -> G -> E, joined by A -> D -> E.
        let g = Digraph::from_edges(vec![(0, 1), (1, 2), (2, 0), (4, 5), (5, 6), (6, 4), (0, 3), (3, 4)]);
        let solution = solve(&g);
        assert_eq!(solution.len(), 2);
        assert_eq!(solution.iter().filter(|n| [0, 1, 2].contains(*n)).count(), 1);
        assert_eq!(solution.iter().filter(|n| [4, 5, 6].contains(*n)).count(), 1);
    }

    #[test]
    fn mutual_pairs_test() {
        let g = Digraph::from_edges(vec![(0, 1), (1, 0), (2, 3), (3, 2), (4, 5), (5, 4)]);
        let solution = solve(&g);
        assert_eq!(solution.len(), 3);
        for pair in &[[0, 1], [2, 3], [4, 5]] {
            assert_eq!(pair.iter().filter(|n| solution.contains(*n)).count(), 1);
        }
    }

    #[test]
    fn self_loop_test() {
        let mut edges = bidirected_clique(&[0, 1, 2, 3]);
        edges.extend(vec![(4, 4), (4, 0), (1, 4)]);
        let g = Digraph::from_edges(edges);
        let solution = solve(&g);
        assert!(solution.contains(&4));
        assert_eq!(solution.len(), 4);
    }

    #[test]
    fn acyclic_test() {
        let g = Digraph::from_edges(vec![(0, 1), (0, 2), (1, 3), (2, 3), (3, 4), (1, 4)]);
        assert!(solve(&g).is_empty());
    }

    #[test]
    fn clique_test() {
        let g = Digraph::from_edges(bidirected_clique(&[0, 1, 2, 3, 4]));
        assert_eq!(closed_form_lower_bound(&g), 3);
        let mut solver = BranchAndBound::new(SolverConfig::default());
        assert_eq!(solver.solve(&g).unwrap().len(), 4);
        assert_eq!(solver.total.rounds, 1);
    }

    #[test]
    fn closed_form_test() {
        let g = Digraph::from_edges(bidirected_clique(&[0, 1, 2, 3]));
        assert_eq!(closed_form_lower_bound(&g), 2);
        let h = Digraph::from_edges(vec![(0, 1), (1, 2), (2, 0)]);
        assert_eq!(closed_form_lower_bound(&h), 0);
    }

    #[test]
    fn policy_from_str_test() {
        assert_eq!("input-order".parse::<PolicyKind>(), Ok(PolicyKind::InputOrder));
        assert_eq!(PolicyKind::MinDegree.to_string(), "min-degree");
        assert!("largest".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn timeout_test() {
        let g = Digraph::from_edges(bidirected_clique(&[0, 1, 2, 3, 4]));
        let config = SolverConfig {
            time_limit: Some(Duration::from_secs(0)),
            ..SolverConfig::default()
        };
        assert_eq!(BranchAndBound::new(config).solve(&g), Err(ProcessingError::OutOfTime));
    }

    #[test]
    fn interrupt_test() {
        let g = Digraph::from_edges(bidirected_clique(&[0, 1, 2, 3, 4]));
        let flag = Arc::new(AtomicBool::new(true));
        let mut solver = BranchAndBound::new(SolverConfig::default()).with_interrupt(flag);
        assert_eq!(solver.solve(&g), Err(ProcessingError::Interrupted));
    }

    #[test]
    fn differential_test() {
        let mut rng = StdRng::seed_from_u64(42);
        let policies = [PolicyKind::MaxMinDegree, PolicyKind::InputOrder, PolicyKind::MinDegree];
        for round in 0..240 {
            let n = 3 + round % 10;
            let p = [0.15, 0.25, 0.4][round % 3];
            let g = random_graph(&mut rng, n, p);
            let opt = ExhaustiveSearch::default().solve(&g).unwrap().len();
            let config = SolverConfig {
                policy: policies[(round / 3) % 3],
                use_packing: round % 2 == 0,
                ..SolverConfig::default()
            };
            let solution = BranchAndBound::new(config).solve(&g).unwrap();
            assert_eq!(solution.len(), opt, "round {}", round);
            assert!(g.is_acyclic_without(&solution));
        }
    }

    #[test]
    fn packing_agrees_test() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..30 {
            let g = random_graph(&mut rng, 18, 0.2);
            let with = BranchAndBound::new(SolverConfig::default()).solve(&g).unwrap();
            let without = BranchAndBound::new(SolverConfig { use_packing: false, ..SolverConfig::default() })
                .solve(&g).unwrap();
            assert_eq!(with.len(), without.len());
            assert!(g.is_acyclic_without(&with));
        }
    }

    #[test]
    fn exhaustive_threshold_test() {
        let g = Digraph::from_edges(bidirected_clique(&[0, 1, 2, 3, 4]));
        let config = SolverConfig {
            exhaustive_threshold: 8,
            ..SolverConfig::default()
        };
        let mut solver = BranchAndBound::new(config);
        assert_eq!(solver.solve(&g).unwrap().len(), 4);
        assert_eq!(solver.total.calls, 0);
    }

    #[test]
    fn exhaustive_threshold_limit_test() {
        let n = 70;
        let edges: Vec<(usize, usize)> = (0..n).flat_map(|i| vec![(i, (i + 1) % n), ((i + 1) % n, i)]).collect();
        let g = Digraph::from_edges(edges);
        let config = SolverConfig {
            exhaustive_threshold: 100,
            ..SolverConfig::default()
        };
        assert!(matches!(BranchAndBound::new(config).solve(&g), Err(ProcessingError::InvalidParameter(_))));
    }

    #[test]
    fn exhaustive_threshold_timeout_test() {
        // Circulant with arcs in both directions to the next two nodes, no reduction applies.
        let n = 40;
        let edges: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| vec![(i, (i + 1) % n), ((i + 1) % n, i), (i, (i + 2) % n), ((i + 2) % n, i)])
            .collect();
        let g = Digraph::from_edges(edges);
        let config = SolverConfig {
            time_limit: Some(Duration::from_millis(200)),
            exhaustive_threshold: MAX_EXHAUSTIVE_NODES,
            ..SolverConfig::default()
        };
        let start = Instant::now();
        assert_eq!(BranchAndBound::new(config).solve(&g), Err(ProcessingError::OutOfTime));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn deterministic_test() {
        let mut rng = StdRng::seed_from_u64(9);
        let g = random_graph(&mut rng, 12, 0.3);
        let first = solve(&g);
        let mut second_solver = BranchAndBound::new(SolverConfig::default());
        assert_eq!(second_solver.solve(&g).unwrap(), first);
    }
}
