//! An instance of the directed feedback vertex set problem.
//!
//! The graph works on dense ids `0..n`, the labels of the input file are kept next to it and
//! only used for reading and writing. Solving an instance first reduces the whole graph, then
//! splits it into its cyclic strongly connected components and solves each one on its own.

use std::io::prelude::*;
use std::io;
use fxhash::{FxHashMap, FxHashSet};
use log::info;
use regex::Regex;
use crate::digraph::Digraph;
use crate::reduction_rules::{Reducer, RuleCounts};
use crate::branch_and_bound::BranchAndBound;
use crate::cust_errors::{ImportError, ProcessingError};

#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct DFVSInstance {
    pub name: String,
    pub graph: Digraph,
    labels: Vec<String>,
    label_ids: FxHashMap<String, usize>,
    pub known_optimum: Option<usize>,
    /// Nodes forced into the solution by reducing the whole graph.
    pub solution: FxHashSet<usize>,
    /// The cyclic components left after the reduction.
    pub components: Vec<Digraph>,
}

impl DFVSInstance {

    /// Returns a new `DFVSInstance` whose labels are the node ids.
    pub fn new(name: &str, graph: Digraph, known_optimum: Option<usize>) -> Self {
        let labels: Vec<String> = (0..graph.num_reserved_nodes()).map(|i| i.to_string()).collect();
        let label_ids = labels.iter().cloned().enumerate().map(|(i, l)| (l, i)).collect();
        DFVSInstance {
            name: name.to_owned(),
            graph,
            labels,
            label_ids,
            known_optimum,
            solution: FxHashSet::default(),
            components: Vec::new(),
        }
    }

    /// Reads an edge list. Every line that is neither empty nor starts with `#` or `%` holds two
    /// labels separated by whitespace, an edge from the first to the second. Nodes get their ids
    /// in the order their labels first appear.
    pub fn read_edge_list<R: BufRead>(name: &str, input: R) -> Result<Self, ImportError> {
        let edge_re = Regex::new(r"^\s*(\S+)\s+(\S+)\s*$").expect("the pattern is valid");
        let mut instance = DFVSInstance {
            name: name.to_owned(),
            ..DFVSInstance::default()
        };
        for (index, line) in input.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('%') {
                continue
            }
            let caps = edge_re.captures(&line).ok_or_else(|| ImportError::InputMalformedError(index + 1, line.clone()))?;
            let src = instance.intern(&caps[1]);
            let trg = instance.intern(&caps[2]);
            instance.graph.add_arc((src, trg));
        }
        Ok(instance)
    }

    fn intern(&mut self, label: &str) -> usize {
        if let Some(id) = self.label_ids.get(label) {
            return *id
        }
        let id = self.labels.len();
        self.labels.push(label.to_owned());
        self.label_ids.insert(label.to_owned(), id);
        self.graph.ensure_node(id);
        id
    }

    /// The label of `node`.
    ///
    /// # Panics
    /// Panics if `node` is out of bounds.
    pub fn label(&self, node: usize) -> &str {
        &self.labels[node]
    }

    /// The id of the node labeled `label`.
    pub fn node(&self, label: &str) -> Option<usize> {
        self.label_ids.get(label).copied()
    }

    /// Reduces a copy of the graph, stores the forced nodes in `self.solution` and the cyclic
    /// components of the rest in `self.components`.
    pub fn reduce_and_split(&mut self) -> RuleCounts {
        let mut kernel = self.graph.clone();
        let mut reducer = Reducer::new();
        self.solution = reducer.reduce(&mut kernel);
        self.components = kernel.split_into_cyclic_components();
        info!("{}: kernel with {} nodes and {} edges in {} components, {} nodes forced by {} rule applications",
              self.name, kernel.num_nodes(), kernel.num_edges(), self.components.len(), self.solution.len(),
              reducer.counts.total());
        reducer.counts
    }

    /// Computes a minimum solution with `solver`. The solution is checked against the graph and
    /// the known optimum, if any.
    pub fn solve(&mut self, solver: &mut BranchAndBound) -> Result<FxHashSet<usize>, ProcessingError> {
        solver.start()?;
        self.reduce_and_split();
        let solution = solver.solve_split(&self.graph, self.solution.clone(), &self.components)?;
        solver.total.log(&self.name);
        if let Some(optimum) = self.known_optimum {
            if optimum != solution.len() {
                return Err(ProcessingError::InvalidSolution(
                    format!("{}: found {} nodes, known optimum is {}", self.name, solution.len(), optimum)))
            }
        }
        Ok(solution)
    }

    /// Writes the labels of `solution` to `out`, one per line, ordered by id.
    pub fn write_solution<W: Write>(&self, solution: &FxHashSet<usize>, mut out: W) -> Result<(), io::Error> {
        let mut nodes: Vec<usize> = solution.iter().copied().collect();
        nodes.sort_unstable();
        for node in nodes {
            writeln!(out, "{}", self.label(node))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;
    use crate::branch_and_bound::SolverConfig;
    use crate::exhaustive::exhaustive_search;

    #[test]
    fn read_edge_list_test() {
        let input = Cursor::new("# a comment\n% another one\n\nalpha beta\nbeta  gamma\n  gamma alpha \ngamma delta\nalpha beta\n");
        let instance = DFVSInstance::read_edge_list("test", input).unwrap();
        assert_eq!(instance.graph.num_nodes(), 4);
        assert_eq!(instance.graph.num_edges(), 4);
        assert_eq!(instance.label(0), "alpha");
        assert_eq!(instance.node("delta"), Some(3));
        assert_eq!(instance.node("epsilon"), None);
        assert!(instance.graph.has_edge((2, 0)));
    }

    #[test]
    fn malformed_line_test() {
        let input = Cursor::new("1 2\n2 3 4\n");
        match DFVSInstance::read_edge_list("bad", input) {
            Err(ImportError::InputMalformedError(line, content)) => {
                assert_eq!(line, 2);
                assert_eq!(content, "2 3 4");
            },
            other => panic!("expected a malformed line, got {:?}", other),
        }
        assert!(DFVSInstance::read_edge_list("bad", Cursor::new("lonely\n")).is_err());
    }

    #[test]
    fn solve_with_labels_test() {
        let input = Cursor::new("x x\nx a\na b\nb a\nb c\n");
        let mut instance = DFVSInstance::read_edge_list("loop", input).unwrap();
        instance.known_optimum = Some(2);
        let mut solver = BranchAndBound::new(SolverConfig::default());
        let solution = instance.solve(&mut solver).unwrap();
        assert!(solution.contains(&instance.node("x").unwrap()));
        assert_eq!(solution.len(), 2);
        let mut out = Vec::new();
        instance.write_solution(&solution, &mut out).unwrap();
        let written = String::from_utf8(out).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.lines().any(|l| l == "x"));
    }

    #[test]
    fn wrong_optimum_test() {
        let g = Digraph::from_edges(vec![(0, 1), (1, 0), (2, 3), (3, 2)]);
        let mut instance = DFVSInstance::new("pairs", g, Some(1));
        let mut solver = BranchAndBound::new(SolverConfig::default());
        assert!(matches!(instance.solve(&mut solver), Err(ProcessingError::InvalidSolution(_))));
    }

    #[test]
    fn component_additivity_test() {
        let mut rng = StdRng::seed_from_u64(1);
        for round in 0..100 {
            let n = 4 + round % 9;
            let mut g = Digraph::with_nodes(n);
            for u in 0..n {
                for v in 0..n {
                    if rng.gen_bool(0.2) {
                        g.add_arc((u, v));
                    }
                }
            }
            let opt = exhaustive_search(&g).len();
            let per_component: usize = g.split_into_cyclic_components().iter()
                .map(|c| exhaustive_search(c).len())
                .sum();
            assert_eq!(per_component, opt);
            let mut instance = DFVSInstance::new("random", g, Some(opt));
            let mut solver = BranchAndBound::new(SolverConfig::default());
            assert_eq!(instance.solve(&mut solver).unwrap().len(), opt);
        }
    }
}
