#![allow(dead_code)]

use std::ops::Range;

use petgraph::{algo::is_cyclic_undirected, graph::UnGraph};

use crate::cfn::graphical_model::PotentialFunction;

use super::{
    builder::ReservationCounts,
    view_functions::{FixedViewFunction, PositionAndLabel, SubFunction, ViewFunction},
};

/// Anything that accepts the factors of a submodel one at a time.
/// `variables` are local variable indices in the function's position order.
pub trait FactorSink<'a, F> {
    fn add_factor(&mut self, variables: &[usize], function: SubFunction<'a, F>);
}

// Node of the factor/variable incidence graph of a submodel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidenceNode {
    Variable(usize),
    Factor(usize),
}

pub type IncidenceGraph = UnGraph<IncidenceNode, (), usize>;

#[derive(Debug, Clone, Copy)]
enum FunctionIndex {
    View(usize),
    Fixed(usize),
}

struct SubFactor {
    function: FunctionIndex,
    variables: Range<usize>, // range in `variable_indices`
}

/// A materialized submodel over local variables `0..num_variables()`.
/// Functions borrow the original model's functions; views and fixed views are kept in separate pools.
pub struct SubModel<'a, F> {
    space: Vec<usize>,
    variable_indices: Vec<usize>,
    factors: Vec<SubFactor>,
    view_functions: Vec<ViewFunction<'a, F>>,
    fixed_functions: Vec<FixedViewFunction<'a, F>>,
}

impl<'a, F: PotentialFunction> SubModel<'a, F> {
    // Creates a submodel without factors over variables with the given domain sizes
    pub fn new(space: &[usize]) -> Self {
        SubModel {
            space: space.to_vec(),
            variable_indices: Vec::new(),
            factors: Vec::new(),
            view_functions: Vec::new(),
            fixed_functions: Vec::new(),
        }
    }

    pub fn reserve(&mut self, counts: &ReservationCounts) -> &mut Self {
        self.factors.reserve(counts.factors);
        self.variable_indices.reserve(counts.variable_indices);
        self.view_functions.reserve(counts.view_functions());
        self.fixed_functions.reserve(counts.fixed_functions());
        self
    }

    pub fn num_variables(&self) -> usize {
        self.space.len()
    }

    pub fn num_labels(&self, variable: usize) -> usize {
        self.space[variable]
    }

    pub fn space(&self) -> &[usize] {
        &self.space
    }

    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    pub fn num_variable_indices(&self) -> usize {
        self.variable_indices.len()
    }

    pub fn num_view_functions(&self) -> usize {
        self.view_functions.len()
    }

    pub fn num_fixed_functions(&self) -> usize {
        self.fixed_functions.len()
    }

    pub fn factor_variables(&self, factor: usize) -> &[usize] {
        &self.variable_indices[self.factors[factor].variables.clone()]
    }

    pub fn factor_order(&self, factor: usize) -> usize {
        self.factors[factor].variables.len()
    }

    // Labels pinned by the factor's fixed view, or None if the factor is a plain view
    pub fn factor_fixed_labels(&self, factor: usize) -> Option<&[PositionAndLabel]> {
        match self.factors[factor].function {
            FunctionIndex::View(_) => None,
            FunctionIndex::Fixed(index) => Some(self.fixed_functions[index].fixed()),
        }
    }

    // Value of a factor for labels given in its position order
    pub fn factor_value(&self, factor: usize, labels: &[usize]) -> f64 {
        match self.factors[factor].function {
            FunctionIndex::View(index) => self.view_functions[index].value(labels),
            FunctionIndex::Fixed(index) => self.fixed_functions[index].value(labels),
        }
    }

    // Value of a factor under a labelling indexed by local variable, using `buffer` for the label tuple
    pub fn evaluate(&self, factor: usize, labelling: &[usize], buffer: &mut Vec<usize>) -> f64 {
        buffer.clear();
        buffer.extend(
            self.factor_variables(factor)
                .iter()
                .map(|&variable| labelling[variable]),
        );
        self.factor_value(factor, buffer)
    }

    // Total value of a full labelling of the local variables
    pub fn energy(&self, labelling: &[usize]) -> f64 {
        assert_eq!(
            labelling.len(),
            self.num_variables(),
            "Labelling must assign every variable of the submodel."
        );
        let mut buffer = Vec::new();
        (0..self.num_factors())
            .map(|factor| self.evaluate(factor, labelling, &mut buffer))
            .sum()
    }

    // Factors containing each variable, in factor order
    pub fn factors_of_variable(&self) -> Vec<Vec<usize>> {
        let mut factors_of_variable = vec![Vec::new(); self.num_variables()];
        for factor in 0..self.num_factors() {
            for &variable in self.factor_variables(factor) {
                factors_of_variable[variable].push(factor);
            }
        }
        factors_of_variable
    }

    // Bipartite graph with nodes `0..num_variables()` for variables followed by one node per factor
    pub fn incidence_graph(&self) -> IncidenceGraph {
        let mut graph = IncidenceGraph::with_capacity(
            self.num_variables() + self.num_factors(),
            self.num_variable_indices(),
        );
        let variable_nodes: Vec<_> = (0..self.num_variables())
            .map(|variable| graph.add_node(IncidenceNode::Variable(variable)))
            .collect();
        for factor in 0..self.num_factors() {
            let factor_node = graph.add_node(IncidenceNode::Factor(factor));
            for &variable in self.factor_variables(factor) {
                graph.add_edge(variable_nodes[variable], factor_node, ());
            }
        }
        graph
    }

    // True if the factor/variable incidence graph is a forest
    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_undirected(&self.incidence_graph())
    }
}

impl<'a, F: PotentialFunction> FactorSink<'a, F> for SubModel<'a, F> {
    fn add_factor(&mut self, variables: &[usize], function: SubFunction<'a, F>) {
        assert_eq!(
            variables.len(),
            function.arity(),
            "Number of variables doesn't match the arity of the function."
        );
        assert!(
            variables.iter().all(|&variable| variable < self.num_variables()),
            "Factor refers to a variable outside of the submodel."
        );

        let start = self.variable_indices.len();
        self.variable_indices.extend_from_slice(variables);
        let function = match function {
            SubFunction::View(function) => {
                self.view_functions.push(function);
                FunctionIndex::View(self.view_functions.len() - 1)
            }
            SubFunction::Fixed(function) => {
                self.fixed_functions.push(function);
                FunctionIndex::Fixed(self.fixed_functions.len() - 1)
            }
        };
        self.factors.push(SubFactor {
            function,
            variables: start..self.variable_indices.len(),
        });
    }
}
