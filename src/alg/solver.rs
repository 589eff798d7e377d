#![allow(dead_code)]

use std::{fmt::Display, str::FromStr, time::Duration};

use crate::cfn::graphical_model::PotentialFunction;
use crate::submodel::sub_model::SubModel;

pub struct SolverOptions {
    max_iterations: usize, // maximal number of search nodes to expand
    time_max: Duration,
    max_nodes: usize, // maximal number of search nodes held in memory at once
}

impl SolverOptions {
    pub fn default() -> Self {
        SolverOptions {
            max_iterations: 10_000_000,
            time_max: Duration::new(60, 0), // 1 minute
            max_nodes: 1 << 22,
        }
    }

    pub fn set_max_iterations(&mut self, value: usize) -> &mut Self {
        self.max_iterations = value;
        self
    }

    pub fn set_time_max(&mut self, value: Duration) -> &mut Self {
        self.time_max = value;
        self
    }

    pub fn set_max_nodes(&mut self, value: usize) -> &mut Self {
        self.max_nodes = value;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn time_max(&self) -> Duration {
        self.time_max
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }
}

// Back end used to optimize a submodel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    BranchAndBound,     // consumes factors as they are streamed
    AStar,              // needs a materialized submodel
    DynamicProgramming, // needs a materialized acyclic submodel
}

impl FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bnb" | "branch-and-bound" => Ok(SolverKind::BranchAndBound),
            "astar" => Ok(SolverKind::AStar),
            "dp" | "dynamic-programming" => Ok(SolverKind::DynamicProgramming),
            _ => Err(format!("unknown solver {:?}, expected bnb, astar or dp", s)),
        }
    }
}

impl Display for SolverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SolverKind::BranchAndBound => "bnb",
            SolverKind::AStar => "astar",
            SolverKind::DynamicProgramming => "dp",
        };
        write!(f, "{}", name)
    }
}

pub trait Solver {
    fn run(self, options: &SolverOptions) -> Self;
    // Writes the best labelling found into `arg`
    fn arg(&self, arg: &mut Vec<usize>);
    fn value(&self) -> f64;
}

// Precomputed data for searching over the variables of a submodel in index order.
// A factor is scored at the depth of its last variable; unscored factors are bounded by their minimum.
pub struct SearchTables {
    completing: Vec<Vec<usize>>, // factors whose last variable is the one at this depth
    remaining_bound: Vec<f64>,   // lower bound on all factors completing at this depth or later
}

impl SearchTables {
    pub fn new<F: PotentialFunction>(model: &SubModel<F>) -> Self {
        let num_variables = model.num_variables();
        let mut completing = vec![Vec::new(); num_variables];
        let mut bound_at = vec![0.; num_variables];

        let mut shape = Vec::new();
        for factor in 0..model.num_factors() {
            let variables = model.factor_variables(factor);
            let depth = *variables
                .iter()
                .max()
                .expect("submodel factors have at least one variable");
            completing[depth].push(factor);

            shape.clear();
            shape.extend(variables.iter().map(|&variable| model.num_labels(variable)));
            let mut minimum = f64::INFINITY;
            for_each_labeling(&shape, |labels| {
                minimum = minimum.min(model.factor_value(factor, labels))
            });
            bound_at[depth] += minimum;
        }

        let mut remaining_bound = vec![0.; num_variables + 1];
        for depth in (0..num_variables).rev() {
            remaining_bound[depth] = remaining_bound[depth + 1] + bound_at[depth];
        }

        SearchTables {
            completing,
            remaining_bound,
        }
    }

    // Lower bound on the factors not yet scored once `depth` variables are labelled
    pub fn remaining_bound(&self, depth: usize) -> f64 {
        self.remaining_bound[depth]
    }

    // Value of the factors completed by labelling the variable at `depth`;
    // `labelling` must hold labels for variables `0..=depth`
    pub fn step_cost<F: PotentialFunction>(
        &self,
        model: &SubModel<F>,
        depth: usize,
        labelling: &[usize],
        buffer: &mut Vec<usize>,
    ) -> f64 {
        self.completing[depth]
            .iter()
            .map(|&factor| model.evaluate(factor, labelling, buffer))
            .sum()
    }

    // Extends `labelling` to all variables, choosing at each depth the label with the cheapest step cost.
    // Returns the value of the completed part.
    pub fn greedy_completion<F: PotentialFunction>(
        &self,
        model: &SubModel<F>,
        labelling: &mut Vec<usize>,
    ) -> f64 {
        let mut buffer = Vec::new();
        let mut value = 0.;
        for depth in labelling.len()..model.num_variables() {
            labelling.push(0);
            let mut best = (f64::INFINITY, 0);
            for label in 0..model.num_labels(depth) {
                labelling[depth] = label;
                let cost = self.step_cost(model, depth, labelling, &mut buffer);
                if cost < best.0 {
                    best = (cost, label);
                }
            }
            labelling[depth] = best.1;
            value += best.0;
        }
        value
    }
}

// Calls `visit` on every label tuple of the given shape, last position varying fastest
pub fn for_each_labeling(shape: &[usize], mut visit: impl FnMut(&[usize])) {
    if shape.iter().any(|&size| size == 0) {
        return;
    }
    let mut labels = vec![0; shape.len()];
    loop {
        visit(&labels);
        let mut position = shape.len();
        loop {
            if position == 0 {
                return;
            }
            position -= 1;
            labels[position] += 1;
            if labels[position] < shape[position] {
                break;
            }
            labels[position] = 0;
        }
    }
}
