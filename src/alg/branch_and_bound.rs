#![allow(dead_code)]

use std::time::Instant;

use log::{debug, warn};

use crate::{
    cfn::graphical_model::PotentialFunction,
    submodel::{
        sub_model::{FactorSink, SubModel},
        view_functions::SubFunction,
    },
};

use super::solver::{SearchTables, Solver, SolverOptions};

/// Exact depth-first branch and bound over the variables of a submodel.
///
/// Factors are handed over one at a time through [`FactorSink`], so the solver can be fed
/// directly by the submodel builder without a separate reservation pass.
pub struct BranchAndBound<'a, F> {
    model: SubModel<'a, F>,
    arg: Vec<usize>,
    value: f64,
}

impl<'a, F: PotentialFunction> BranchAndBound<'a, F> {
    // Creates a solver without factors over variables with the given domain sizes
    pub fn new(space: &[usize]) -> Self {
        BranchAndBound {
            model: SubModel::new(space),
            arg: Vec::new(),
            value: f64::INFINITY,
        }
    }

    pub fn model(&self) -> &SubModel<'a, F> {
        &self.model
    }
}

impl<'a, F: PotentialFunction> FactorSink<'a, F> for BranchAndBound<'a, F> {
    fn add_factor(&mut self, variables: &[usize], function: SubFunction<'a, F>) {
        self.model.add_factor(variables, function);
    }
}

struct DepthFirstSearch<'s, 'a, F> {
    model: &'s SubModel<'a, F>,
    tables: &'s SearchTables,
    options: &'s SolverOptions,
    time_start: Instant,
    labelling: Vec<usize>,
    buffer: Vec<usize>,
    best: Vec<usize>,
    best_value: f64,
    expansions: usize,
    stopped: bool,
}

impl<'s, 'a, F: PotentialFunction> DepthFirstSearch<'s, 'a, F> {
    fn out_of_budget(&self) -> bool {
        self.expansions > self.options.max_iterations()
            || (self.expansions % 1024 == 0 && self.time_start.elapsed() > self.options.time_max())
    }

    fn descend(&mut self, depth: usize, cost: f64) {
        if depth == self.model.num_variables() {
            if cost < self.best_value {
                self.best_value = cost;
                self.best.copy_from_slice(&self.labelling);
            }
            return;
        }

        self.expansions += 1;
        if self.out_of_budget() {
            self.stopped = true;
            return;
        }

        for label in 0..self.model.num_labels(depth) {
            self.labelling[depth] = label;
            let step = self
                .tables
                .step_cost(self.model, depth, &self.labelling, &mut self.buffer);
            if cost + step + self.tables.remaining_bound(depth + 1) < self.best_value {
                self.descend(depth + 1, cost + step);
                if self.stopped {
                    return;
                }
            }
        }
    }
}

impl<'a, F: PotentialFunction> Solver for BranchAndBound<'a, F> {
    fn run(mut self, options: &SolverOptions) -> Self {
        let time_start = Instant::now();
        let tables = SearchTables::new(&self.model);

        // Start from the greedy labelling so that pruning is effective from the first branch
        let mut incumbent = Vec::with_capacity(self.model.num_variables());
        let incumbent_value = tables.greedy_completion(&self.model, &mut incumbent);

        let mut search = DepthFirstSearch {
            model: &self.model,
            tables: &tables,
            options,
            time_start,
            labelling: vec![0; self.model.num_variables()],
            buffer: Vec::new(),
            best: incumbent,
            best_value: incumbent_value,
            expansions: 0,
            stopped: false,
        };
        search.descend(0, 0.);

        if search.stopped {
            warn!(
                "Branch and bound stopped after {} expansions, returning best labelling found",
                search.expansions
            );
        }
        debug!(
            "Branch and bound finished with value {} after {} expansions in {:?}",
            search.best_value,
            search.expansions,
            time_start.elapsed()
        );

        self.value = search.best_value;
        self.arg = search.best;
        self
    }

    fn arg(&self, arg: &mut Vec<usize>) {
        arg.clear();
        arg.extend_from_slice(&self.arg);
    }

    fn value(&self) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        alg::solver::tests::brute_force,
        factor_types::{factor_type::FactorType, function_table::FunctionTable, potts::Potts},
        submodel::view_functions::{FixedViewFunction, PositionAndLabel, ViewFunction},
    };

    use super::*;

    #[test]
    fn matches_brute_force_on_cycle() {
        let unaries: Vec<FactorType> = (0..4)
            .map(|variable| {
                FunctionTable::from_fn(&[3], |l| ((l[0] + variable) % 3) as f64 * 1.5).into()
            })
            .collect();
        let potts: FactorType = Potts::new((3, 3), 1.).into();
        let triple: FactorType = FunctionTable::from_fn(&[3, 3, 3], |l| {
            if l[0] == l[1] && l[1] == l[2] {
                -4.
            } else {
                0.
            }
        })
        .into();

        let mut solver = BranchAndBound::new(&[3, 3, 3, 3]);
        for (variable, unary) in unaries.iter().enumerate() {
            solver.add_factor(&[variable], SubFunction::View(ViewFunction::new(unary)));
        }
        for variable in 0..4 {
            solver.add_factor(
                &[variable, (variable + 1) % 4],
                SubFunction::View(ViewFunction::new(&potts)),
            );
        }
        solver.add_factor(
            &[2, 0],
            SubFunction::Fixed(FixedViewFunction::new(
                &triple,
                vec![PositionAndLabel {
                    position: 1,
                    label: 2,
                }],
            )),
        );

        let (expected_value, _) = brute_force(solver.model());
        let solver = solver.run(&SolverOptions::default());
        let mut arg = Vec::new();
        solver.arg(&mut arg);

        assert_eq!(arg.len(), 4);
        assert_eq!(solver.value(), expected_value);
        assert_eq!(solver.model().energy(&arg), expected_value);
    }

    #[test]
    fn exhausted_budget_returns_complete_labelling() {
        let potts = Potts::new((2, 2), 1.);
        let mut solver = BranchAndBound::new(&[2; 6]);
        for variable in 0..5 {
            solver.add_factor(
                &[variable, variable + 1],
                SubFunction::View(ViewFunction::new(&potts)),
            );
        }
        let mut options = SolverOptions::default();
        options.set_max_iterations(0);

        let solver = solver.run(&options);
        let mut arg = Vec::new();
        solver.arg(&mut arg);
        assert_eq!(arg.len(), 6);
        assert_eq!(solver.value(), solver.model().energy(&arg));
    }
}
