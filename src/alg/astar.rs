#![allow(dead_code)]

use std::{cmp::Ordering, collections::BinaryHeap, time::Instant};

use log::{debug, warn};

use crate::{cfn::graphical_model::PotentialFunction, submodel::sub_model::SubModel};

use super::solver::{SearchTables, Solver, SolverOptions};

// Partial labelling of the first `depth` variables, stored as a path to the root
struct SearchNode {
    parent: Option<usize>,
    label: usize, // label of variable `depth - 1`
    depth: usize,
    cost: f64, // value of the factors completed so far
}

struct QueueEntry {
    priority: f64,
    depth: usize,
    node: usize,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Smallest priority first, deeper nodes first among equals
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| self.depth.cmp(&other.depth))
    }
}

/// Best-first search over partial labellings of a materialized submodel.
/// The heuristic is the sum of the minima of all factors that are not yet complete, which never
/// overestimates, so the first complete labelling taken from the queue is optimal.
pub struct AStar<'s, 'a, F> {
    model: &'s SubModel<'a, F>,
    arg: Vec<usize>,
    value: f64,
}

impl<'s, 'a, F: PotentialFunction> AStar<'s, 'a, F> {
    pub fn new(model: &'s SubModel<'a, F>) -> Self {
        AStar {
            model,
            arg: Vec::new(),
            value: f64::INFINITY,
        }
    }

    // Writes the labels on the path from the root to `node` into `labelling`
    fn prefix(nodes: &[SearchNode], node: usize, labelling: &mut Vec<usize>) {
        labelling.clear();
        labelling.resize(nodes[node].depth, 0);
        let mut current = node;
        while let Some(parent) = nodes[current].parent {
            labelling[nodes[current].depth - 1] = nodes[current].label;
            current = parent;
        }
    }
}

impl<'s, 'a, F: PotentialFunction> Solver for AStar<'s, 'a, F> {
    fn run(mut self, options: &SolverOptions) -> Self {
        let time_start = Instant::now();
        let tables = SearchTables::new(self.model);
        let num_variables = self.model.num_variables();

        let mut nodes = vec![SearchNode {
            parent: None,
            label: 0,
            depth: 0,
            cost: 0.,
        }];
        let mut queue = BinaryHeap::new();
        queue.push(QueueEntry {
            priority: tables.remaining_bound(0),
            depth: 0,
            node: 0,
        });

        let mut labelling = Vec::with_capacity(num_variables);
        let mut buffer = Vec::new();
        let mut expansions = 0;
        let mut goal = None;

        while let Some(entry) = queue.pop() {
            if entry.depth == num_variables {
                goal = Some(entry.node);
                break;
            }

            expansions += 1;
            let depth = entry.depth;
            if expansions > options.max_iterations()
                || nodes.len() + self.model.num_labels(depth) > options.max_nodes()
                || (expansions % 1024 == 0 && time_start.elapsed() > options.time_max())
            {
                warn!(
                    "A* stopped after {} expansions ({} nodes), completing the best partial labelling greedily",
                    expansions,
                    nodes.len()
                );
                Self::prefix(&nodes, entry.node, &mut labelling);
                tables.greedy_completion(self.model, &mut labelling);
                break;
            }

            Self::prefix(&nodes, entry.node, &mut labelling);
            labelling.push(0);
            let cost = nodes[entry.node].cost;
            for label in 0..self.model.num_labels(depth) {
                labelling[depth] = label;
                let child_cost = cost + tables.step_cost(self.model, depth, &labelling, &mut buffer);
                nodes.push(SearchNode {
                    parent: Some(entry.node),
                    label,
                    depth: depth + 1,
                    cost: child_cost,
                });
                queue.push(QueueEntry {
                    priority: child_cost + tables.remaining_bound(depth + 1),
                    depth: depth + 1,
                    node: nodes.len() - 1,
                });
            }
        }

        match goal {
            Some(node) => {
                Self::prefix(&nodes, node, &mut labelling);
                self.value = nodes[node].cost;
            }
            None => {
                if labelling.len() != num_variables {
                    labelling.clear();
                    tables.greedy_completion(self.model, &mut labelling);
                }
                self.value = self.model.energy(&labelling);
            }
        }
        debug!(
            "A* finished with value {} after {} expansions ({} nodes) in {:?}",
            self.value,
            expansions,
            nodes.len(),
            time_start.elapsed()
        );

        self.arg = labelling;
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
        submodel::{
            sub_model::FactorSink,
            view_functions::{SubFunction, ViewFunction},
        },
    };

    use super::*;

    #[test]
    fn matches_brute_force_on_grid() {
        // 2x3 grid with attractive edges and unaries pulling the corners apart
        let unaries: Vec<FactorType> = (0..6)
            .map(|variable| match variable {
                0 => FunctionTable::new(&[3], vec![0., 2., 2.]).into(),
                5 => FunctionTable::new(&[3], vec![2., 2., 0.]).into(),
                _ => FunctionTable::new(&[3], vec![0.5, 0.25, 0.5]).into(),
            })
            .collect();
        let potts: FactorType = Potts::new((3, 3), 0.75).into();
        let mut model = SubModel::new(&[3; 6]);
        for (variable, unary) in unaries.iter().enumerate() {
            model.add_factor(&[variable], SubFunction::View(ViewFunction::new(unary)));
        }
        for &(first, second) in &[(0, 1), (1, 2), (3, 4), (4, 5), (0, 3), (1, 4), (2, 5)] {
            model.add_factor(&[first, second], SubFunction::View(ViewFunction::new(&potts)));
        }

        let (expected_value, _) = brute_force(&model);
        let solver = AStar::new(&model).run(&SolverOptions::default());
        let mut arg = Vec::new();
        solver.arg(&mut arg);

        assert_eq!(solver.value(), expected_value);
        assert_eq!(model.energy(&arg), expected_value);
    }

    #[test]
    fn exhausted_budget_returns_complete_labelling() {
        let table = FunctionTable::from_fn(&[4, 4, 4], |l| (l[0] * l[1] + l[2]) as f64);
        let mut model = SubModel::new(&[4, 4, 4]);
        model.add_factor(&[0, 1, 2], SubFunction::View(ViewFunction::new(&table)));

        let mut options = SolverOptions::default();
        options.set_max_iterations(1);
        let solver = AStar::new(&model).run(&options);
        let mut arg = Vec::new();
        solver.arg(&mut arg);

        assert_eq!(arg.len(), 3);
        assert_eq!(solver.value(), model.energy(&arg));
    }

    #[test]
    fn node_limit_bounds_memory() {
        // no pruning at all: every labelling of the chain costs the same
        let flat = FunctionTable::new(&[3, 3], vec![1.; 9]);
        let mut model = SubModel::new(&[3; 8]);
        for variable in 0..7 {
            model.add_factor(&[variable, variable + 1], SubFunction::View(ViewFunction::new(&flat)));
        }

        let mut options = SolverOptions::default();
        options.set_max_nodes(10);
        let solver = AStar::new(&model).run(&options);
        let mut arg = Vec::new();
        solver.arg(&mut arg);

        assert_eq!(arg.len(), 8);
        assert_eq!(solver.value(), 7.);
        assert_eq!(solver.value(), model.energy(&arg));
    }
}
