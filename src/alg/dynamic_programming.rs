#![allow(dead_code)]

use std::time::Instant;

use log::debug;
use petgraph::{
    graph::NodeIndex,
    visit::{depth_first_search, DfsEvent},
};

use crate::{
    cfn::graphical_model::PotentialFunction,
    submodel::sub_model::{IncidenceGraph, IncidenceNode, SubModel},
};

use super::solver::{for_each_labeling, Solver, SolverOptions};

/// Exact min-sum dynamic programming on a submodel whose factor/variable incidence graph is a forest.
///
/// Every connected component is rooted at its smallest variable. Factors send messages towards
/// the root in reverse depth-first order and remember the best labels of their other variables
/// for each label of their parent; labels are then read off from the roots outwards.
pub struct DynamicProgramming<'s, 'a, F> {
    model: &'s SubModel<'a, F>,
    arg: Vec<usize>,
    value: f64,
}

impl<'s, 'a, F: PotentialFunction> DynamicProgramming<'s, 'a, F> {
    pub fn new(model: &'s SubModel<'a, F>) -> Self {
        DynamicProgramming {
            model,
            arg: Vec::new(),
            value: f64::INFINITY,
        }
    }
}

fn parent_variable(graph: &IncidenceGraph, parent: Option<NodeIndex<usize>>) -> usize {
    match parent.map(|node| graph[node]) {
        Some(IncidenceNode::Variable(variable)) => variable,
        _ => panic!("internal error: factor without a parent variable"),
    }
}

impl<'s, 'a, F: PotentialFunction> Solver for DynamicProgramming<'s, 'a, F> {
    // Exact in time linear in the summed factor table sizes, so the search budget does not apply
    fn run(mut self, _options: &SolverOptions) -> Self {
        let time_start = Instant::now();
        let model = self.model;
        debug_assert!(model.is_acyclic(), "wrong model for dynamic programming");

        let graph = model.incidence_graph();
        let num_variables = model.num_variables();
        let mut preorder = Vec::with_capacity(graph.node_count());
        let mut parent = vec![None; graph.node_count()];
        depth_first_search(
            &graph,
            graph.node_indices().take(num_variables),
            |event| match event {
                DfsEvent::Discover(node, _) => preorder.push(node),
                DfsEvent::TreeEdge(from, to) => parent[to.index()] = Some(from),
                _ => {}
            },
        );

        // Min-marginals of each variable's subtree
        let mut beliefs: Vec<Vec<f64>> = model
            .space()
            .iter()
            .map(|&num_labels| vec![0.; num_labels])
            .collect();
        // Best label tuple of each factor for every label of its parent, flattened
        let mut choices: Vec<Vec<usize>> = vec![Vec::new(); model.num_factors()];
        let mut shape = Vec::new();

        for &node in preorder.iter().rev() {
            let factor = match graph[node] {
                IncidenceNode::Factor(factor) => factor,
                IncidenceNode::Variable(_) => continue,
            };
            let root = parent_variable(&graph, parent[node.index()]);
            let variables = model.factor_variables(factor);
            let order = variables.len();
            let root_position = variables
                .iter()
                .position(|&variable| variable == root)
                .unwrap_or_else(|| panic!("internal error: factor {} is not adjacent to its parent", factor));

            shape.clear();
            shape.extend(variables.iter().map(|&variable| model.num_labels(variable)));
            let mut message = vec![f64::INFINITY; model.num_labels(root)];
            let choice = &mut choices[factor];
            choice.resize(message.len() * order, 0);

            for_each_labeling(&shape, |labels| {
                let value = model.factor_value(factor, labels)
                    + variables
                        .iter()
                        .zip(labels)
                        .enumerate()
                        .filter(|&(position, _)| position != root_position)
                        .map(|(_, (&variable, &label))| beliefs[variable][label])
                        .sum::<f64>();
                let root_label = labels[root_position];
                if value < message[root_label] {
                    message[root_label] = value;
                    choice[root_label * order..(root_label + 1) * order].copy_from_slice(labels);
                }
            });

            for (belief, value) in beliefs[root].iter_mut().zip(message) {
                *belief += value;
            }
        }

        let mut labelling = vec![0; num_variables];
        let mut value = 0.;
        for &node in &preorder {
            match graph[node] {
                IncidenceNode::Variable(variable) if parent[node.index()].is_none() => {
                    let (label, minimum) = beliefs[variable]
                        .iter()
                        .copied()
                        .enumerate()
                        .min_by(|a, b| a.1.total_cmp(&b.1))
                        .unwrap_or((0, f64::INFINITY));
                    labelling[variable] = label;
                    value += minimum;
                }
                IncidenceNode::Factor(factor) => {
                    let root = parent_variable(&graph, parent[node.index()]);
                    let order = model.factor_order(factor);
                    let root_label = labelling[root];
                    let tuple = &choices[factor][root_label * order..(root_label + 1) * order];
                    for (&variable, &label) in model.factor_variables(factor).iter().zip(tuple) {
                        labelling[variable] = label;
                    }
                }
                IncidenceNode::Variable(_) => {}
            }
        }

        debug!(
            "Dynamic programming over {} variables and {} factors finished with value {} in {:?}",
            num_variables,
            model.num_factors(),
            value,
            time_start.elapsed()
        );
        self.arg = labelling;
        self.value = value;
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
            view_functions::{FixedViewFunction, PositionAndLabel, SubFunction, ViewFunction},
        },
    };

    use super::*;

    fn solve<F: PotentialFunction>(model: &SubModel<F>) -> (f64, Vec<usize>) {
        let solver = DynamicProgramming::new(model).run(&SolverOptions::default());
        let mut arg = Vec::new();
        solver.arg(&mut arg);
        (solver.value(), arg)
    }

    #[test]
    fn chain_matches_brute_force() {
        let unary = FunctionTable::new(&[3], vec![1., 0., 2.]);
        let pairwise = FunctionTable::from_fn(&[3, 3], |l| (l[0] as f64 - l[1] as f64).abs() * 0.5);
        let neighbour = FunctionTable::from_fn(&[3, 3], |l| {
            let penalty = if l[0] == 2 { 0. } else { 3. };
            penalty + l[1] as f64
        });

        let mut model = SubModel::new(&[3; 4]);
        model.add_factor(&[0], SubFunction::View(ViewFunction::new(&unary)));
        for variable in 0..3 {
            model.add_factor(
                &[variable, variable + 1],
                SubFunction::View(ViewFunction::new(&pairwise)),
            );
        }
        // a neighbour outside the chain pinned to label 2
        model.add_factor(
            &[3],
            SubFunction::Fixed(FixedViewFunction::new(
                &neighbour,
                vec![PositionAndLabel {
                    position: 0,
                    label: 2,
                }],
            )),
        );

        let (value, arg) = solve(&model);
        assert_eq!(value, brute_force(&model).0);
        assert_eq!(model.energy(&arg), value);
    }

    #[test]
    fn tree_with_high_order_factor() {
        // variable 1 is the hub of a star; a ternary factor joins the leaves 2, 3 and 4
        // which are not otherwise connected, and variable 5 is isolated
        let star: FactorType = Potts::new((2, 2), 2.).into();
        let ternary: FactorType = FunctionTable::from_fn(&[2, 2, 2], |l| match l[0] + l[1] + l[2] {
            0 => 3.,
            1 => 0.,
            _ => 1.,
        })
        .into();
        let unary: FactorType = FunctionTable::new(&[2], vec![0., 1.5]).into();

        let mut model = SubModel::new(&[2; 6]);
        model.add_factor(&[1, 0], SubFunction::View(ViewFunction::new(&star)));
        model.add_factor(&[2, 3, 4], SubFunction::View(ViewFunction::new(&ternary)));
        model.add_factor(&[1, 2], SubFunction::View(ViewFunction::new(&star)));
        model.add_factor(&[0], SubFunction::View(ViewFunction::new(&unary)));
        assert!(model.is_acyclic());

        let (value, arg) = solve(&model);
        assert_eq!(value, brute_force(&model).0);
        assert_eq!(model.energy(&arg), value);
        assert_eq!(arg.len(), 6);
    }
}
