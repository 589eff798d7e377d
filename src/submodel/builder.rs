#![allow(dead_code)]

use log::debug;

use crate::cfn::graphical_model::GraphicalModel;

use super::{
    classifier::{ClassifiedFactor, FactorClass, FactorClassifier},
    selection::Selection,
    sub_model::{FactorSink, SubModel},
    view_functions::{FixedViewFunction, PositionAndLabel, SubFunction, ViewFunction},
};

// Storage needed by the reduced model of a selection
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReservationCounts {
    pub factors: usize,
    pub variable_indices: usize, // summed reduced order of all factors
    pub full_unary: usize,
    pub full_high_order: usize,
    pub fixed_to_unary: usize,
    pub fixed_high_order: usize,
}

impl ReservationCounts {
    fn record(&mut self, classified: &ClassifiedFactor) {
        self.factors += 1;
        self.variable_indices += classified.partial_order();
        match classified.class {
            FactorClass::FullUnary => self.full_unary += 1,
            FactorClass::FullHighOrder => self.full_high_order += 1,
            FactorClass::FixedToUnary => self.fixed_to_unary += 1,
            FactorClass::FixedHighOrder => self.fixed_high_order += 1,
        }
    }

    // Number of plain views (fully included factors)
    pub fn view_functions(&self) -> usize {
        self.full_unary + self.full_high_order
    }

    // Number of fixed views (partially included factors)
    pub fn fixed_functions(&self) -> usize {
        self.fixed_to_unary + self.fixed_high_order
    }
}

// Turns the active selection into reduced factors, either counted, streamed into a sink, or materialized
pub struct SubmodelBuilder {
    classifier: FactorClassifier,
}

impl SubmodelBuilder {
    pub fn new<GM: GraphicalModel>(gm: &GM) -> Self {
        SubmodelBuilder {
            classifier: FactorClassifier::new(gm),
        }
    }

    // Reservation pass: counts what the emission pass will produce
    pub fn reservation_counts<GM: GraphicalModel>(
        &mut self,
        gm: &GM,
        selection: &Selection,
    ) -> ReservationCounts {
        assert!(selection.is_active(), "internal error: no submodel is selected");
        let mut counts = ReservationCounts::default();
        self.classifier
            .for_each_factor(gm, selection, |classified| counts.record(&classified));
        assert_eq!(
            counts.factors,
            counts.view_functions() + counts.fixed_functions(),
            "internal error"
        );
        debug!("Reservation for submodel of size {}: {:?}", selection.len(), counts);
        counts
    }

    // Emission pass: adds every reduced factor to `sink` and returns what was emitted.
    // Fixed views copy the current labels of the fixed variables.
    pub fn build_inplace<'a, GM, S>(
        &mut self,
        gm: &'a GM,
        selection: &Selection,
        labels: &[usize],
        sink: &mut S,
    ) -> ReservationCounts
    where
        GM: GraphicalModel,
        S: FactorSink<'a, GM::Function>,
    {
        assert!(selection.is_active(), "internal error: no submodel is selected");
        let mut counts = ReservationCounts::default();
        self.classifier.for_each_factor(gm, selection, |classified| {
            let function = gm.factor_function(classified.factor);
            if classified.class.is_fixed() {
                let variables = gm.factor_variables(classified.factor);
                let fixed = classified
                    .fixed_positions
                    .iter()
                    .map(|&position| PositionAndLabel {
                        position,
                        label: labels[variables[position]],
                    })
                    .collect();
                sink.add_factor(
                    classified.local_variables,
                    SubFunction::Fixed(FixedViewFunction::new(function, fixed)),
                );
            } else {
                sink.add_factor(
                    classified.local_variables,
                    SubFunction::View(ViewFunction::new(function)),
                );
            }
            counts.record(&classified);
        });
        counts
    }

    // Reserves and then fills a standalone reduced model
    pub fn build_sub_model<'a, GM: GraphicalModel>(
        &mut self,
        gm: &'a GM,
        selection: &Selection,
        labels: &[usize],
    ) -> SubModel<'a, GM::Function> {
        let counts = self.reservation_counts(gm, selection);
        let mut sub_model = SubModel::new(selection.space());
        sub_model.reserve(&counts);
        let emitted = self.build_inplace(gm, selection, labels, &mut sub_model);
        assert_eq!(
            counts, emitted,
            "internal error: reservation and emission passes disagree"
        );
        sub_model
    }

    pub fn is_clean(&self) -> bool {
        self.classifier.is_clean()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        cfn::cost_function_network::{construct_chain_cfn, CostFunctionNetwork},
        factor_types::{function_table::FunctionTable, potts::Potts},
    };

    use super::*;

    // Five ternary-domain variables with factors of order 1 to 4
    fn construct_cfn_example_1() -> CostFunctionNetwork {
        let mut cfn = CostFunctionNetwork::from_domain_sizes(&[3; 5], 8);
        cfn.add_factor(vec![0], FunctionTable::new(&[3], vec![1., 2., 3.]).into());
        cfn.add_factor(vec![4], FunctionTable::new(&[3], vec![3., 2., 1.]).into());
        cfn.add_factor(vec![0, 1], Potts::new((3, 3), 1.).into());
        cfn.add_factor(vec![2, 3], Potts::new((3, 3), 2.).into());
        cfn.add_factor(vec![3, 4], Potts::new((3, 3), 3.).into());
        cfn.add_factor(
            vec![0, 2, 4],
            FunctionTable::from_fn(&[3; 3], |l| (l[0] * 9 + l[1] * 3 + l[2]) as f64).into(),
        );
        cfn.add_factor(
            vec![1, 2, 3, 4],
            FunctionTable::from_fn(&[3; 4], |l| l.iter().sum::<usize>() as f64).into(),
        );
        cfn
    }

    fn reserve_and_build(
        cfn: &CostFunctionNetwork,
        variables: &[usize],
        labels: &[usize],
    ) -> (ReservationCounts, ReservationCounts, usize, usize, usize, usize) {
        let mut selection = Selection::new(cfn);
        let mut builder = SubmodelBuilder::new(cfn);
        selection.select(cfn, variables);
        let counts = builder.reservation_counts(cfn, &selection);
        let mut sub_model = SubModel::new(selection.space());
        let emitted = builder.build_inplace(cfn, &selection, labels, &mut sub_model);
        assert!(builder.is_clean());
        (
            counts,
            emitted,
            sub_model.num_factors(),
            sub_model.num_variable_indices(),
            sub_model.num_view_functions(),
            sub_model.num_fixed_functions(),
        )
    }

    #[test]
    fn reservation_matches_emission() {
        let cfn = construct_cfn_example_1();
        let labels = vec![2, 1, 0, 1, 2];
        let selections: Vec<Vec<usize>> = vec![
            vec![0],
            vec![2],
            vec![4, 0],
            vec![1, 2, 3],
            vec![3, 1, 4, 0],
            vec![0, 1, 2, 3, 4],
        ];
        for variables in selections {
            let (counts, emitted, factors, indices, views, fixed) =
                reserve_and_build(&cfn, &variables, &labels);
            assert_eq!(counts, emitted, "selection {:?}", variables);
            assert_eq!(counts.factors, factors);
            assert_eq!(counts.variable_indices, indices);
            assert_eq!(counts.view_functions(), views);
            assert_eq!(counts.fixed_functions(), fixed);
        }
    }

    #[test]
    fn classes_of_mixed_orders() {
        let cfn = construct_cfn_example_1();
        let (counts, ..) = reserve_and_build(&cfn, &[2, 3], &[0; 5]);
        // (2,3) full, (0,2,4) fixed to unary, (1,2,3,4) fixed high order, (3,4) fixed to unary
        assert_eq!(
            counts,
            ReservationCounts {
                factors: 4,
                variable_indices: 2 + 1 + 2 + 1,
                full_unary: 0,
                full_high_order: 1,
                fixed_to_unary: 2,
                fixed_high_order: 1,
            }
        );
    }

    #[test]
    fn completeness_and_order_conservation() {
        let cfn = construct_cfn_example_1();
        let variables = [1, 4];
        let mut selection = Selection::new(&cfn);
        let mut builder = SubmodelBuilder::new(&cfn);
        selection.select(&cfn, &variables);
        let sub_model = builder.build_sub_model(&cfn, &selection, &[0; 5]);

        let incident: Vec<usize> = (0..cfn.num_factors())
            .filter(|&factor| {
                cfn.factor_variables(factor)
                    .iter()
                    .any(|variable| variables.contains(variable))
            })
            .collect();
        assert_eq!(sub_model.num_factors(), incident.len());

        // emitted in order of first appearance: factors of 1 (2, 6), then remaining factors of 4 (1, 4, 5)
        let emitted_order = [2, 6, 1, 4, 5];
        for (sub_factor, &factor) in emitted_order.iter().enumerate() {
            let order = cfn.factor_order(factor);
            let outside = cfn
                .factor_variables(factor)
                .iter()
                .filter(|variable| !variables.contains(variable))
                .count();
            assert_eq!(sub_model.factor_order(sub_factor), order - outside);
            assert!(sub_model.factor_order(sub_factor) >= 1);
        }
    }

    #[test]
    fn chain_scenario() {
        let cfn = construct_chain_cfn();
        let labels = vec![1, 0, 0, 1];
        let mut selection = Selection::new(&cfn);
        let mut builder = SubmodelBuilder::new(&cfn);
        selection.select(&cfn, &[1, 2]);
        let sub_model = builder.build_sub_model(&cfn, &selection, &labels);

        assert_eq!(sub_model.num_factors(), 5);
        assert_eq!(sub_model.num_view_functions(), 3);
        assert_eq!(sub_model.num_fixed_functions(), 2);

        // unary(1), pairwise(0,1), pairwise(1,2), unary(2), pairwise(2,3)
        assert_eq!(sub_model.factor_variables(0), &[0]);
        assert_eq!(sub_model.factor_variables(1), &[0]);
        assert_eq!(sub_model.factor_variables(2), &[0, 1]);
        assert_eq!(sub_model.factor_variables(3), &[1]);
        assert_eq!(sub_model.factor_variables(4), &[1]);

        assert_eq!(
            sub_model.factor_fixed_labels(1),
            Some(
                &[PositionAndLabel {
                    position: 0,
                    label: 1
                }][..]
            )
        );
        assert_eq!(
            sub_model.factor_fixed_labels(4),
            Some(
                &[PositionAndLabel {
                    position: 1,
                    label: 1
                }][..]
            )
        );
        assert!(sub_model.factor_fixed_labels(2).is_none());

        // pairwise(0,1) with x0 = 1: [12, 13]; pairwise(2,3) with x3 = 1: [31, 33]
        assert_eq!(sub_model.factor_value(1, &[0]), 12.);
        assert_eq!(sub_model.factor_value(1, &[1]), 13.);
        assert_eq!(sub_model.factor_value(4, &[0]), 31.);
        assert_eq!(sub_model.factor_value(4, &[1]), 33.);

        // the submodel energy equals the global energy with the outside variables fixed
        for x1 in 0..2 {
            for x2 in 0..2 {
                assert_eq!(
                    sub_model.energy(&[x1, x2]),
                    cfn.energy(&[1, x1, x2, 1]) - cfn.energy(&[1, 0, 0, 1])
                        + sub_model.energy(&[0, 0])
                );
            }
        }
    }
}
