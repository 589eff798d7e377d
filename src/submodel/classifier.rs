#![allow(dead_code)]

use bitvec::{order::LocalBits, vec::BitVec};

use crate::cfn::graphical_model::GraphicalModel;

use super::selection::Selection;

// How a factor touching the submodel enters the reduced model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorClass {
    FullUnary,      // unary factor of a selected variable
    FullHighOrder,  // non-unary factor with all variables selected
    FixedToUnary,   // non-unary factor with exactly one selected variable
    FixedHighOrder, // non-unary factor with at least two but not all variables selected
}

impl FactorClass {
    pub fn is_fixed(self) -> bool {
        matches!(self, FactorClass::FixedToUnary | FactorClass::FixedHighOrder)
    }
}

// One factor as seen from the active submodel. Slices borrow the classifier's scratch buffers.
pub struct ClassifiedFactor<'b> {
    pub factor: usize,
    pub class: FactorClass,
    pub order: usize,
    pub free_positions: &'b [usize],  // factor positions of selected variables, increasing
    pub fixed_positions: &'b [usize], // factor positions of the other variables, increasing
    pub local_variables: &'b [usize], // local index of the variable at each free position
}

impl<'b> ClassifiedFactor<'b> {
    pub fn partial_order(&self) -> usize {
        self.free_positions.len()
    }
}

// Visits every factor incident to the selected variables exactly once.
// Scratch is sized once (factor flags to the number of factors, position buffers to the maximal order)
// and reused by every pass.
pub struct FactorClassifier {
    handled_factor: BitVec<usize, LocalBits>,
    fixed_positions: Vec<usize>,
    free_positions: Vec<usize>,
    local_variables: Vec<usize>,
}

impl FactorClassifier {
    pub fn new<GM: GraphicalModel>(gm: &GM) -> Self {
        let max_order = gm.max_factor_order();
        FactorClassifier {
            handled_factor: BitVec::repeat(false, gm.num_factors()),
            fixed_positions: vec![0; max_order],
            free_positions: vec![0; max_order],
            local_variables: vec![0; max_order],
        }
    }

    // Calls `visit` once for every factor containing at least one selected variable,
    // in order of first appearance in the selected variables' factor lists
    pub fn for_each_factor<GM, V>(&mut self, gm: &GM, selection: &Selection, mut visit: V)
    where
        GM: GraphicalModel,
        V: FnMut(ClassifiedFactor<'_>),
    {
        let FactorClassifier {
            handled_factor,
            fixed_positions,
            free_positions,
            local_variables,
        } = self;

        for &global in selection.local_variables() {
            for &factor in gm.factors_of_variable(global) {
                if handled_factor[factor] {
                    continue;
                }
                handled_factor.set(factor, true);

                let variables = gm.factor_variables(factor);
                let order = variables.len();

                if order == 1 {
                    free_positions[0] = 0;
                    local_variables[0] = selection.global_to_local(variables[0]);
                    visit(ClassifiedFactor {
                        factor,
                        class: FactorClass::FullUnary,
                        order,
                        free_positions: &free_positions[..1],
                        fixed_positions: &fixed_positions[..0],
                        local_variables: &local_variables[..1],
                    });
                    continue;
                }

                let mut num_fixed = 0;
                let mut num_free = 0;
                for (position, &variable) in variables.iter().enumerate() {
                    if selection.contains(variable) {
                        free_positions[num_free] = position;
                        local_variables[num_free] = selection.global_to_local(variable);
                        num_free += 1;
                    } else {
                        fixed_positions[num_fixed] = position;
                        num_fixed += 1;
                    }
                }
                let partial_order = order - num_fixed;
                assert_eq!(num_fixed + num_free, order, "internal error");
                assert!(
                    partial_order >= 1 && partial_order <= order,
                    "internal error: factor {} has partial order {}",
                    factor,
                    partial_order
                );

                let class = if num_fixed == 0 {
                    FactorClass::FullHighOrder
                } else if partial_order == 1 {
                    FactorClass::FixedToUnary
                } else {
                    FactorClass::FixedHighOrder
                };
                visit(ClassifiedFactor {
                    factor,
                    class,
                    order,
                    free_positions: &free_positions[..num_free],
                    fixed_positions: &fixed_positions[..num_fixed],
                    local_variables: &local_variables[..num_free],
                });
            }
        }

        // Cleanup touches only the selected variables' factors, not all factors
        for &global in selection.local_variables() {
            for &factor in gm.factors_of_variable(global) {
                handled_factor.set(factor, false);
            }
        }
    }

    // True if no factor is marked as handled
    pub fn is_clean(&self) -> bool {
        self.handled_factor.not_any()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        cfn::cost_function_network::{construct_chain_cfn, CostFunctionNetwork},
        factor_types::function_table::FunctionTable,
    };

    use super::*;

    struct Record {
        factor: usize,
        class: FactorClass,
        free_positions: Vec<usize>,
        fixed_positions: Vec<usize>,
        local_variables: Vec<usize>,
    }

    fn classify(gm: &CostFunctionNetwork, variables: &[usize]) -> Vec<Record> {
        let mut selection = Selection::new(gm);
        let mut classifier = FactorClassifier::new(gm);
        selection.select(gm, variables);
        let mut records = Vec::new();
        classifier.for_each_factor(gm, &selection, |classified| {
            records.push(Record {
                factor: classified.factor,
                class: classified.class,
                free_positions: classified.free_positions.to_vec(),
                fixed_positions: classified.fixed_positions.to_vec(),
                local_variables: classified.local_variables.to_vec(),
            })
        });
        assert!(classifier.is_clean());
        records
    }

    #[test]
    fn chain_middle() {
        let cfn = construct_chain_cfn();
        let records = classify(&cfn, &[1, 2]);

        // variable 1: factors 1, 4, 5; variable 2: factors 2, (5), 6
        let factors: Vec<usize> = records.iter().map(|record| record.factor).collect();
        assert_eq!(factors, vec![1, 4, 5, 2, 6]);

        let classes: Vec<FactorClass> = records.iter().map(|record| record.class).collect();
        assert_eq!(
            classes,
            vec![
                FactorClass::FullUnary,
                FactorClass::FixedToUnary,
                FactorClass::FullHighOrder,
                FactorClass::FullUnary,
                FactorClass::FixedToUnary,
            ]
        );

        // pairwise (0,1): position 0 fixed, position 1 free -> local 0
        assert_eq!(records[1].fixed_positions, vec![0]);
        assert_eq!(records[1].free_positions, vec![1]);
        assert_eq!(records[1].local_variables, vec![0]);
        // pairwise (2,3): position 1 fixed, position 0 free -> local 1
        assert_eq!(records[4].fixed_positions, vec![1]);
        assert_eq!(records[4].free_positions, vec![0]);
        assert_eq!(records[4].local_variables, vec![1]);
        // pairwise (1,2) fully inside
        assert_eq!(records[2].local_variables, vec![0, 1]);
    }

    #[test]
    fn free_positions_keep_factor_order() {
        let mut cfn = CostFunctionNetwork::from_domain_sizes(&[2; 5], 1);
        cfn.add_factor(
            vec![0, 1, 2, 3, 4],
            FunctionTable::new(&[2; 5], vec![0.; 32]).into(),
        );
        // local numbering is the reverse of the factor order
        let records = classify(&cfn, &[4, 2, 0]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].class, FactorClass::FixedHighOrder);
        assert_eq!(records[0].free_positions, vec![0, 2, 4]);
        assert_eq!(records[0].fixed_positions, vec![1, 3]);
        assert_eq!(records[0].local_variables, vec![2, 1, 0]);
    }

    #[test]
    fn each_factor_once_and_only_incident_ones() {
        let cfn = construct_chain_cfn();
        let records = classify(&cfn, &[0, 1, 2, 3]);
        let mut factors: Vec<usize> = records.iter().map(|record| record.factor).collect();
        factors.sort();
        assert_eq!(factors, (0..7).collect::<Vec<_>>());
        assert!(records.iter().all(|record| !record.class.is_fixed()));

        let records = classify(&cfn, &[3]);
        let factors: Vec<usize> = records.iter().map(|record| record.factor).collect();
        assert_eq!(factors, vec![3, 6]);
    }
}
