#![allow(dead_code)]

use bitvec::{order::LocalBits, vec::BitVec};

use crate::cfn::graphical_model::GraphicalModel;

// The set of global variables forming the active submodel and their local numbering.
// All storage is sized to the number of global variables once and reused by every selection.
pub struct Selection {
    local_variables: Vec<usize>, // local index -> global index, valid for the first `len` entries
    global_to_local: Vec<usize>, // global index -> local index, valid for members only
    space: Vec<usize>,           // domain size of each local variable, valid for the first `len` entries
    in_submodel: BitVec<usize, LocalBits>,
    len: usize,
}

impl Selection {
    pub fn new<GM: GraphicalModel>(gm: &GM) -> Self {
        let num_variables = gm.num_variables();
        Selection {
            local_variables: vec![0; num_variables],
            global_to_local: vec![0; num_variables],
            space: vec![0; num_variables],
            in_submodel: BitVec::repeat(false, num_variables),
            len: 0,
        }
    }

    // Makes `variables` the active submodel, numbering them locally in the given order. O(|variables|)
    // An empty list leaves no submodel active.
    pub fn select<GM: GraphicalModel>(&mut self, gm: &GM, variables: &[usize]) {
        assert_eq!(
            self.len, 0,
            "internal error: a submodel is already selected, unset it first"
        );

        for (local, &global) in variables.iter().enumerate() {
            assert!(
                global < gm.num_variables(),
                "internal error: variable {} is out of range",
                global
            );
            assert!(
                !self.in_submodel[global],
                "internal error: variable {} is selected twice",
                global
            );
            self.local_variables[local] = global;
            self.space[local] = gm.num_labels(global);
            self.global_to_local[global] = local;
            self.in_submodel.set(global, true);
        }
        self.len = variables.len();
    }

    // Releases the active submodel. O(|selection|)
    pub fn clear(&mut self) {
        assert!(self.len > 0, "internal error: no submodel is selected");
        for &global in &self.local_variables[..self.len] {
            assert!(
                self.in_submodel[global],
                "internal error: selected variable {} lost its membership flag",
                global
            );
            self.in_submodel.set(global, false);
        }
        self.len = 0;
    }

    pub fn is_active(&self) -> bool {
        self.len > 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn contains(&self, global: usize) -> bool {
        self.in_submodel[global]
    }

    pub fn local_variables(&self) -> &[usize] {
        &self.local_variables[..self.len]
    }

    pub fn global_to_local(&self, global: usize) -> usize {
        debug_assert!(self.in_submodel[global]);
        self.global_to_local[global]
    }

    pub fn space(&self) -> &[usize] {
        &self.space[..self.len]
    }

    // True if no membership flag is set
    pub fn is_clean(&self) -> bool {
        self.in_submodel.not_any()
    }
}

#[cfg(test)]
mod tests {
    use crate::cfn::cost_function_network::CostFunctionNetwork;

    use super::*;

    fn construct_cfn_example_1() -> CostFunctionNetwork {
        CostFunctionNetwork::from_domain_sizes(&[2, 3, 4, 5, 6], 0)
    }

    #[test]
    fn local_numbering_follows_given_order() {
        let cfn = construct_cfn_example_1();
        let mut selection = Selection::new(&cfn);
        selection.select(&cfn, &[3, 0, 4]);

        assert_eq!(selection.len(), 3);
        assert_eq!(selection.local_variables(), &[3, 0, 4]);
        assert_eq!(selection.space(), &[5, 2, 6]);
        assert!(selection.contains(0) && selection.contains(3) && selection.contains(4));
        assert!(!selection.contains(1) && !selection.contains(2));
        for local in 0..selection.len() {
            assert_eq!(
                selection.global_to_local(selection.local_variables()[local]),
                local
            );
        }
    }

    #[test]
    fn clear_resets_all_flags() {
        let cfn = construct_cfn_example_1();
        let mut selection = Selection::new(&cfn);
        selection.select(&cfn, &[1, 2]);
        selection.clear();
        assert!(!selection.is_active());
        assert!(selection.is_clean());

        selection.select(&cfn, &[2, 4]);
        assert_eq!(selection.local_variables(), &[2, 4]);
        assert_eq!(
            (0..cfn.num_variables())
                .filter(|&variable| selection.contains(variable))
                .count(),
            2
        );
    }

    #[test]
    fn empty_selection_stays_inactive() {
        let cfn = construct_cfn_example_1();
        let mut selection = Selection::new(&cfn);
        selection.select(&cfn, &[]);
        assert!(!selection.is_active());
        assert!(selection.is_clean());

        selection.select(&cfn, &[1]);
        assert_eq!(selection.local_variables(), &[1]);
        assert_eq!(selection.space(), &[3]);
    }

    #[test]
    #[should_panic(expected = "already selected")]
    fn select_twice() {
        let cfn = construct_cfn_example_1();
        let mut selection = Selection::new(&cfn);
        selection.select(&cfn, &[1]);
        selection.select(&cfn, &[2]);
    }

    #[test]
    #[should_panic(expected = "no submodel is selected")]
    fn clear_without_selection() {
        let cfn = construct_cfn_example_1();
        let mut selection = Selection::new(&cfn);
        selection.clear();
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn select_out_of_range() {
        let cfn = construct_cfn_example_1();
        let mut selection = Selection::new(&cfn);
        selection.select(&cfn, &[5]);
    }

    #[test]
    #[should_panic(expected = "selected twice")]
    fn select_duplicate() {
        let cfn = construct_cfn_example_1();
        let mut selection = Selection::new(&cfn);
        selection.select(&cfn, &[1, 3, 1]);
    }
}
