#![allow(dead_code)]

use log::debug;

use crate::{
    alg::{
        astar::AStar,
        branch_and_bound::BranchAndBound,
        dynamic_programming::DynamicProgramming,
        solver::{Solver, SolverKind, SolverOptions},
    },
    cfn::graphical_model::GraphicalModel,
};

use super::{
    builder::{ReservationCounts, SubmodelBuilder},
    selection::Selection,
    sub_model::{FactorSink, SubModel},
};

/// Repeatedly extracts submodels of a fixed graphical model and solves them against the current labelling.
///
/// The optimizer owns the current global labelling and every scratch buffer needed to select a
/// submodel and build its reduced model, all sized once at construction. A driver selects a set of
/// variables, asks for the optimal labels of the selection given the labels of everything else,
/// writes them back if they changed, and releases the selection.
///
/// One optimizer is not meant to be shared; parallel drivers create one per worker over the same model.
pub struct SubmodelOptimizer<'a, GM: GraphicalModel> {
    gm: &'a GM,
    selection: Selection,
    builder: SubmodelBuilder,
    labels: Vec<usize>, // current label of every global variable
}

impl<'a, GM: GraphicalModel> SubmodelOptimizer<'a, GM> {
    // Every variable starts with label 0
    pub fn new(gm: &'a GM) -> Self {
        SubmodelOptimizer {
            gm,
            selection: Selection::new(gm),
            builder: SubmodelBuilder::new(gm),
            labels: vec![0; gm.num_variables()],
        }
    }

    pub fn gm(&self) -> &'a GM {
        self.gm
    }

    pub fn set_label(&mut self, variable: usize, label: usize) {
        self.labels[variable] = label;
    }

    pub fn label(&self, variable: usize) -> usize {
        self.labels[variable]
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn set_variable_indices(&mut self, variables: &[usize]) {
        self.selection.select(self.gm, variables);
        debug!("Selected submodel {:?}", variables);
    }

    pub fn unset_variable_indices(&mut self) {
        self.selection.clear();
        debug!("Released submodel");
    }

    pub fn in_submodel(&self, variable: usize) -> bool {
        self.selection.contains(variable)
    }

    pub fn submodel_size(&self) -> usize {
        self.selection.len()
    }

    // Global index of every local variable
    pub fn local_variables(&self) -> &[usize] {
        self.selection.local_variables()
    }

    pub fn global_to_local(&self, variable: usize) -> usize {
        self.selection.global_to_local(variable)
    }

    pub fn reservation_counts(&mut self) -> ReservationCounts {
        self.builder.reservation_counts(self.gm, &self.selection)
    }

    // Reduced model of the active selection with the current labels of the outside variables
    pub fn build_sub_model(&mut self) -> SubModel<'a, GM::Function> {
        self.builder
            .build_sub_model(self.gm, &self.selection, &self.labels)
    }

    // Streams the reduced model of the active selection into `sink`
    pub fn build_model_inplace<S: FactorSink<'a, GM::Function>>(
        &mut self,
        sink: &mut S,
    ) -> ReservationCounts {
        self.builder
            .build_inplace(self.gm, &self.selection, &self.labels, sink)
    }

    /// Solves the active submodel with the chosen back end, writing the optimal local labels into `arg`.
    ///
    /// Returns true if the optimal labels differ from the current labels of the selected variables.
    /// The current labels are left untouched.
    pub fn infer_submodel_optimal(
        &mut self,
        arg: &mut Vec<usize>,
        solver: SolverKind,
        options: &SolverOptions,
    ) -> bool {
        assert!(
            self.selection.is_active(),
            "internal error: no submodel is selected"
        );

        match solver {
            SolverKind::BranchAndBound => self.infer_with_branch_and_bound(arg, options),
            SolverKind::AStar => self.infer_with_astar(arg, options),
            SolverKind::DynamicProgramming => self.infer_with_dynamic_programming(arg, options),
        }

        assert_eq!(
            arg.len(),
            self.submodel_size(),
            "internal error: solver returned a labelling of the wrong size"
        );
        self.labels_changed(arg.iter().copied())
    }

    /// Solves the active submodel by dynamic programming if it is acyclic and by A* otherwise.
    ///
    /// The submodel is built once and the back end is chosen from its incidence graph.
    /// Returns the back end used and whether the labels changed, as [`Self::infer_submodel_optimal`].
    pub fn infer_submodel_with_fallback(
        &mut self,
        arg: &mut Vec<usize>,
        options: &SolverOptions,
    ) -> (SolverKind, bool) {
        assert!(
            self.selection.is_active(),
            "internal error: no submodel is selected"
        );

        let sub_model = self.build_sub_model();
        let solver = if sub_model.is_acyclic() {
            DynamicProgramming::new(&sub_model).run(options).arg(arg);
            SolverKind::DynamicProgramming
        } else {
            debug!(
                "Submodel {:?} is cyclic, using {}",
                self.selection.local_variables(),
                SolverKind::AStar
            );
            AStar::new(&sub_model).run(options).arg(arg);
            SolverKind::AStar
        };

        assert_eq!(
            arg.len(),
            self.submodel_size(),
            "internal error: solver returned a labelling of the wrong size"
        );
        (solver, self.labels_changed(arg.iter().copied()))
    }

    // True on the first selected variable whose current label differs from `arg`
    pub fn labels_changed<I: IntoIterator<Item = usize>>(&self, arg: I) -> bool {
        self.selection
            .local_variables()
            .iter()
            .zip(arg)
            .any(|(&variable, label)| self.labels[variable] != label)
    }

    fn infer_with_branch_and_bound(&mut self, arg: &mut Vec<usize>, options: &SolverOptions) {
        let mut solver = BranchAndBound::new(self.selection.space());
        self.build_model_inplace(&mut solver);
        solver.run(options).arg(arg);
    }

    fn infer_with_astar(&mut self, arg: &mut Vec<usize>, options: &SolverOptions) {
        let sub_model = self.build_sub_model();
        AStar::new(&sub_model).run(options).arg(arg);
    }

    fn infer_with_dynamic_programming(&mut self, arg: &mut Vec<usize>, options: &SolverOptions) {
        let sub_model = self.build_sub_model();
        assert!(sub_model.is_acyclic(), "wrong model for dynamic programming");
        DynamicProgramming::new(&sub_model).run(options).arg(arg);
    }
}
