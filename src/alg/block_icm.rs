#![allow(dead_code)]

use std::time::Instant;

use log::{debug, info};

use crate::{
    cfn::graphical_model::GraphicalModel,
    submodel::optimizer::SubmodelOptimizer,
};

use super::solver::{SolverKind, SolverOptions};

pub struct BlockIcmOptions {
    block_size: usize, // number of consecutive variables optimized together
    max_sweeps: usize,
    solver: SolverKind,
    solver_options: SolverOptions,
}

impl BlockIcmOptions {
    pub fn default() -> Self {
        BlockIcmOptions {
            block_size: 4,
            max_sweeps: 100,
            solver: SolverKind::AStar,
            solver_options: SolverOptions::default(),
        }
    }

    pub fn set_block_size(&mut self, value: usize) -> &mut Self {
        assert!(value > 0, "Block size must be positive.");
        self.block_size = value;
        self
    }

    pub fn set_max_sweeps(&mut self, value: usize) -> &mut Self {
        self.max_sweeps = value;
        self
    }

    pub fn set_solver(&mut self, value: SolverKind) -> &mut Self {
        self.solver = value;
        self
    }

    pub fn set_solver_options(&mut self, value: SolverOptions) -> &mut Self {
        self.solver_options = value;
        self
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn max_sweeps(&self) -> usize {
        self.max_sweeps
    }

    pub fn solver(&self) -> SolverKind {
        self.solver
    }

    pub fn solver_options(&self) -> &SolverOptions {
        &self.solver_options
    }
}

/// Iterated conditional modes over blocks of consecutive variables.
///
/// Each sweep visits the blocks in order, solves every block exactly given the labels of all other
/// variables, and keeps the new labels when they differ. Stops after a sweep without changes.
pub struct BlockIcm<'a, GM: GraphicalModel> {
    optimizer: SubmodelOptimizer<'a, GM>,
    energies: Vec<f64>, // energy after each sweep
}

impl<'a, GM: GraphicalModel> BlockIcm<'a, GM> {
    pub fn new(gm: &'a GM) -> Self {
        BlockIcm {
            optimizer: SubmodelOptimizer::new(gm),
            energies: Vec::new(),
        }
    }

    pub fn labels(&self) -> &[usize] {
        self.optimizer.labels()
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    // Optimizes the block `variables` and writes back its labels unless that would increase the energy.
    // Returns true if the labels changed.
    fn optimize_block(
        &mut self,
        variables: &[usize],
        arg: &mut Vec<usize>,
        options: &BlockIcmOptions,
        energy: &mut f64,
    ) -> bool {
        self.optimizer.set_variable_indices(variables);
        // dynamic programming only handles acyclic blocks, other blocks fall back to A*
        let changed = match options.solver() {
            SolverKind::DynamicProgramming => {
                self.optimizer
                    .infer_submodel_with_fallback(arg, options.solver_options())
                    .1
            }
            solver => self
                .optimizer
                .infer_submodel_optimal(arg, solver, options.solver_options()),
        };
        self.optimizer.unset_variable_indices();
        if !changed {
            return false;
        }

        let previous: Vec<usize> = variables
            .iter()
            .map(|&variable| self.optimizer.label(variable))
            .collect();
        for (&variable, &label) in variables.iter().zip(arg.iter()) {
            self.optimizer.set_label(variable, label);
        }
        let new_energy = self.optimizer.gm().energy(self.optimizer.labels());
        if new_energy > *energy {
            // only possible when a back end ran out of budget
            debug!(
                "Rejecting labels of block {:?} with energy {}",
                variables, new_energy
            );
            for (&variable, &label) in variables.iter().zip(&previous) {
                self.optimizer.set_label(variable, label);
            }
            return false;
        }
        *energy = new_energy;
        true
    }

    // Runs sweeps until no block changes or the sweep limit is hit; returns the final energy
    pub fn run(&mut self, options: &BlockIcmOptions) -> f64 {
        let time_start = Instant::now();
        let num_variables = self.optimizer.gm().num_variables();
        let mut energy = self.optimizer.gm().energy(self.optimizer.labels());
        info!("Initial energy {}.", energy);

        let mut block = Vec::with_capacity(options.block_size());
        let mut arg = Vec::with_capacity(options.block_size());
        for sweep in 0..options.max_sweeps() {
            let mut changed_blocks = 0;
            for start in (0..num_variables).step_by(options.block_size()) {
                block.clear();
                block.extend(start..num_variables.min(start + options.block_size()));
                if self.optimize_block(&block, &mut arg, options, &mut energy) {
                    changed_blocks += 1;
                }
            }

            self.energies.push(energy);
            info!(
                "Sweep {}. Elapsed time {:?}. Energy {}. Blocks changed {}.",
                sweep,
                time_start.elapsed(),
                energy,
                changed_blocks
            );

            if changed_blocks == 0 {
                info!("No block changed. Interrupting.");
                break;
            }
            if sweep + 1 == options.max_sweeps() {
                info!("Maximum number of sweeps reached. Interrupting.");
            }
        }

        info!(
            "Block ICM finished. Elapsed time {:?}. Energy {}.",
            time_start.elapsed(),
            energy
        );
        energy
    }
}
