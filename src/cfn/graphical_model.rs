#![allow(dead_code)]

/// A potential function evaluated on a tuple of labels, one per factor position.
/// Position 0 is the factor's first variable.
pub trait PotentialFunction {
    fn arity(&self) -> usize;
    fn value(&self, labels: &[usize]) -> f64;
}

impl<F: PotentialFunction + ?Sized> PotentialFunction for &F {
    fn arity(&self) -> usize {
        (**self).arity()
    }

    fn value(&self, labels: &[usize]) -> f64 {
        (**self).value(labels)
    }
}

/// Read-only view of a discrete graphical model whose energy is the sum of its factor values.
///
/// The submodel machinery only ever talks to a model through this trait, so any
/// representation that can list a variable's factors and evaluate a factor by
/// label tuple can be optimized block by block.
pub trait GraphicalModel {
    type Function: PotentialFunction;

    fn num_variables(&self) -> usize;
    fn num_labels(&self, variable: usize) -> usize;

    fn num_factors(&self) -> usize;
    // Largest number of variables in any factor
    fn max_factor_order(&self) -> usize;

    // Indices of factors containing the variable
    fn factors_of_variable(&self, variable: usize) -> &[usize];
    // Variables of a factor, in position order
    fn factor_variables(&self, factor: usize) -> &[usize];
    fn factor_function(&self, factor: usize) -> &Self::Function;

    fn factor_order(&self, factor: usize) -> usize {
        self.factor_variables(factor).len()
    }

    // Total cost of a full labelling, indexed by variable
    fn energy(&self, labels: &[usize]) -> f64 {
        assert_eq!(
            labels.len(),
            self.num_variables(),
            "Labelling must assign every variable."
        );
        let mut buffer = Vec::with_capacity(self.max_factor_order());
        (0..self.num_factors())
            .map(|factor| {
                buffer.clear();
                buffer.extend(
                    self.factor_variables(factor)
                        .iter()
                        .map(|&variable| labels[variable]),
                );
                self.factor_function(factor).value(&buffer)
            })
            .sum()
    }
}
