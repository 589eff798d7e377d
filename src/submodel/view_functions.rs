#![allow(dead_code)]

use std::cell::RefCell;

use crate::cfn::graphical_model::PotentialFunction;

// A factor position pinned to a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionAndLabel {
    pub position: usize,
    pub label: usize,
}

/// Evaluates the original function unchanged; only the factor's variable indices are remapped.
pub struct ViewFunction<'a, F> {
    function: &'a F,
}

impl<'a, F: PotentialFunction> ViewFunction<'a, F> {
    pub fn new(function: &'a F) -> Self {
        ViewFunction { function }
    }
}

impl<'a, F: PotentialFunction> PotentialFunction for ViewFunction<'a, F> {
    fn arity(&self) -> usize {
        self.function.arity()
    }

    fn value(&self, labels: &[usize]) -> f64 {
        self.function.value(labels)
    }
}

/// Evaluates the original function with some positions pinned to fixed labels.
/// The remaining positions keep their relative order and form the arguments of `value`.
///
/// Labels are copied at construction, so later changes to the assignment they came from
/// do not affect the view.
pub struct FixedViewFunction<'a, F> {
    function: &'a F,
    fixed: Vec<PositionAndLabel>,
    labels: RefCell<Vec<usize>>, // full label tuple of the original function, rebuilt on every evaluation
}

impl<'a, F: PotentialFunction> FixedViewFunction<'a, F> {
    pub fn new(function: &'a F, fixed: Vec<PositionAndLabel>) -> Self {
        let order = function.arity();
        assert!(
            fixed.len() < order,
            "A fixed view needs at least one free position."
        );
        assert!(
            fixed.windows(2).all(|w| w[0].position < w[1].position)
                && fixed.iter().all(|pair| pair.position < order),
            "Fixed positions must be distinct, increasing, and inside the factor."
        );
        FixedViewFunction {
            function,
            fixed,
            labels: RefCell::new(vec![0; order]),
        }
    }

    pub fn fixed(&self) -> &[PositionAndLabel] {
        &self.fixed
    }
}

impl<'a, F: PotentialFunction> PotentialFunction for FixedViewFunction<'a, F> {
    fn arity(&self) -> usize {
        self.function.arity() - self.fixed.len()
    }

    fn value(&self, labels: &[usize]) -> f64 {
        debug_assert_eq!(labels.len(), self.arity());
        let mut full_labels = self.labels.borrow_mut();
        let mut fixed = self.fixed.iter().peekable();
        let mut free = labels.iter();
        for (position, label) in full_labels.iter_mut().enumerate() {
            *label = match fixed.next_if(|pair| pair.position == position) {
                Some(pair) => pair.label,
                None => *free.next().expect("too few labels for a fixed view"),
            };
        }
        self.function.value(&full_labels)
    }
}

// Function of a reduced factor
pub enum SubFunction<'a, F> {
    View(ViewFunction<'a, F>),
    Fixed(FixedViewFunction<'a, F>),
}

impl<'a, F: PotentialFunction> PotentialFunction for SubFunction<'a, F> {
    fn arity(&self) -> usize {
        match self {
            SubFunction::View(function) => function.arity(),
            SubFunction::Fixed(function) => function.arity(),
        }
    }

    fn value(&self, labels: &[usize]) -> f64 {
        match self {
            SubFunction::View(function) => function.value(labels),
            SubFunction::Fixed(function) => function.value(labels),
        }
    }
}
