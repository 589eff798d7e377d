#![allow(dead_code)]

use std::{
    fmt::Display,
    io::{self, Write},
};

use ndarray::{ArrayD, Dimension, IxDyn};

use crate::cfn::{
    graphical_model::PotentialFunction,
    uai::{vec_mapping_to_string, vec_to_string},
};

use super::factor_trait::Factor;

// Dense table over the domains of a factor's variables.
// The last variable varies fastest, matching the order of entries in UAI files.
#[derive(Debug, Clone)]
pub struct FunctionTable {
    table: ArrayD<f64>,
}

impl FunctionTable {
    // Creates a table with the given domain sizes from a flat vector of values
    pub fn new(domain_sizes: &[usize], values: Vec<f64>) -> Self {
        assert_eq!(
            domain_sizes.iter().product::<usize>(),
            values.len(),
            "Function table size doesn't match the product of domain sizes."
        );
        FunctionTable {
            table: ArrayD::from_shape_vec(IxDyn(domain_sizes), values)
                .expect("table length was checked against the shape"),
        }
    }

    // Creates a table by evaluating `function` on every label tuple
    pub fn from_fn(domain_sizes: &[usize], function: impl Fn(&[usize]) -> f64) -> Self {
        FunctionTable {
            table: ArrayD::from_shape_fn(IxDyn(domain_sizes), |labels| function(labels.slice())),
        }
    }

    pub fn domain_sizes(&self) -> &[usize] {
        self.table.shape()
    }
}

impl Factor for FunctionTable {
    fn arity(&self) -> usize {
        self.table.ndim()
    }

    fn function_table_len(&self) -> usize {
        self.table.len()
    }

    fn clone_function_table(&self) -> Vec<f64> {
        self.table.iter().copied().collect()
    }

    fn map_inplace(&mut self, mapping: fn(&mut f64)) {
        self.table.map_inplace(mapping);
    }

    fn write_uai<W: Write>(&self, writer: &mut W, mapping: fn(f64) -> f64) -> io::Result<()> {
        write!(
            writer,
            "\n{}\n{}\n",
            self.function_table_len(),
            vec_mapping_to_string(&self.clone_function_table(), mapping)
        )
    }
}

impl PotentialFunction for FunctionTable {
    fn arity(&self) -> usize {
        self.table.ndim()
    }

    fn value(&self, labels: &[usize]) -> f64 {
        self.table[IxDyn(labels)]
    }
}

impl Display for FunctionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", vec_to_string(&self.clone_function_table()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_variable_varies_fastest() {
        let table = FunctionTable::new(&[2, 3], vec![0., 1., 2., 3., 4., 5.]);
        assert_eq!(table.value(&[0, 2]), 2.);
        assert_eq!(table.value(&[1, 0]), 3.);
        assert_eq!(table.value(&[1, 2]), 5.);
    }

    #[test]
    fn from_fn_matches_flat_layout() {
        let table = FunctionTable::from_fn(&[2, 2, 2], |labels| {
            (labels[0] * 4 + labels[1] * 2 + labels[2]) as f64
        });
        assert_eq!(
            table.clone_function_table(),
            vec![0., 1., 2., 3., 4., 5., 6., 7.]
        );
    }

    #[test]
    #[should_panic(expected = "Function table size doesn't match")]
    fn rejects_wrong_length() {
        FunctionTable::new(&[2, 2], vec![0.; 3]);
    }
}
