#![allow(dead_code)]

use std::{
    fmt::Display,
    io::{self, Write},
};

use crate::cfn::{
    graphical_model::PotentialFunction,
    uai::{vec_mapping_to_string, vec_to_string},
};

use super::{factor_trait::Factor, function_table::FunctionTable};

// Pairwise factor that costs `value` when the two labels differ and nothing otherwise
#[derive(Debug, Clone)]
pub struct Potts {
    domain_sizes: (usize, usize),
    value: f64,
}

impl Potts {
    pub fn new(domain_sizes: (usize, usize), value: f64) -> Self {
        Potts {
            domain_sizes,
            value,
        }
    }

    // Dense table with the same values
    pub fn to_function_table(&self) -> FunctionTable {
        FunctionTable::new(
            &[self.domain_sizes.0, self.domain_sizes.1],
            self.clone_function_table(),
        )
    }
}

impl Factor for Potts {
    fn arity(&self) -> usize {
        2
    }

    fn function_table_len(&self) -> usize {
        self.domain_sizes.0 * self.domain_sizes.1
    }

    fn clone_function_table(&self) -> Vec<f64> {
        (0..self.domain_sizes.0)
            .flat_map(|a| (0..self.domain_sizes.1).map(move |b| (a != b) as usize as f64))
            .map(|indicator| indicator * self.value)
            .collect()
    }

    // Only the off-diagonal value is stored, so `mapping` must send 0 to 0.
    // `FactorType::map_inplace` turns the factor into a table otherwise.
    fn map_inplace(&mut self, mapping: fn(&mut f64)) {
        let mut zero = 0.;
        mapping(&mut zero);
        assert_eq!(zero, 0., "Potts factors can only be mapped by functions fixing 0.");
        mapping(&mut self.value);
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

impl PotentialFunction for Potts {
    fn arity(&self) -> usize {
        2
    }

    fn value(&self, labels: &[usize]) -> f64 {
        (labels[0] != labels[1]) as usize as f64 * self.value
    }
}

impl Display for Potts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", vec_to_string(&self.clone_function_table()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_value() {
        let potts = Potts::new((2, 3), 1.5);
        let table = potts.clone_function_table();
        assert_eq!(table, vec![0., 1.5, 1.5, 1.5, 0., 1.5]);
        for a in 0..2 {
            for b in 0..3 {
                assert_eq!(potts.value(&[a, b]), table[a * 3 + b]);
            }
        }
        let dense = potts.to_function_table();
        assert_eq!(dense.domain_sizes(), &[2, 3]);
        assert_eq!(dense.clone_function_table(), table);
    }

    #[test]
    #[should_panic(expected = "fixing 0")]
    fn mapping_must_fix_zero() {
        let mut potts = Potts::new((2, 2), 1.);
        potts.map_inplace(|value| *value += 1.);
    }
}
