#![allow(dead_code)]

use std::{
    fmt::{Debug, Display},
    io::{self, Write},
};

use crate::cfn::graphical_model::PotentialFunction;

use super::{factor_trait::Factor, function_table::FunctionTable, potts::Potts};

pub enum FactorType {
    FunctionTable(FunctionTable),
    Potts(Potts),
}

macro_rules! match_factor_action {
    ($factor_type:ident, $factor_match:ident, $action:expr) => {
        match $factor_type {
            FactorType::FunctionTable($factor_match) => $action,
            FactorType::Potts($factor_match) => $action,
        }
    };
}

impl Factor for FactorType {
    fn arity(&self) -> usize {
        match_factor_action!(self, factor, Factor::arity(factor))
    }

    fn function_table_len(&self) -> usize {
        match_factor_action!(self, factor, factor.function_table_len())
    }

    fn clone_function_table(&self) -> Vec<f64> {
        match_factor_action!(self, factor, factor.clone_function_table())
    }

    fn map_inplace(&mut self, mapping: fn(&mut f64)) {
        if let FactorType::Potts(potts) = self {
            let mut zero = 0.;
            mapping(&mut zero);
            if zero != 0. {
                // the mapped diagonal no longer fits a Potts factor
                *self = FactorType::FunctionTable(potts.to_function_table());
            }
        }
        match_factor_action!(self, factor, factor.map_inplace(mapping))
    }

    fn write_uai<W: Write>(&self, writer: &mut W, mapping: fn(f64) -> f64) -> io::Result<()> {
        match_factor_action!(self, factor, factor.write_uai(writer, mapping))
    }
}

impl PotentialFunction for FactorType {
    fn arity(&self) -> usize {
        match_factor_action!(self, factor, PotentialFunction::arity(factor))
    }

    fn value(&self, labels: &[usize]) -> f64 {
        match_factor_action!(self, factor, factor.value(labels))
    }
}

impl From<FunctionTable> for FactorType {
    fn from(value: FunctionTable) -> Self {
        FactorType::FunctionTable(value)
    }
}

impl From<Potts> for FactorType {
    fn from(value: Potts) -> Self {
        FactorType::Potts(value)
    }
}

impl Display for FactorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match_factor_action!(self, factor, Display::fmt(factor, f))
    }
}

// Tables can be large, so debug output only names the kind and arity
impl Debug for FactorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            FactorType::FunctionTable(_) => "FunctionTable",
            FactorType::Potts(_) => "Potts",
        };
        write!(f, "{}(arity {})", kind, Factor::arity(self))
    }
}
