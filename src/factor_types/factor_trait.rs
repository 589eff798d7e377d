#![allow(dead_code)]

use std::{
    fmt::Display,
    io::{self, Write},
};

// Storage-level interface of a factor's function: table size, value mapping, and UAI output.
// Evaluation by label tuple lives in `PotentialFunction`, which views implement as well.
pub trait Factor: Display {
    fn arity(&self) -> usize;
    fn function_table_len(&self) -> usize;

    fn clone_function_table(&self) -> Vec<f64>;

    fn map_inplace(&mut self, mapping: fn(&mut f64));

    fn write_uai<W: Write>(&self, writer: &mut W, mapping: fn(f64) -> f64) -> io::Result<()>;
}
