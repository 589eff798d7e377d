#![allow(dead_code)]

use std::{
    fmt::Display,
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, BufWriter, Write},
    mem,
    path::Path,
    str::FromStr,
    time::Instant,
};

use log::{debug, warn};
use ndarray::{ArrayD, IxDyn};

use crate::{
    cfn::{cost_function_network::CostFunctionNetwork, graphical_model::GraphicalModel},
    factor_types::{factor_trait::Factor, function_table::FunctionTable},
};

/// Interface for reading from and writing to UAI model files.
/// The format specification can be found [here](https://uaicompetition.github.io/uci-2022/file-formats/model-format/).
/// Plain files store probabilities, which become costs `-ln(p)`.
/// If `lg` is set to true, the file stores log-probabilities, which become costs `-v`.
pub trait UAI: Sized {
    fn read_uai<R: BufRead>(reader: R, lg: bool) -> io::Result<Self>;
    fn write_uai<W: Write>(&self, writer: &mut W, lg: bool) -> io::Result<()>;

    fn read_uai_file<P: AsRef<Path>>(path: P, lg: bool) -> io::Result<Self> {
        debug!("Reading {:?} with lg option {}", path.as_ref(), lg);
        let file = OpenOptions::new().read(true).open(path)?;
        Self::read_uai(BufReader::new(file), lg)
    }

    fn write_uai_file<P: AsRef<Path>>(&self, path: P, lg: bool) -> io::Result<()> {
        debug!("Writing {:?} with lg option {}", path.as_ref(), lg);
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_uai(&mut writer, lg)?;
        writer.flush()
    }
}

// States for reading UAI files
pub enum UAIState {
    ModelType,
    NumberOfVariables,
    DomainSizes,
    NumberOfFunctions,
    FunctionScopes(usize),            // function index
    NumberOfTableValues(usize),       // function index
    TableValues(usize, usize, usize), // function index, how many entries were read, function table size
    EndOfFile,
}

pub fn invalid_data<E: Display>(error: E) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, error.to_string())
}

pub fn parse_value<T>(string: &str) -> io::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: Display,
{
    string
        .parse::<T>()
        .map_err(|error| invalid_data(format!("cannot parse {:?}: {}", string, error)))
}

pub fn string_to_vec<T>(string: &str) -> io::Result<Vec<T>>
where
    T: FromStr,
    <T as FromStr>::Err: Display,
{
    string.split_whitespace().map(parse_value).collect()
}

pub fn vec_to_string<T: ToString>(v: &[T]) -> String {
    v.iter()
        .map(|elem| elem.to_string())
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn vec_mapping_to_string(v: &[f64], mapping: fn(f64) -> f64) -> String {
    v.iter()
        .map(|elem| mapping(*elem).to_string())
        .collect::<Vec<String>>()
        .join(" ")
}

// Builds a table over the sorted scope from a table given in file scope order
fn sort_scope(
    cfn: &CostFunctionNetwork,
    scope: &[usize],
    values: Vec<f64>,
) -> io::Result<(Vec<usize>, FunctionTable)> {
    let domain_sizes: Vec<usize> = scope.iter().map(|&var| cfn.domain_size(var)).collect();
    if scope.windows(2).all(|w| w[0] < w[1]) {
        return Ok((scope.to_vec(), FunctionTable::new(&domain_sizes, values)));
    }

    let mut axes: Vec<usize> = (0..scope.len()).collect();
    axes.sort_by_key(|&axis| scope[axis]);
    let table = ArrayD::from_shape_vec(IxDyn(&domain_sizes), values).map_err(invalid_data)?;
    let permuted = table.permuted_axes(IxDyn(&axes));
    let sorted_scope = axes.iter().map(|&axis| scope[axis]).collect();
    let sorted_domain_sizes: Vec<usize> = axes.iter().map(|&axis| domain_sizes[axis]).collect();
    Ok((
        sorted_scope,
        FunctionTable::new(&sorted_domain_sizes, permuted.iter().copied().collect()),
    ))
}

impl UAI for CostFunctionNetwork {
    fn read_uai<R: BufRead>(reader: R, lg: bool) -> io::Result<Self> {
        let time_start = Instant::now();
        let mut state = UAIState::ModelType;

        let mapping = [|value: &mut f64| *value = -value.ln(), |value: &mut f64| *value = -*value]
            [lg as usize];

        let mut cfn = CostFunctionNetwork::new();

        let mut num_variables = 0;
        let mut num_functions = 0;
        let mut function_scopes: Vec<Vec<usize>> = Vec::new();
        let mut function_entries = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let trimmed_line = line.trim();

            if trimmed_line.is_empty() {
                continue;
            }

            match state {
                UAIState::ModelType => {
                    if trimmed_line != "MARKOV" {
                        return Err(invalid_data(format!(
                            "only MARKOV models are supported, found {}",
                            trimmed_line
                        )));
                    }
                    state = UAIState::NumberOfVariables;
                }
                UAIState::NumberOfVariables => {
                    num_variables = parse_value::<usize>(trimmed_line)?;
                    state = UAIState::DomainSizes;
                }
                UAIState::DomainSizes => {
                    let domain_sizes: Vec<usize> = string_to_vec(trimmed_line)?;
                    if domain_sizes.len() != num_variables {
                        return Err(invalid_data(format!(
                            "expected {} domain sizes, found {}",
                            num_variables,
                            domain_sizes.len()
                        )));
                    }
                    if let Some(var) = domain_sizes.iter().position(|&size| size == 0) {
                        return Err(invalid_data(format!(
                            "variable {} has an empty domain",
                            var
                        )));
                    }
                    cfn = CostFunctionNetwork::from_domain_sizes(&domain_sizes, 0);
                    state = UAIState::NumberOfFunctions;
                }
                UAIState::NumberOfFunctions => {
                    num_functions = parse_value::<usize>(trimmed_line)?;
                    function_scopes = Vec::with_capacity(num_functions);
                    state = if num_functions > 0 {
                        UAIState::FunctionScopes(0)
                    } else {
                        UAIState::EndOfFile
                    };
                }
                UAIState::FunctionScopes(function_idx) => {
                    let function_desc: Vec<usize> = string_to_vec(trimmed_line)?;
                    let (scope_len, function_scope) = function_desc.split_at(1);
                    if scope_len[0] != function_scope.len() {
                        return Err(invalid_data(format!(
                            "scope of function {} announces {} variables, lists {}",
                            function_idx,
                            scope_len[0],
                            function_scope.len()
                        )));
                    }
                    if function_scope.is_empty() {
                        return Err(invalid_data(format!(
                            "function {} has an empty scope",
                            function_idx
                        )));
                    }
                    if function_scope.iter().any(|&var| var >= num_variables) {
                        return Err(invalid_data(format!(
                            "scope of function {} refers to an unknown variable",
                            function_idx
                        )));
                    }
                    function_scopes.push(function_scope.to_vec());
                    state = if function_idx + 1 < num_functions {
                        UAIState::FunctionScopes(function_idx + 1)
                    } else {
                        UAIState::NumberOfTableValues(0)
                    };
                }
                UAIState::NumberOfTableValues(function_idx) => {
                    let num_entries = parse_value::<usize>(trimmed_line)?;
                    function_entries = Vec::with_capacity(num_entries);
                    state = UAIState::TableValues(function_idx, 0, num_entries);
                }
                UAIState::TableValues(function_idx, cur_entries, num_entries) => {
                    let mut new_entries = string_to_vec(trimmed_line)?;
                    let new_cur_entries = cur_entries + new_entries.len();
                    function_entries.append(&mut new_entries);

                    if new_cur_entries > num_entries {
                        return Err(invalid_data(format!(
                            "function {} has more than {} entries",
                            function_idx, num_entries
                        )));
                    }
                    if new_cur_entries < num_entries {
                        state = UAIState::TableValues(function_idx, new_cur_entries, num_entries);
                        continue;
                    }
                    debug!(
                        "Reading function {}. Collected all {} entries.",
                        function_idx, num_entries
                    );

                    let mut function_table = Vec::new();
                    mem::swap(&mut function_entries, &mut function_table);
                    function_table.iter_mut().for_each(mapping);

                    let scope = &function_scopes[function_idx];
                    let expected_len: usize = scope.iter().map(|&var| cfn.domain_size(var)).product();
                    if expected_len != function_table.len() {
                        return Err(invalid_data(format!(
                            "function {} has {} entries, its scope needs {}",
                            function_idx,
                            function_table.len(),
                            expected_len
                        )));
                    }
                    if scope.iter().enumerate().any(|(i, var)| scope[..i].contains(var)) {
                        return Err(invalid_data(format!(
                            "scope of function {} repeats a variable",
                            function_idx
                        )));
                    }
                    let (sorted_scope, table) = sort_scope(&cfn, scope, function_table)?;
                    cfn.add_factor(sorted_scope, table.into());

                    state = if function_idx + 1 < function_scopes.len() {
                        UAIState::NumberOfTableValues(function_idx + 1)
                    } else {
                        UAIState::EndOfFile
                    };
                }
                UAIState::EndOfFile => {
                    warn!("Ignored trailing line at the end of file: {}", line);
                }
            }
        }

        if !matches!(state, UAIState::EndOfFile) {
            return Err(invalid_data("unexpected end of file"));
        }

        debug!(
            "UAI import complete. Elapsed time {:?}.",
            time_start.elapsed()
        );
        Ok(cfn)
    }

    fn write_uai<W: Write>(&self, writer: &mut W, lg: bool) -> io::Result<()> {
        let time_start = Instant::now();
        let mapping = [|value: f64| (-value).exp(), |value: f64| -value][lg as usize];

        let domain_sizes: Vec<usize> = (0..self.num_variables())
            .map(|var| self.domain_size(var))
            .collect();
        write!(
            writer,
            "MARKOV\n{}\n{}\n",
            self.num_variables(),
            vec_to_string(&domain_sizes)
        )?;

        writeln!(writer, "{}", self.factors_len())?;
        for factor in 0..self.factors_len() {
            let variables = self.factor_variables(factor);
            writeln!(writer, "{} {}", variables.len(), vec_to_string(variables))?;
        }

        for factor in 0..self.factors_len() {
            self.factor(factor).write_uai(writer, mapping)?;
        }

        debug!(
            "UAI export complete. Elapsed time {:?}.",
            time_start.elapsed()
        );
        Ok(())
    }
}
