#![allow(dead_code)]

use crate::{
    cfn::graphical_model::GraphicalModel,
    data_structures::hypergraph::{Hypergraph, UndirectedHypergraph},
    factor_types::{factor_trait::Factor, factor_type::FactorType},
};

// Stores information about a variable in the cost function network
#[derive(Debug)]
pub struct Variable {
    domain_size: usize,
}

// Stores a cost function network: variables are hypergraph nodes, factors (unary and non-unary) are hyperedges
pub struct CostFunctionNetwork {
    hypergraph: UndirectedHypergraph<Variable, FactorType>,
}

impl CostFunctionNetwork {
    // Creates an empty cost function network
    pub fn new() -> Self {
        CostFunctionNetwork {
            hypergraph: UndirectedHypergraph::with_capacity(0, 0),
        }
    }

    // Creates a cost function network with the given domain sizes and no factors,
    // reserving capacity for `factor_capacity` factors
    pub fn from_domain_sizes(domain_sizes: &[usize], factor_capacity: usize) -> Self {
        assert!(
            domain_sizes.iter().all(|domain_size| *domain_size > 0),
            "Every variable needs at least one label."
        );
        let variables = domain_sizes
            .iter()
            .map(|domain_size| Variable {
                domain_size: *domain_size,
            })
            .collect();
        CostFunctionNetwork {
            hypergraph: UndirectedHypergraph::from_node_data(variables, factor_capacity),
        }
    }

    // Adds a factor over the given variables
    pub fn add_factor(&mut self, variables: Vec<usize>, factor: FactorType) -> &mut Self {
        assert!(!variables.is_empty(), "A factor needs at least one variable.");
        assert_eq!(
            factor.arity(),
            variables.len(),
            "Factor's arity doesn't match the number of variables in it."
        );
        assert!(
            variables.windows(2).all(|w| w[0] < w[1]),
            "Variables in a factor must be distinct and sorted in increasing order."
        );
        assert!(
            variables.iter().all(|variable| *variable < self.num_variables()),
            "Factor refers to a variable outside of the network."
        );
        assert_eq!(
            factor.function_table_len(),
            self.product_domain_sizes(&variables),
            "Factor's function table doesn't match the domain sizes of its variables."
        );

        self.hypergraph.add_hyperedge(variables, factor);
        self
    }

    // Computes the product of domain sizes of given variables
    fn product_domain_sizes(&self, variables: &[usize]) -> usize {
        variables
            .iter()
            .map(|variable| self.domain_size(*variable))
            .product()
    }

    // Applies `mapping` to every value of every factor
    pub fn map_factors_inplace(&mut self, mapping: fn(&mut f64)) -> &mut Self {
        for factor in 0..self.factors_len() {
            self.hypergraph.hyperedge_data_mut(factor).map_inplace(mapping);
        }
        self
    }

    pub fn num_variables(&self) -> usize {
        self.hypergraph.num_nodes()
    }

    pub fn domain_size(&self, variable: usize) -> usize {
        self.hypergraph.node_data(variable).domain_size
    }

    pub fn factors_len(&self) -> usize {
        self.hypergraph.num_hyperedges()
    }

    pub fn factor(&self, factor: usize) -> &FactorType {
        self.hypergraph.hyperedge_data(factor)
    }
}

impl GraphicalModel for CostFunctionNetwork {
    type Function = FactorType;

    fn num_variables(&self) -> usize {
        self.hypergraph.num_nodes()
    }

    fn num_labels(&self, variable: usize) -> usize {
        self.domain_size(variable)
    }

    fn num_factors(&self) -> usize {
        self.hypergraph.num_hyperedges()
    }

    fn max_factor_order(&self) -> usize {
        self.hypergraph.max_hyperedge_len()
    }

    fn factors_of_variable(&self, variable: usize) -> &[usize] {
        self.hypergraph.incident_hyperedges(variable)
    }

    fn factor_variables(&self, factor: usize) -> &[usize] {
        self.hypergraph.hyperedge_endpoints(factor)
    }

    fn factor_function(&self, factor: usize) -> &FactorType {
        self.hypergraph.hyperedge_data(factor)
    }
}

// Four binary variables in a chain: unaries 0..4 (factors 0-3), then pairwise (0,1), (1,2), (2,3) (factors 4-6).
// Unary tables are [v, 2v] for variable v + 1, pairwise tables are distinct per factor.
#[cfg(test)]
pub(crate) fn construct_chain_cfn() -> CostFunctionNetwork {
    use crate::factor_types::function_table::FunctionTable;

    let mut cfn = CostFunctionNetwork::from_domain_sizes(&[2; 4], 7);
    for variable in 0..4 {
        let weight = (variable + 1) as f64;
        cfn.add_factor(
            vec![variable],
            FunctionTable::new(&[2], vec![weight, 2. * weight]).into(),
        );
    }
    for variable in 0..3 {
        let offset = 10. * (variable + 1) as f64;
        cfn.add_factor(
            vec![variable, variable + 1],
            FunctionTable::new(&[2, 2], vec![offset, offset + 1., offset + 2., offset + 3.])
                .into(),
        );
    }
    cfn
}
