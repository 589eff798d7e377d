#![allow(dead_code)]

use std::fmt::Debug;

use log::debug;

// Undirected hypergraph: nodes are variables, hyperedges are factors over ordered lists of variables.
// Every node keeps the list of hyperedges it belongs to, in insertion order.
pub trait Hypergraph<NodeData, HyperedgeData>
where
    NodeData: Debug,
    HyperedgeData: Debug,
{
    fn with_capacity(node_capacity: usize, hyperedge_capacity: usize) -> Self;
    fn from_node_data(data: Vec<NodeData>, hyperedge_capacity: usize) -> Self;

    fn add_node(&mut self, data: NodeData) -> usize;
    fn add_hyperedge(&mut self, endpoints: Vec<usize>, data: HyperedgeData) -> usize;

    fn num_nodes(&self) -> usize;
    fn node_data(&self, node: usize) -> &NodeData;
    fn incident_hyperedges(&self, node: usize) -> &[usize];

    fn num_hyperedges(&self) -> usize;
    fn hyperedge_endpoints(&self, hyperedge: usize) -> &[usize];
    fn hyperedge_data(&self, hyperedge: usize) -> &HyperedgeData;
    fn hyperedge_data_mut(&mut self, hyperedge: usize) -> &mut HyperedgeData;

    // Largest number of endpoints of any hyperedge (0 if there are none)
    fn max_hyperedge_len(&self) -> usize;
}

pub struct Node<NodeData> {
    data: NodeData,
    incident_hyperedges: Vec<usize>,
}

pub struct Hyperedge<HyperedgeData> {
    data: HyperedgeData,
    endpoints: Vec<usize>,
}

pub struct UndirectedHypergraph<NodeData, HyperedgeData> {
    nodes: Vec<Node<NodeData>>,
    hyperedges: Vec<Hyperedge<HyperedgeData>>,
    max_hyperedge_len: usize,
}

impl<NodeData: Debug, HyperedgeData: Debug> Hypergraph<NodeData, HyperedgeData>
    for UndirectedHypergraph<NodeData, HyperedgeData>
{
    fn with_capacity(node_capacity: usize, hyperedge_capacity: usize) -> Self {
        UndirectedHypergraph {
            nodes: Vec::with_capacity(node_capacity),
            hyperedges: Vec::with_capacity(hyperedge_capacity),
            max_hyperedge_len: 0,
        }
    }

    fn from_node_data(data: Vec<NodeData>, hyperedge_capacity: usize) -> Self {
        UndirectedHypergraph {
            nodes: data
                .into_iter()
                .map(|data| Node {
                    data,
                    incident_hyperedges: Vec::new(),
                })
                .collect(),
            hyperedges: Vec::with_capacity(hyperedge_capacity),
            max_hyperedge_len: 0,
        }
    }

    fn add_node(&mut self, data: NodeData) -> usize {
        debug!("Add node with data {:?}", data);
        self.nodes.push(Node {
            data,
            incident_hyperedges: Vec::new(),
        });
        self.num_nodes() - 1
    }

    fn add_hyperedge(&mut self, endpoints: Vec<usize>, data: HyperedgeData) -> usize {
        debug!(
            "Add hyperedge with endpoints {:?} and data {:?}",
            endpoints, data
        );

        assert!(
            endpoints.iter().all(|node| *node < self.num_nodes()),
            "Hyperedge endpoint out of range."
        );
        let new_hyperedge_index = self.num_hyperedges();
        for endpoint in &endpoints {
            self.nodes[*endpoint]
                .incident_hyperedges
                .push(new_hyperedge_index);
        }
        self.max_hyperedge_len = self.max_hyperedge_len.max(endpoints.len());
        self.hyperedges.push(Hyperedge { data, endpoints });
        new_hyperedge_index
    }

    fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn node_data(&self, node: usize) -> &NodeData {
        &self.nodes[node].data
    }

    fn incident_hyperedges(&self, node: usize) -> &[usize] {
        &self.nodes[node].incident_hyperedges
    }

    fn num_hyperedges(&self) -> usize {
        self.hyperedges.len()
    }

    fn hyperedge_endpoints(&self, hyperedge: usize) -> &[usize] {
        &self.hyperedges[hyperedge].endpoints
    }

    fn hyperedge_data(&self, hyperedge: usize) -> &HyperedgeData {
        &self.hyperedges[hyperedge].data
    }

    fn hyperedge_data_mut(&mut self, hyperedge: usize) -> &mut HyperedgeData {
        &mut self.hyperedges[hyperedge].data
    }

    fn max_hyperedge_len(&self) -> usize {
        self.max_hyperedge_len
    }
}
