//! Element blocks: element-to-node connectivity of a mesh region with a single topology
//! and polynomial order.
use eyre::eyre;

pub mod procedural;

/// Connectivity of a block of elements that share topology and polynomial order.
pub trait ElementBlock: Sync {
    fn num_elements(&self) -> usize;

    /// Total number of nodes addressed by the block.
    fn num_nodes(&self) -> usize;

    fn nodes_per_element(&self) -> usize;

    /// Writes the global node indices of the element, in element node order.
    fn populate_element_nodes(&self, output: &mut [usize], element_index: usize);
}

/// An element block stored as a flat connectivity array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformElementBlock {
    nodes_per_element: usize,
    num_nodes: usize,
    connectivity: Vec<usize>,
}

impl UniformElementBlock {
    pub fn new(nodes_per_element: usize, num_nodes: usize, connectivity: Vec<usize>) -> eyre::Result<Self> {
        if nodes_per_element == 0 {
            return Err(eyre!("Elements must have at least one node"));
        }
        if connectivity.len() % nodes_per_element != 0 {
            return Err(eyre!(
                "Connectivity length {} is not a multiple of {nodes_per_element} nodes per element",
                connectivity.len()
            ));
        }
        if let Some(node) = connectivity.iter().find(|&&node| node >= num_nodes) {
            return Err(eyre!("Node index {node} out of bounds for {num_nodes} node(s)"));
        }
        Ok(Self {
            nodes_per_element,
            num_nodes,
            connectivity,
        })
    }

    pub fn element_nodes(&self, element_index: usize) -> &[usize] {
        let n = self.nodes_per_element;
        &self.connectivity[n * element_index..n * (element_index + 1)]
    }

    pub fn connectivity(&self) -> &[usize] {
        &self.connectivity
    }

    /// Keeps only the elements for which the predicate holds.
    pub fn filter_elements(&self, mut keep: impl FnMut(usize, &[usize]) -> bool) -> Self {
        let connectivity = self
            .connectivity
            .chunks_exact(self.nodes_per_element)
            .enumerate()
            .filter(|(i, nodes)| keep(*i, nodes))
            .flat_map(|(_, nodes)| nodes.iter().copied())
            .collect();
        Self {
            connectivity,
            ..self.clone()
        }
    }
}

impl ElementBlock for UniformElementBlock {
    fn num_elements(&self) -> usize {
        self.connectivity.len() / self.nodes_per_element
    }

    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    fn nodes_per_element(&self) -> usize {
        self.nodes_per_element
    }

    fn populate_element_nodes(&self, output: &mut [usize], element_index: usize) {
        output.copy_from_slice(self.element_nodes(element_index));
    }
}
