//! Reference element descriptions for tensor-product quadrilaterals and hexahedra of arbitrary
//! polynomial order.
use crate::error::ElementError;
use cvfem_quadrature::univariate::try_gauss_lobatto;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Element topology of a tensor-product reference element.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topology {
    Quadrilateral,
    Hexahedron,
}

impl Topology {
    pub fn from_dimension(dimension: usize) -> Option<Self> {
        match dimension {
            2 => Some(Self::Quadrilateral),
            3 => Some(Self::Hexahedron),
            _ => None,
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            Self::Quadrilateral => 2,
            Self::Hexahedron => 3,
        }
    }
}

impl Display for Topology {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quadrilateral => write!(f, "Quadrilateral"),
            Self::Hexahedron => write!(f, "Hexahedron"),
        }
    }
}

// Counter-clockwise corners of the unit square, as (i, j) in {0, 1}^2
const QUAD_CORNERS: [[usize; 2]; 4] = [[0, 0], [1, 0], [1, 1], [0, 1]];

/// Immutable description of a reference element `[-1, 1]^d` with `(order + 1)^d` nodes placed
/// at the tensor product of the Gauss-Lobatto-Legendre points.
///
/// Nodes are numbered vertex first: the corners in counter-clockwise order (the `z = -1` face
/// before the `z = 1` face for hexahedra), followed by edge, face and volume interior nodes.
/// Within each class, nodes are ordered lexicographically with the first tensor index
/// varying fastest. For order 1 this reproduces the usual Quad4/Hex8 numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDescription {
    topology: Topology,
    polynomial_order: usize,
    nodes_1d: usize,
    nodes_per_element: usize,
    node_locs_1d: Vec<f64>,
    // Linearized tensor index i + n * j + n^2 * k -> node ordinal
    node_map: Vec<usize>,
    // Node ordinal -> tensor index (unused components are zero)
    inverse_node_map: Vec<[usize; 3]>,
}

impl ElementDescription {
    pub fn create(dimension: usize, order: usize) -> Result<Self, ElementError> {
        let topology = Topology::from_dimension(dimension).ok_or(ElementError::InvalidOrder { dimension, order })?;
        if order < 1 {
            return Err(ElementError::InvalidOrder { dimension, order });
        }

        let nodes_1d = order + 1;
        let nodes_per_element = nodes_1d.pow(dimension as u32);
        let (_, points) = try_gauss_lobatto(nodes_1d).ok_or(ElementError::InvalidOrder { dimension, order })?;
        let node_locs_1d = points.into_iter().map(|[x]| x).collect();

        let tensor_indices: Vec<[usize; 3]> = (0..nodes_per_element)
            .map(|linear| {
                let mut index = [0; 3];
                let mut remainder = linear;
                for component in index.iter_mut().take(dimension) {
                    *component = remainder % nodes_1d;
                    remainder /= nodes_1d;
                }
                index
            })
            .collect();

        let mut inverse_node_map = tensor_indices;
        inverse_node_map.sort_by_key(|index| node_ordering_key(index, dimension, order));

        let mut node_map = vec![usize::MAX; nodes_per_element];
        for (node, index) in inverse_node_map.iter().enumerate() {
            node_map[linearize(index, nodes_1d)] = node;
        }

        Ok(Self {
            topology,
            polynomial_order: order,
            nodes_1d,
            nodes_per_element,
            node_locs_1d,
            node_map,
            inverse_node_map,
        })
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn dimension(&self) -> usize {
        self.topology.dimension()
    }

    pub fn polynomial_order(&self) -> usize {
        self.polynomial_order
    }

    pub fn nodes_1d(&self) -> usize {
        self.nodes_1d
    }

    pub fn nodes_per_element(&self) -> usize {
        self.nodes_per_element
    }

    /// The 1D node locations in ascending order, including both end points.
    pub fn node_locs_1d(&self) -> &[f64] {
        &self.node_locs_1d
    }

    /// Node ordinal of the node with the given tensor index.
    ///
    /// # Panics
    ///
    /// Panics if the index has the wrong number of components or is out of bounds.
    pub fn node_map(&self, tensor_index: &[usize]) -> usize {
        assert_eq!(tensor_index.len(), self.dimension());
        assert!(tensor_index.iter().all(|&i| i < self.nodes_1d));
        let mut index = [0; 3];
        index[..tensor_index.len()].copy_from_slice(tensor_index);
        self.node_map[linearize(&index, self.nodes_1d)]
    }

    /// Tensor index of the node with the given ordinal.
    pub fn tensor_index(&self, node: usize) -> &[usize] {
        &self.inverse_node_map[node][..self.dimension()]
    }

    pub fn inverse_node_map(&self) -> &[[usize; 3]] {
        &self.inverse_node_map
    }

    /// Reference coordinates of the node with the given ordinal.
    pub fn node_location(&self, node: usize) -> Vec<f64> {
        self.tensor_index(node)
            .iter()
            .map(|&i| self.node_locs_1d[i])
            .collect()
    }
}

fn linearize(index: &[usize; 3], nodes_1d: usize) -> usize {
    index[0] + nodes_1d * (index[1] + nodes_1d * index[2])
}

fn node_ordering_key(index: &[usize; 3], dimension: usize, order: usize) -> (usize, usize) {
    let num_interior = index[..dimension]
        .iter()
        .filter(|&&i| i != 0 && i != order)
        .count();
    if num_interior == 0 {
        let corner = [index[0] / order, index[1] / order];
        let in_plane = QUAD_CORNERS
            .iter()
            .position(|c| *c == corner)
            .unwrap_or(0);
        let layer = index[2] / order;
        (0, 4 * layer + in_plane)
    } else {
        (num_interior, linearize(index, order + 1))
    }
}
