//! Tensor-product nodal Lagrange bases.
use crate::element::ElementDescription;
use nalgebra::DMatrix;

/// Nodal Lagrange basis on `[-1, 1]^d`, formed as the tensor product of the 1D Lagrange
/// polynomials through a set of nodes.
///
/// Evaluation is not restricted to the reference domain: points outside of `[-1, 1]^d` give
/// the polynomial extrapolation of the basis.
#[derive(Debug, Clone, PartialEq)]
pub struct LagrangeBasis {
    dimension: usize,
    nodes_1d: Vec<f64>,
    // Reciprocals of prod_{m != j} (x_j - x_m)
    inverse_denominators: Vec<f64>,
    inverse_node_map: Vec<[usize; 3]>,
}

impl LagrangeBasis {
    /// Constructs a basis from 1D node locations and the map from node ordinal to tensor index.
    ///
    /// # Panics
    ///
    /// Panics if the 1D nodes are not distinct or a tensor index is out of bounds.
    pub fn new(dimension: usize, nodes_1d: Vec<f64>, inverse_node_map: Vec<[usize; 3]>) -> Self {
        let n = nodes_1d.len();
        assert!(inverse_node_map
            .iter()
            .all(|index| index[..dimension].iter().all(|&i| i < n)));

        let inverse_denominators = (0..n)
            .map(|j| {
                let denominator: f64 = (0..n)
                    .filter(|&m| m != j)
                    .map(|m| nodes_1d[j] - nodes_1d[m])
                    .product();
                assert!(denominator != 0.0, "1D nodes must be distinct");
                1.0 / denominator
            })
            .collect();

        Self {
            dimension,
            nodes_1d,
            inverse_denominators,
            inverse_node_map,
        }
    }

    pub fn from_description(description: &ElementDescription) -> Self {
        Self::new(
            description.dimension(),
            description.node_locs_1d().to_vec(),
            description.inverse_node_map().to_vec(),
        )
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn num_nodes(&self) -> usize {
        self.inverse_node_map.len()
    }

    /// Value of the `j`-th 1D Lagrange polynomial at `x`.
    pub fn lagrange_1d(&self, j: usize, x: f64) -> f64 {
        let numerator: f64 = self
            .nodes_1d
            .iter()
            .enumerate()
            .filter(|(m, _)| *m != j)
            .map(|(_, x_m)| x - x_m)
            .product();
        numerator * self.inverse_denominators[j]
    }

    /// Derivative of the `j`-th 1D Lagrange polynomial at `x`.
    pub fn lagrange_deriv_1d(&self, j: usize, x: f64) -> f64 {
        let n = self.nodes_1d.len();
        let mut sum = 0.0;
        for k in (0..n).filter(|&k| k != j) {
            let product: f64 = (0..n)
                .filter(|&m| m != j && m != k)
                .map(|m| x - self.nodes_1d[m])
                .product();
            sum += product;
        }
        sum * self.inverse_denominators[j]
    }

    fn evaluate_1d(&self, xi: &[f64], values: &mut [[f64; 3]], derivatives: Option<&mut [[f64; 3]]>) {
        for (i, row) in values.iter_mut().enumerate() {
            for d in 0..self.dimension {
                row[d] = self.lagrange_1d(i, xi[d]);
            }
        }
        if let Some(derivatives) = derivatives {
            for (i, row) in derivatives.iter_mut().enumerate() {
                for d in 0..self.dimension {
                    row[d] = self.lagrange_deriv_1d(i, xi[d]);
                }
            }
        }
    }

    /// Evaluates all basis functions at the reference point `xi`.
    ///
    /// # Panics
    ///
    /// Panics if the buffer length differs from the number of nodes.
    pub fn populate_basis(&self, basis: &mut [f64], xi: &[f64]) {
        assert_eq!(basis.len(), self.num_nodes());
        assert_eq!(xi.len(), self.dimension);
        let mut values = vec![[0.0; 3]; self.nodes_1d.len()];
        self.evaluate_1d(xi, &mut values, None);

        for (phi, index) in basis.iter_mut().zip(&self.inverse_node_map) {
            *phi = (0..self.dimension)
                .map(|d| values[index[d]][d])
                .product();
        }
    }

    /// Evaluates the reference gradients of all basis functions at `xi`.
    ///
    /// Column `n` of the `dimension x num_nodes` output holds the gradient of basis function `n`.
    pub fn populate_basis_gradients(&self, gradients: &mut DMatrix<f64>, xi: &[f64]) {
        assert_eq!(gradients.shape(), (self.dimension, self.num_nodes()));
        assert_eq!(xi.len(), self.dimension);
        let n = self.nodes_1d.len();
        let mut values = vec![[0.0; 3]; n];
        let mut derivatives = vec![[0.0; 3]; n];
        self.evaluate_1d(xi, &mut values, Some(derivatives.as_mut_slice()));

        for (node, index) in self.inverse_node_map.iter().enumerate() {
            for d in 0..self.dimension {
                gradients[(d, node)] = (0..self.dimension)
                    .map(|e| {
                        if e == d {
                            derivatives[index[e]][e]
                        } else {
                            values[index[e]][e]
                        }
                    })
                    .product();
            }
        }
    }

    /// Interpolation weights at a set of points laid out point by point in `points`.
    ///
    /// Returns a `num_points x num_nodes` matrix.
    pub fn eval_basis_weights(&self, points: &[f64]) -> DMatrix<f64> {
        assert_eq!(points.len() % self.dimension, 0);
        let num_points = points.len() / self.dimension;
        let mut weights = DMatrix::zeros(num_points, self.num_nodes());
        let mut basis = vec![0.0; self.num_nodes()];
        for (p, xi) in points.chunks_exact(self.dimension).enumerate() {
            self.populate_basis(&mut basis, xi);
            for (n, phi) in basis.iter().enumerate() {
                weights[(p, n)] = *phi;
            }
        }
        weights
    }

    /// Derivative weights at a set of points laid out point by point in `points`.
    ///
    /// Returns one `dimension x num_nodes` matrix per point.
    pub fn eval_deriv_weights(&self, points: &[f64]) -> Vec<DMatrix<f64>> {
        assert_eq!(points.len() % self.dimension, 0);
        points
            .chunks_exact(self.dimension)
            .map(|xi| {
                let mut gradients = DMatrix::zeros(self.dimension, self.num_nodes());
                self.populate_basis_gradients(&mut gradients, xi);
                gradients
            })
            .collect()
    }
}
