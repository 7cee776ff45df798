//! Proptest strategies for reference points, polynomial fields and element geometries.
use crate::element::ElementDescription;
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use nalgebra::DMatrix;

/// Points in the box `[lower, upper]^dimension`.
pub fn point_in_box(dimension: usize, lower: f64, upper: f64) -> impl Strategy<Value = Vec<f64>> {
    vec(lower..=upper, dimension)
}

/// Points in the reference element extended by 5% in every direction.
pub fn point_near_reference_domain(dimension: usize) -> impl Strategy<Value = Vec<f64>> {
    point_in_box(dimension, -1.05, 1.05)
}

/// A polynomial with per-axis degree at most `degree`, stored as coefficients of the monomials
/// `x_0^a_0 x_1^a_1 ...` with the first exponent varying fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorPolynomial {
    pub dimension: usize,
    pub degree: usize,
    pub coefficients: Vec<f64>,
}

impl TensorPolynomial {
    fn exponents(&self, index: usize) -> [i32; 3] {
        let mut exponents = [0; 3];
        let mut remainder = index;
        for e in exponents.iter_mut().take(self.dimension) {
            *e = (remainder % (self.degree + 1)) as i32;
            remainder /= self.degree + 1;
        }
        exponents
    }

    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .enumerate()
            .map(|(index, c)| {
                let exponents = self.exponents(index);
                c * (0..self.dimension)
                    .map(|d| x[d].powi(exponents[d]))
                    .product::<f64>()
            })
            .sum()
    }

    pub fn gradient(&self, x: &[f64]) -> Vec<f64> {
        (0..self.dimension)
            .map(|k| {
                self.coefficients
                    .iter()
                    .enumerate()
                    .map(|(index, c)| {
                        let exponents = self.exponents(index);
                        if exponents[k] == 0 {
                            return 0.0;
                        }
                        c * (0..self.dimension)
                            .map(|d| {
                                if d == k {
                                    exponents[d] as f64 * x[d].powi(exponents[d] - 1)
                                } else {
                                    x[d].powi(exponents[d])
                                }
                            })
                            .product::<f64>()
                    })
                    .sum()
            })
            .collect()
    }

    /// Exact integral over the box `[lower, upper]`.
    pub fn integrate_box(&self, lower: &[f64], upper: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .enumerate()
            .map(|(index, c)| {
                let exponents = self.exponents(index);
                c * (0..self.dimension)
                    .map(|d| {
                        let p = exponents[d] + 1;
                        (upper[d].powi(p) - lower[d].powi(p)) / p as f64
                    })
                    .product::<f64>()
            })
            .sum()
    }
}

pub fn tensor_polynomial(dimension: usize, degree: usize) -> impl Strategy<Value = TensorPolynomial> {
    let num_coefficients = (degree + 1).pow(dimension as u32);
    vec(-1.0..=1.0, num_coefficients).prop_map(move |coefficients| TensorPolynomial {
        dimension,
        degree,
        coefficients,
    })
}

/// An affine scalar field `c + b . x`.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineField {
    pub constant: f64,
    pub gradient: Vec<f64>,
}

impl AffineField {
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.constant + self.gradient.iter().zip(x).map(|(b, x)| b * x).sum::<f64>()
    }
}

pub fn affine_field(dimension: usize) -> impl Strategy<Value = AffineField> {
    (-10.0..=10.0, vec(-10.0..=10.0, dimension)).prop_map(|(constant, gradient)| AffineField { constant, gradient })
}

/// Nodal coordinates of the reference element, with every node moved by at most `amplitude`
/// times the smallest 1D node spacing in each direction.
pub fn perturbed_element_coordinates(
    description: ElementDescription,
    amplitude: f64,
) -> impl Strategy<Value = DMatrix<f64>> {
    let dim = description.dimension();
    let npe = description.nodes_per_element();
    let spacing = description
        .node_locs_1d()
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::INFINITY, f64::min);
    let delta = amplitude * spacing;
    vec(-delta..=delta, dim * npe).prop_map(move |perturbation| {
        DMatrix::from_fn(dim, npe, |i, node| {
            description.node_locs_1d()[description.tensor_index(node)[i]] + perturbation[dim * node + i]
        })
    })
}

/// Nodal coordinates of the reference element under a random affine map `x = A xi + c` with
/// `A` close to a scaled identity.
pub fn affine_element_coordinates(description: ElementDescription) -> impl Strategy<Value = DMatrix<f64>> {
    let dim = description.dimension();
    let npe = description.nodes_per_element();
    (vec(-0.1..=0.1, dim * dim), vec(-5.0..=5.0, dim), 0.5..=2.0).prop_map(move |(a, c, scale)| {
        let a = DMatrix::from_fn(dim, dim, |i, j| {
            let diagonal = if i == j { scale } else { 0.0 };
            diagonal + a[dim * i + j]
        });
        DMatrix::from_fn(dim, npe, |i, node| {
            let xi = description.node_location(node);
            c[i] + (0..dim).map(|j| a[(i, j)] * xi[j]).sum::<f64>()
        })
    })
}
