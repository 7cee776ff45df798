use crate::basis::LagrangeBasis;
use crate::element::ElementDescription;
use crate::error::{DegenerateElementError, ElementError};
use crate::master_element::{multi_indices, reference_jacobian, MasterElement};
use crate::quadrature::{QuadratureType, TensorProductQuadratureRule};
use nalgebra::{DMatrix, Vector3};

/// Sub-control-surface master element.
///
/// For each reference direction `d` there are `order` sub-control surfaces `xi_d = scs_loc[s]`,
/// each separating the nodes with tensor index `s` and `s + 1` along `d`. Every such surface
/// segment between two nodes carries `num_quad^(d - 1)` integration points. Area vectors point
/// from the left node (index `s`) to the right node (index `s + 1`).
#[derive(Debug, Clone)]
pub struct HigherOrderScs {
    description: ElementDescription,
    basis: LagrangeBasis,
    quadrature: TensorProductQuadratureRule,
    locations: Vec<f64>,
    weights: Vec<f64>,
    directions: Vec<usize>,
    adjacent_nodes: Vec<[usize; 2]>,
    ip_node_map: Vec<usize>,
    shape_functions: DMatrix<f64>,
    shape_derivs: Vec<DMatrix<f64>>,
}

impl HigherOrderScs {
    pub fn create(dimension: usize, order: usize) -> Result<Self, ElementError> {
        Self::with_quadrature(dimension, order, QuadratureType::GaussLegendre)
    }

    pub fn with_quadrature(
        dimension: usize,
        order: usize,
        quadrature_type: QuadratureType,
    ) -> Result<Self, ElementError> {
        let description = ElementDescription::create(dimension, order)?;
        let quadrature = TensorProductQuadratureRule::with_type(quadrature_type, order)?;
        Self::new(description, quadrature)
    }

    pub fn new(description: ElementDescription, quadrature: TensorProductQuadratureRule) -> Result<Self, ElementError> {
        if quadrature.order() != description.polynomial_order() {
            return Err(ElementError::DimensionMismatch {
                expected: description.polynomial_order(),
                actual: quadrature.order(),
            });
        }

        let dim = description.dimension();
        let order = description.polynomial_order();
        let tangential_nodes = multi_indices(description.nodes_1d(), dim - 1);
        let tangential_gauss = multi_indices(quadrature.num_quad(), dim - 1);

        let mut locations = Vec::new();
        let mut weights = Vec::new();
        let mut directions = Vec::new();
        let mut adjacent_nodes = Vec::new();
        for d in 0..dim {
            let tangential_dims: Vec<usize> = (0..dim).filter(|&e| e != d).collect();
            for s in 0..order {
                for node_ordinals in &tangential_nodes {
                    let mut left = [0; 3];
                    for (&e, &n) in tangential_dims.iter().zip(node_ordinals) {
                        left[e] = n;
                    }
                    left[d] = s;
                    let mut right = left;
                    right[d] = s + 1;
                    let pair = [description.node_map(&left[..dim]), description.node_map(&right[..dim])];

                    for gauss_ordinals in &tangential_gauss {
                        let mut location = [0.0; 3];
                        location[d] = quadrature.scs_loc()[s];
                        for ((&e, &n), &q) in tangential_dims.iter().zip(node_ordinals).zip(gauss_ordinals) {
                            location[e] = quadrature.gauss_point_location(n, q);
                        }
                        locations.extend_from_slice(&location[..dim]);
                        weights.push(quadrature.tensor_product_weight(node_ordinals, gauss_ordinals));
                        directions.push(d);
                        adjacent_nodes.push(pair);
                    }
                }
            }
        }

        let ip_node_map = adjacent_nodes.iter().map(|[left, _]| *left).collect();
        let basis = LagrangeBasis::from_description(&description);
        let shape_functions = basis.eval_basis_weights(&locations);
        let shape_derivs = basis.eval_deriv_weights(&locations);

        Ok(Self {
            description,
            basis,
            quadrature,
            locations,
            weights,
            directions,
            adjacent_nodes,
            ip_node_map,
            shape_functions,
            shape_derivs,
        })
    }

    pub fn quadrature(&self) -> &TensorProductQuadratureRule {
        &self.quadrature
    }

    /// Left and right node of each integration point.
    pub fn adjacent_nodes(&self) -> &[[usize; 2]] {
        &self.adjacent_nodes
    }

    /// Reference direction normal to the surface of each integration point.
    pub fn ip_directions(&self) -> &[usize] {
        &self.directions
    }

    /// Weighted area vectors, one column per integration point.
    ///
    /// The area vector for a surface normal to reference direction `d` is the `d`-th column
    /// of the cofactor matrix of the Jacobian. A non-positive determinant flips the
    /// orientation, and is reported after all area vectors are written.
    pub fn area_vectors(&self, coords: &DMatrix<f64>, areas: &mut DMatrix<f64>) -> Result<(), DegenerateElementError> {
        let dim = self.dimension();
        assert_eq!(areas.shape(), (dim, self.num_integration_points()));

        let mut num_degenerate = 0;
        let mut min_det_j = f64::INFINITY;
        for (ip, dn) in self.shape_derivs.iter().enumerate() {
            let j = reference_jacobian(coords, dn);
            let det = j.determinant();
            min_det_j = min_det_j.min(det);
            if det <= 0.0 {
                num_degenerate += 1;
            }

            let w = self.weights[ip];
            let d = self.directions[ip];
            if dim == 2 {
                let (nx, ny) = match d {
                    0 => (j[(1, 1)], -j[(0, 1)]),
                    _ => (-j[(1, 0)], j[(0, 0)]),
                };
                areas[(0, ip)] = w * nx;
                areas[(1, ip)] = w * ny;
            } else {
                let e = (d + 1) % 3;
                let f = (d + 2) % 3;
                let column = |c: usize| Vector3::new(j[(0, c)], j[(1, c)], j[(2, c)]);
                let normal = column(e).cross(&column(f));
                for i in 0..3 {
                    areas[(i, ip)] = w * normal[i];
                }
            }
        }

        if num_degenerate > 0 {
            Err(DegenerateElementError {
                num_points: num_degenerate,
                min_det_j,
            })
        } else {
            Ok(())
        }
    }
}

impl MasterElement for HigherOrderScs {
    fn description(&self) -> &ElementDescription {
        &self.description
    }

    fn basis(&self) -> &LagrangeBasis {
        &self.basis
    }

    fn integration_locations(&self) -> &[f64] {
        &self.locations
    }

    fn shape_functions(&self) -> &DMatrix<f64> {
        &self.shape_functions
    }

    fn shape_function_derivatives(&self) -> &[DMatrix<f64>] {
        &self.shape_derivs
    }

    fn ip_weights(&self) -> &[f64] {
        &self.weights
    }

    /// The left node of each integration point.
    fn ip_node_map(&self) -> &[usize] {
        &self.ip_node_map
    }
}
