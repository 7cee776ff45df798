use crate::basis::LagrangeBasis;
use crate::element::ElementDescription;
use crate::error::{DegenerateElementError, ElementError};
use crate::master_element::{compute_physical_gradients, multi_indices, MasterElement};
use crate::quadrature::{QuadratureType, TensorProductQuadratureRule};
use nalgebra::DMatrix;

/// Sub-control-volume master element.
///
/// Every node owns the sub-control volume given by the tensor product of its 1D sub-control
/// volumes, and each sub-control volume carries `num_quad^d` integration points.
/// Integration points are grouped by owning node, in node order.
#[derive(Debug, Clone)]
pub struct HigherOrderScv {
    description: ElementDescription,
    basis: LagrangeBasis,
    quadrature: TensorProductQuadratureRule,
    locations: Vec<f64>,
    weights: Vec<f64>,
    ip_node_map: Vec<usize>,
    shape_functions: DMatrix<f64>,
    shape_derivs: Vec<DMatrix<f64>>,
}

impl HigherOrderScv {
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
        let gauss_indices = multi_indices(quadrature.num_quad(), dim);

        let mut locations = Vec::new();
        let mut weights = Vec::new();
        let mut ip_node_map = Vec::new();
        for node in 0..description.nodes_per_element() {
            let node_ordinals = description.tensor_index(node);
            for gauss_ordinals in &gauss_indices {
                locations.extend(
                    node_ordinals
                        .iter()
                        .zip(gauss_ordinals)
                        .map(|(&n, &q)| quadrature.gauss_point_location(n, q)),
                );
                weights.push(quadrature.tensor_product_weight(node_ordinals, gauss_ordinals));
                ip_node_map.push(node);
            }
        }

        let basis = LagrangeBasis::from_description(&description);
        let shape_functions = basis.eval_basis_weights(&locations);
        let shape_derivs = basis.eval_deriv_weights(&locations);

        Ok(Self {
            description,
            basis,
            quadrature,
            locations,
            weights,
            ip_node_map,
            shape_functions,
            shape_derivs,
        })
    }

    pub fn quadrature(&self) -> &TensorProductQuadratureRule {
        &self.quadrature
    }

    /// Physical volume associated with each integration point, `w * det(J)`.
    ///
    /// Volumes are written even for degenerate elements.
    pub fn determinant(&self, coords: &DMatrix<f64>, volumes: &mut [f64]) -> Result<(), DegenerateElementError> {
        assert_eq!(volumes.len(), self.num_integration_points());
        let mut gradients = vec![DMatrix::zeros(0, 0); self.num_integration_points()];
        let result = compute_physical_gradients(coords, &self.shape_derivs, &mut gradients, volumes);
        for (volume, w) in volumes.iter_mut().zip(&self.weights) {
            *volume *= w;
        }
        result
    }

    /// Volume of each sub-control volume, i.e. the integration point volumes summed per node.
    pub fn sub_control_volumes(
        &self,
        coords: &DMatrix<f64>,
        volumes: &mut [f64],
    ) -> Result<(), DegenerateElementError> {
        assert_eq!(volumes.len(), self.nodes_per_element());
        let mut ip_volumes = vec![0.0; self.num_integration_points()];
        let result = self.determinant(coords, &mut ip_volumes);
        volumes.fill(0.0);
        for (volume, node) in ip_volumes.iter().zip(&self.ip_node_map) {
            volumes[*node] += volume;
        }
        result
    }
}

impl MasterElement for HigherOrderScv {
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

    fn ip_node_map(&self) -> &[usize] {
        &self.ip_node_map
    }
}
