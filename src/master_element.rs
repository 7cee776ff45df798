//! Master elements: fixed tables of shape functions, reference gradients and integration
//! weights at the integration points of one topology and polynomial order, together with the
//! physical-space operators built from them.
use crate::basis::LagrangeBasis;
use crate::element::ElementDescription;
use crate::error::{DegenerateElementError, ElementError};
use crate::quadrature::QuadratureType;
use itertools::Itertools;
use log::debug;
use nalgebra::{DMatrix, DVector};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt::Debug;
use std::sync::Arc;

mod scs;
mod scv;

pub use scs::*;
pub use scv::*;

/// Settings for the Newton iteration used to locate physical points in an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLocationSettings {
    pub max_iterations: usize,
    /// Convergence tolerance on the max-norm of the reference coordinate update.
    pub tolerance: f64,
}

impl Default for PointLocationSettings {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-13,
        }
    }
}

/// Result of locating a physical point in an element.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLocation {
    /// Reference coordinates of the point. For non-converged iterations, the last iterate.
    pub reference_point: Vec<f64>,
    /// Max-norm of the reference coordinates. If the iteration budget is exhausted this is an
    /// estimate from the last iterate. A singular Jacobian or non-finite step gives `f64::MAX`.
    pub distance: f64,
    pub converged: bool,
    pub iterations: usize,
}

impl PointLocation {
    /// Whether the point lies in the reference element, extended by `tolerance`.
    pub fn is_inside(&self, tolerance: f64) -> bool {
        self.distance <= 1.0 + tolerance
    }
}

/// Common interface of sub-control-volume and sub-control-surface master elements.
///
/// Coordinates are passed as `dimension x nodes_per_element` matrices, with one column
/// per element node.
pub trait MasterElement: Debug + Send + Sync {
    fn description(&self) -> &ElementDescription;

    fn basis(&self) -> &LagrangeBasis;

    /// Reference coordinates of the integration points, laid out point by point.
    fn integration_locations(&self) -> &[f64];

    /// `num_integration_points x nodes_per_element` shape function values.
    fn shape_functions(&self) -> &DMatrix<f64>;

    /// Reference gradients (`dimension x nodes_per_element`) per integration point.
    fn shape_function_derivatives(&self) -> &[DMatrix<f64>];

    fn ip_weights(&self) -> &[f64];

    /// Node owning each integration point.
    fn ip_node_map(&self) -> &[usize];

    fn dimension(&self) -> usize {
        self.description().dimension()
    }

    fn nodes_per_element(&self) -> usize {
        self.description().nodes_per_element()
    }

    fn num_integration_points(&self) -> usize {
        self.ip_weights().len()
    }

    fn integration_location(&self, ip: usize) -> &[f64] {
        let dim = self.dimension();
        &self.integration_locations()[dim * ip..dim * (ip + 1)]
    }

    /// Physical gradients of the shape functions at every integration point, with the
    /// Jacobian determinant per integration point.
    ///
    /// All outputs are written even if some determinant is non-positive, in which case an
    /// error describing the degeneracy is returned.
    fn grad_op(
        &self,
        coords: &DMatrix<f64>,
        grad_op: &mut [DMatrix<f64>],
        det_j: &mut [f64],
    ) -> Result<(), DegenerateElementError> {
        assert_eq!(grad_op.len(), self.num_integration_points());
        compute_physical_gradients(coords, self.shape_function_derivatives(), grad_op, det_j)
    }

    /// Locates a physical point by Newton iteration on the reference-to-physical map.
    fn is_in_element(&self, coords: &DMatrix<f64>, point: &[f64]) -> PointLocation {
        locate_point(self.basis(), coords, point, &PointLocationSettings::default())
    }

    /// Interpolates `components x nodes_per_element` nodal values to an arbitrary reference
    /// point.
    fn interpolate_point(&self, xi: &[f64], nodal_values: &DMatrix<f64>) -> DVector<f64> {
        interpolate_point(self.basis(), xi, nodal_values)
    }
}

/// Jacobian `dx/dxi` of the reference-to-physical map given the reference gradients of the
/// basis at some point.
pub fn reference_jacobian(coords: &DMatrix<f64>, ref_gradients: &DMatrix<f64>) -> DMatrix<f64> {
    assert_eq!(coords.ncols(), ref_gradients.ncols(), "Coordinates must have one column per node");
    coords * ref_gradients.transpose()
}

/// Transforms reference gradients to physical gradients, `G = J^{-T} dN`.
pub fn compute_physical_gradients(
    coords: &DMatrix<f64>,
    ref_gradients: &[DMatrix<f64>],
    gradients: &mut [DMatrix<f64>],
    det_j: &mut [f64],
) -> Result<(), DegenerateElementError> {
    assert_eq!(ref_gradients.len(), gradients.len());
    assert_eq!(ref_gradients.len(), det_j.len());

    let mut num_degenerate = 0;
    let mut min_det_j = f64::INFINITY;
    for ((dn, g), det) in ref_gradients.iter().zip(gradients.iter_mut()).zip(det_j.iter_mut()) {
        let j = reference_jacobian(coords, dn);
        *det = j.determinant();
        min_det_j = min_det_j.min(*det);
        if *det <= 0.0 {
            num_degenerate += 1;
        }

        match j.transpose().try_inverse() {
            Some(j_inv_t) => *g = j_inv_t * dn,
            None => {
                g.resize_mut(dn.nrows(), dn.ncols(), 0.0);
                g.fill(0.0);
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

/// Finds the reference coordinates of a physical point with Newton's method, starting at the
/// element center.
pub fn locate_point(
    basis: &LagrangeBasis,
    coords: &DMatrix<f64>,
    point: &[f64],
    settings: &PointLocationSettings,
) -> PointLocation {
    let dim = basis.dimension();
    assert_eq!(point.len(), dim);
    assert_eq!(coords.shape(), (dim, basis.num_nodes()));

    let target = DVector::from_column_slice(point);
    let mut xi = DVector::zeros(dim);
    let mut phi = DVector::zeros(basis.num_nodes());
    let mut ref_gradients = DMatrix::zeros(dim, basis.num_nodes());

    let mut converged = false;
    let mut broke_down = false;
    let mut iterations = 0;
    while iterations < settings.max_iterations {
        iterations += 1;
        basis.populate_basis(phi.as_mut_slice(), xi.as_slice());
        basis.populate_basis_gradients(&mut ref_gradients, xi.as_slice());
        let residual = coords * &phi - &target;
        let j = reference_jacobian(coords, &ref_gradients);

        let Some(step) = j.lu().solve(&residual) else {
            debug!("Point location: singular Jacobian after {iterations} iteration(s)");
            broke_down = true;
            break;
        };
        if step.iter().any(|s| !s.is_finite()) {
            broke_down = true;
            break;
        }
        xi -= &step;

        if step.amax() <= settings.tolerance {
            converged = true;
            break;
        }
    }

    let distance = if broke_down { f64::MAX } else { xi.amax() };
    if !converged {
        debug!(
            "Point location did not converge in {iterations} iteration(s), last iterate {:?}",
            xi.as_slice()
        );
    }

    PointLocation {
        reference_point: xi.as_slice().to_vec(),
        distance,
        converged,
        iterations,
    }
}

/// Evaluates `nodal_values * N(xi)`.
pub fn interpolate_point(basis: &LagrangeBasis, xi: &[f64], nodal_values: &DMatrix<f64>) -> DVector<f64> {
    assert_eq!(nodal_values.ncols(), basis.num_nodes());
    let mut phi = DVector::zeros(basis.num_nodes());
    basis.populate_basis(phi.as_mut_slice(), xi);
    nodal_values * phi
}

/// Multi-indices of the given length with entries in `0..extent`, the last entry varying fastest.
pub(crate) fn multi_indices(extent: usize, length: usize) -> Vec<Vec<usize>> {
    if length == 0 {
        return vec![Vec::new()];
    }
    (0..length)
        .map(|_| 0..extent)
        .multi_cartesian_product()
        .collect()
}

type RepositoryKey = (usize, usize, QuadratureType);

/// Cache of master elements shared between algorithms, keyed by dimension, order and
/// quadrature type.
#[derive(Debug, Default)]
pub struct MasterElementRepository {
    scv: Mutex<FxHashMap<RepositoryKey, Arc<HigherOrderScv>>>,
    scs: Mutex<FxHashMap<RepositoryKey, Arc<HigherOrderScs>>>,
}

impl MasterElementRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scv(
        &self,
        dimension: usize,
        order: usize,
        quadrature_type: QuadratureType,
    ) -> Result<Arc<HigherOrderScv>, ElementError> {
        let mut cache = self.scv.lock();
        let key = (dimension, order, quadrature_type);
        if let Some(scv) = cache.get(&key) {
            return Ok(Arc::clone(scv));
        }
        debug!("Creating SCV master element (dimension {dimension}, order {order}, {quadrature_type})");
        let scv = Arc::new(HigherOrderScv::with_quadrature(dimension, order, quadrature_type)?);
        cache.insert(key, Arc::clone(&scv));
        Ok(scv)
    }

    pub fn scs(
        &self,
        dimension: usize,
        order: usize,
        quadrature_type: QuadratureType,
    ) -> Result<Arc<HigherOrderScs>, ElementError> {
        let mut cache = self.scs.lock();
        let key = (dimension, order, quadrature_type);
        if let Some(scs) = cache.get(&key) {
            return Ok(Arc::clone(scs));
        }
        debug!("Creating SCS master element (dimension {dimension}, order {order}, {quadrature_type})");
        let scs = Arc::new(HigherOrderScs::with_quadrature(dimension, order, quadrature_type)?);
        cache.insert(key, Arc::clone(&scs));
        Ok(scs)
    }
}
