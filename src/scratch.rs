//! Per-batch gathered element data.
use crate::error::{DegenerateElementError, ElementQualityReport};
use crate::field::{FieldHandle, FieldStore};
use crate::kernel::{ElemDataRequests, MasterElementCall};
use crate::master_element::MasterElement;
use crate::mesh::ElementBlock;
use crate::simd::{extract_lane, set_lane, set_lane_slice, zero, SimdDouble, SimdMatrix, SIMD_WIDTH};
use crate::workspace::Workspace;
use eyre::eyre;
use nalgebra::DMatrix;
use rustc_hash::FxHashMap;
use std::cell::{RefCell, RefMut};
use std::ops::Range;

/// Nodal fields and master element data of one batch of up to [`SIMD_WIDTH`] elements.
///
/// Lanes beyond the number of active elements hold copies of the first element, so that
/// kernels can operate on full batches without producing invalid values.
#[derive(Debug)]
pub struct ScratchViews {
    num_active_lanes: usize,
    element_nodes: Vec<Vec<usize>>,
    fields: FxHashMap<FieldHandle, SimdMatrix>,
    coordinates: Option<FieldHandle>,
    scv_volume: Vec<SimdDouble>,
    scv_grad_op: Vec<SimdMatrix>,
    scs_area_vectors: SimdMatrix,
    scs_grad_op: Vec<SimdMatrix>,
    workspace: RefCell<Workspace>,
    buffers: LaneBuffers,
}

#[derive(Debug)]
struct LaneBuffers {
    nodal: DMatrix<f64>,
    coords: DMatrix<f64>,
    values: Vec<f64>,
    gradients: Vec<DMatrix<f64>>,
    areas: DMatrix<f64>,
}

impl Default for LaneBuffers {
    fn default() -> Self {
        Self {
            nodal: DMatrix::zeros(0, 0),
            coords: DMatrix::zeros(0, 0),
            values: Vec::new(),
            gradients: Vec::new(),
            areas: DMatrix::zeros(0, 0),
        }
    }
}

impl Default for ScratchViews {
    fn default() -> Self {
        Self {
            num_active_lanes: 0,
            element_nodes: Vec::new(),
            fields: FxHashMap::default(),
            coordinates: None,
            scv_volume: Vec::new(),
            scv_grad_op: Vec::new(),
            scs_area_vectors: SimdMatrix::from_element(0, 0, zero()),
            scs_grad_op: Vec::new(),
            workspace: RefCell::new(Workspace::default()),
            buffers: LaneBuffers::default(),
        }
    }
}

fn record(lane_error: &mut Option<DegenerateElementError>, result: Result<(), DegenerateElementError>) {
    if let Err(error) = result {
        *lane_error = Some(match lane_error.take() {
            Some(previous) => DegenerateElementError {
                num_points: previous.num_points.max(error.num_points),
                min_det_j: previous.min_det_j.min(error.min_det_j),
            },
            None => error,
        });
    }
}

fn resize_batched(matrix: &mut SimdMatrix, nrows: usize, ncols: usize) {
    matrix.resize_mut(nrows, ncols, zero());
}

impl ScratchViews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gathers the requested data for the elements in `elements`, which must contain between
    /// one and [`SIMD_WIDTH`] elements.
    ///
    /// Returns the quality report of the active elements.
    pub fn gather(
        &mut self,
        requests: &ElemDataRequests,
        fields: &dyn FieldStore,
        block: &dyn ElementBlock,
        elements: Range<usize>,
    ) -> eyre::Result<ElementQualityReport> {
        let num_active = elements.len();
        if num_active == 0 || num_active > SIMD_WIDTH {
            return Err(eyre!("A batch must contain between 1 and {SIMD_WIDTH} elements, got {num_active}"));
        }
        if elements.end > block.num_elements() {
            return Err(eyre!("Element range {elements:?} out of bounds"));
        }
        self.num_active_lanes = num_active;

        let npe = block.nodes_per_element();
        self.element_nodes.resize_with(SIMD_WIDTH, Vec::new);
        for (lane, nodes) in self.element_nodes.iter_mut().enumerate() {
            let element = elements.start + if lane < num_active { lane } else { 0 };
            nodes.resize(npe, 0);
            block.populate_element_nodes(nodes, element);
        }

        for request in requests.fields() {
            let batched = self
                .fields
                .entry(request.handle)
                .or_insert_with(|| SimdMatrix::from_element(0, 0, zero()));
            resize_batched(batched, request.num_components, npe);
            for (lane, nodes) in self.element_nodes.iter().enumerate() {
                fields.gather_nodal(request.handle, nodes, &mut self.buffers.nodal)?;
                if self.buffers.nodal.shape() != (request.num_components, npe) {
                    return Err(eyre!(
                        "Field {} gathered with shape {:?}, expected {:?}",
                        request.handle.0,
                        self.buffers.nodal.shape(),
                        (request.num_components, npe)
                    ));
                }
                set_lane(batched, lane, &self.buffers.nodal);
            }
        }
        self.coordinates = requests.coordinates().map(|r| r.handle);

        let mut report = ElementQualityReport::default();
        if requests.calls().next().is_none() {
            return Ok(report);
        }
        let coordinates_handle = self
            .coordinates
            .ok_or_else(|| eyre!("Master element data requested without a coordinates field"))?;

        let Self {
            fields: gathered,
            scv_volume,
            scv_grad_op,
            scs_area_vectors,
            scs_grad_op,
            buffers,
            ..
        } = self;
        let coordinates = gathered
            .get(&coordinates_handle)
            .ok_or_else(|| eyre!("Coordinates field was not gathered"))?;
        let dim = coordinates.nrows();
        buffers.coords.resize_mut(dim, npe, 0.0);

        for lane in 0..SIMD_WIDTH {
            extract_lane(coordinates, lane, &mut buffers.coords);
            let mut lane_error = None;

            for call in requests.calls() {
                match call {
                    MasterElementCall::ScvVolume => {
                        let scv = requests.scv()?;
                        let num_ips = scv.num_integration_points();
                        buffers.values.resize(num_ips, 0.0);
                        scv_volume.resize(num_ips, zero());
                        record(&mut lane_error, scv.determinant(&buffers.coords, &mut buffers.values));
                        set_lane_slice(scv_volume, lane, &buffers.values);
                    }
                    MasterElementCall::ScvGradOp => {
                        let scv = requests.scv()?;
                        let result = Self::gather_grad_op(&**scv, buffers, scv_grad_op, lane);
                        record(&mut lane_error, result);
                    }
                    MasterElementCall::ScsAreaVector => {
                        let scs = requests.scs()?;
                        let num_ips = scs.num_integration_points();
                        buffers.areas.resize_mut(dim, num_ips, 0.0);
                        resize_batched(scs_area_vectors, dim, num_ips);
                        record(&mut lane_error, scs.area_vectors(&buffers.coords, &mut buffers.areas));
                        set_lane(scs_area_vectors, lane, &buffers.areas);
                    }
                    MasterElementCall::ScsGradOp => {
                        let scs = requests.scs()?;
                        let result = Self::gather_grad_op(&**scs, buffers, scs_grad_op, lane);
                        record(&mut lane_error, result);
                    }
                }
            }

            match lane_error {
                Some(error) if lane < num_active => report.record(&error),
                _ => {}
            }
        }

        Ok(report)
    }

    fn gather_grad_op(
        master_element: &dyn MasterElement,
        buffers: &mut LaneBuffers,
        batched: &mut Vec<SimdMatrix>,
        lane: usize,
    ) -> Result<(), DegenerateElementError> {
        let num_ips = master_element.num_integration_points();
        let (dim, npe) = (master_element.dimension(), master_element.nodes_per_element());
        buffers.values.resize(num_ips, 0.0);
        buffers
            .gradients
            .resize_with(num_ips, || DMatrix::zeros(dim, npe));
        batched.resize_with(num_ips, || SimdMatrix::from_element(dim, npe, zero()));

        let result = master_element.grad_op(&buffers.coords, &mut buffers.gradients, &mut buffers.values);
        for (target, gradient) in batched.iter_mut().zip(&buffers.gradients) {
            resize_batched(target, dim, npe);
            set_lane(target, lane, gradient);
        }
        result
    }

    pub fn num_active_lanes(&self) -> usize {
        self.num_active_lanes
    }

    /// Global nodes of the element in the given lane.
    pub fn element_nodes(&self, lane: usize) -> &[usize] {
        &self.element_nodes[lane]
    }

    /// Gathered `num_components x nodes_per_element` values of a field.
    ///
    /// # Panics
    ///
    /// Panics if the field was not requested.
    pub fn field(&self, handle: FieldHandle) -> &SimdMatrix {
        self.fields
            .get(&handle)
            .unwrap_or_else(|| panic!("Field {} was not requested by any kernel", handle.0))
    }

    /// Gathered coordinates, `dimension x nodes_per_element`.
    ///
    /// # Panics
    ///
    /// Panics if no coordinates field was requested.
    pub fn coordinates(&self) -> &SimdMatrix {
        let handle = self
            .coordinates
            .expect("No coordinates field was requested by any kernel");
        self.field(handle)
    }

    pub fn scv_volume(&self) -> &[SimdDouble] {
        &self.scv_volume
    }

    pub fn scv_grad_op(&self) -> &[SimdMatrix] {
        &self.scv_grad_op
    }

    pub fn scs_area_vectors(&self) -> &SimdMatrix {
        &self.scs_area_vectors
    }

    pub fn scs_grad_op(&self) -> &[SimdMatrix] {
        &self.scs_grad_op
    }

    /// Per-thread buffers for kernels.
    pub fn workspace(&self) -> RefMut<'_, Workspace> {
        self.workspace.borrow_mut()
    }
}
