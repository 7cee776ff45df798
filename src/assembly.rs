//! Batched assembly of element kernels into a global linear system.
use crate::config::{EquationConfig, Execution};
use crate::error::ElementQualityReport;
use crate::field::FieldStore;
use crate::kernel::{ElemDataRequests, Kernel};
use crate::mesh::ElementBlock;
use crate::scratch::ScratchViews;
use crate::simd::{extract_lane, zero, SimdMatrix, SimdVector, SIMD_WIDTH};
use crate::time_integrator::TimeIntegrator;
use eyre::eyre;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::cell::RefCell;
use thread_local::ThreadLocal;

pub mod global;
pub mod local;

use global::LinearSystemSink;
use local::{apply_diagonal_relaxation, connectivity_permutation};

/// Summary of one assembly pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblyReport {
    pub num_elements: usize,
    pub num_batches: usize,
    pub quality: ElementQualityReport,
}

#[derive(Debug)]
struct BatchWorkspace {
    scratch: ScratchViews,
    lhs: SimdMatrix,
    rhs: SimdVector,
    lane_lhs: DMatrix<f64>,
    lane_rhs: DVector<f64>,
    permutation: Vec<usize>,
}

impl Default for BatchWorkspace {
    fn default() -> Self {
        Self {
            scratch: ScratchViews::new(),
            lhs: SimdMatrix::from_element(0, 0, zero()),
            rhs: SimdVector::from_element(0, zero()),
            lane_lhs: DMatrix::zeros(0, 0),
            lane_rhs: DVector::zeros(0),
            permutation: Vec::new(),
        }
    }
}

/// Assembles the kernels of one equation over a block of elements.
///
/// Elements are processed in batches of [`SIMD_WIDTH`]. For each batch, the requested element
/// data is gathered, every kernel adds its contribution in registration order, and the local
/// system of each element is extracted, relaxed and summed into the global system.
pub struct ElementSolverAlgorithm {
    equation: EquationConfig,
    requests: ElemDataRequests,
    kernels: Vec<Box<dyn Kernel>>,
    workspace: ThreadLocal<RefCell<BatchWorkspace>>,
}

impl ElementSolverAlgorithm {
    pub fn new(equation: EquationConfig, requests: ElemDataRequests) -> Self {
        Self {
            equation,
            requests,
            kernels: Vec::new(),
            workspace: ThreadLocal::new(),
        }
    }

    pub fn equation(&self) -> &EquationConfig {
        &self.equation
    }

    pub fn data_requests(&self) -> &ElemDataRequests {
        &self.requests
    }

    /// Requests to pass to kernel constructors.
    pub fn data_requests_mut(&mut self) -> &mut ElemDataRequests {
        &mut self.requests
    }

    pub fn add_kernel(&mut self, kernel: impl Kernel + 'static) {
        self.kernels.push(Box::new(kernel));
    }

    pub fn kernel_names(&self) -> impl Iterator<Item = &str> {
        self.kernels.iter().map(|kernel| kernel.name())
    }

    /// Runs setup on all kernels and assembles all elements of the block into `system`.
    ///
    /// Degenerate elements do not abort assembly. They are counted in the returned report.
    pub fn execute(
        &mut self,
        block: &dyn ElementBlock,
        fields: &dyn FieldStore,
        time_integrator: &TimeIntegrator,
        system: &dyn LinearSystemSink,
    ) -> eyre::Result<AssemblyReport> {
        if system.dofs_per_node() != self.equation.dofs_per_node {
            return Err(eyre!(
                "Equation \"{}\" has {} dof(s) per node, linear system has {}",
                self.equation.name,
                self.equation.dofs_per_node,
                system.dofs_per_node()
            ));
        }
        for kernel in &self.kernels {
            match kernel.dofs_per_node() {
                Some(dofs) if dofs != self.equation.dofs_per_node => {
                    return Err(eyre!(
                        "Kernel {} writes {} dof(s) per node, equation \"{}\" has {}",
                        kernel.name(),
                        dofs,
                        self.equation.name,
                        self.equation.dofs_per_node
                    ));
                }
                _ => {}
            }
        }
        self.requests.validate(block.nodes_per_element())?;

        for kernel in &mut self.kernels {
            debug!("{}: setup of kernel {}", self.equation.name, kernel.name());
            kernel.setup(time_integrator);
        }

        let this = &*self;
        let num_elements = block.num_elements();
        let num_batches = (num_elements + SIMD_WIDTH - 1) / SIMD_WIDTH;
        let assemble = |batch: usize| -> eyre::Result<ElementQualityReport> {
            let workspace = this
                .workspace
                .get_or(|| RefCell::new(BatchWorkspace::default()));
            this.assemble_batch(&mut workspace.borrow_mut(), batch, block, fields, system)
        };

        let quality = match self.equation.execution {
            Execution::Serial => (0..num_batches)
                .map(assemble)
                .try_fold(ElementQualityReport::default(), |acc, quality| quality.map(|q| acc.merge(q)))?,
            Execution::Parallel => (0..num_batches)
                .into_par_iter()
                .map(assemble)
                .try_reduce(ElementQualityReport::default, |a, b| Ok(a.merge(b)))?,
        };

        info!(
            "{}: assembled {num_elements} element(s) in {num_batches} batch(es) with {} kernel(s)",
            self.equation.name,
            self.kernels.len()
        );
        if quality.has_degenerate_elements() {
            warn!(
                "{}: {} element(s) with non-positive Jacobian determinant (min {:e})",
                self.equation.name, quality.num_degenerate_elements, quality.min_det_j
            );
        }

        Ok(AssemblyReport {
            num_elements,
            num_batches,
            quality,
        })
    }

    fn assemble_batch(
        &self,
        workspace: &mut BatchWorkspace,
        batch: usize,
        block: &dyn ElementBlock,
        fields: &dyn FieldStore,
        system: &dyn LinearSystemSink,
    ) -> eyre::Result<ElementQualityReport> {
        let BatchWorkspace {
            scratch,
            lhs,
            rhs,
            lane_lhs,
            lane_rhs,
            permutation,
        } = workspace;

        let start = batch * SIMD_WIDTH;
        let end = (start + SIMD_WIDTH).min(block.num_elements());
        let quality = scratch.gather(&self.requests, fields, block, start..end)?;

        let n = self.equation.dofs_per_node * block.nodes_per_element();
        lhs.resize_mut(n, n, zero());
        lhs.fill(zero());
        rhs.resize_vertically_mut(n, zero());
        rhs.fill(zero());
        lane_lhs.resize_mut(n, n, 0.0);
        lane_rhs.resize_vertically_mut(n, 0.0);

        for kernel in &self.kernels {
            kernel.execute(lhs, rhs, scratch);
        }

        for lane in 0..scratch.num_active_lanes() {
            extract_lane(lhs, lane, lane_lhs);
            extract_lane(rhs, lane, lane_rhs);
            apply_diagonal_relaxation(lane_lhs, &self.equation.relaxation);

            let element_nodes = scratch.element_nodes(lane);
            connectivity_permutation(element_nodes, permutation);
            system.sum_into(lane_lhs, lane_rhs, element_nodes, permutation)?;
        }

        Ok(quality)
    }
}
