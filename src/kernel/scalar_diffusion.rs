use crate::field::{FieldHandle, FieldStore};
use crate::kernel::{ElemDataRequests, Kernel, MasterElementCall};
use crate::master_element::{HigherOrderScs, MasterElement};
use crate::scratch::ScratchViews;
use crate::simd::{splat, zero, SimdDouble, SimdMatrix, SimdVector};
use std::sync::Arc;

/// Diffusive flux `-Gamma grad(q) . A` through the sub-control surfaces, added to the left node
/// and subtracted from the right node of each surface.
#[derive(Debug, Clone)]
pub struct ScalarDiffusionKernel {
    name: String,
    scalar: FieldHandle,
    diffusivity: FieldHandle,
    scs: Arc<HigherOrderScs>,
}

#[derive(Debug, Default)]
struct DiffusionBuffers {
    lhs_factors: Vec<SimdDouble>,
}

impl ScalarDiffusionKernel {
    pub fn new(
        fields: &dyn FieldStore,
        requests: &mut ElemDataRequests,
        scalar_name: &str,
        diffusivity_name: &str,
    ) -> eyre::Result<Self> {
        let scs = Arc::clone(requests.scs()?);
        let coordinates = fields.require_field("coordinates")?;
        let scalar = fields.require_field(scalar_name)?;
        let diffusivity = fields.require_field(diffusivity_name)?;

        requests.add_coordinates_field(coordinates, scs.dimension())?;
        requests.add_gathered_nodal_field(scalar, 1)?;
        requests.add_gathered_nodal_field(diffusivity, 1)?;
        requests.add_master_element_call(MasterElementCall::ScsAreaVector);
        requests.add_master_element_call(MasterElementCall::ScsGradOp);

        Ok(Self {
            name: format!("ScalarDiffusion({scalar_name})"),
            scalar,
            diffusivity,
            scs,
        })
    }
}

impl Kernel for ScalarDiffusionKernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, lhs: &mut SimdMatrix, rhs: &mut SimdVector, scratch: &ScratchViews) {
        let dim = self.scs.dimension();
        let npe = self.scs.nodes_per_element();
        let shape_functions = self.scs.shape_functions();
        let scalar = scratch.field(self.scalar);
        let diffusivity = scratch.field(self.diffusivity);
        let areas = scratch.scs_area_vectors();
        let grad_op = scratch.scs_grad_op();

        let mut workspace = scratch.workspace();
        let buffers: &mut DiffusionBuffers = workspace.get_or_default();
        buffers.lhs_factors.resize(npe, zero());

        for (ip, &[left, right]) in self.scs.adjacent_nodes().iter().enumerate() {
            let mut gamma = zero();
            for ic in 0..npe {
                gamma += splat(shape_functions[(ip, ic)]) * diffusivity[(0, ic)];
            }

            let mut q_diff = zero();
            for (ic, lhs_fac) in buffers.lhs_factors.iter_mut().enumerate() {
                let mut grad_dot_area = zero();
                for j in 0..dim {
                    grad_dot_area += grad_op[ip][(j, ic)] * areas[(j, ip)];
                }
                *lhs_fac = -gamma * grad_dot_area;
                q_diff += *lhs_fac * scalar[(0, ic)];
            }

            for (ic, &lhs_fac) in buffers.lhs_factors.iter().enumerate() {
                lhs[(left, ic)] += lhs_fac;
                lhs[(right, ic)] -= lhs_fac;
            }
            rhs[left] -= q_diff;
            rhs[right] += q_diff;
        }
    }
}
