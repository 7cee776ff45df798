//! Element kernels and the registry of element data they require.
//!
//! A kernel computes one physical term of an equation. At construction it looks up the fields it
//! needs and declares them, together with the master element data it reads, in an
//! [`ElemDataRequests`]. During assembly it adds its contribution for a batch of elements to
//! the batched local system.
use crate::field::FieldHandle;
use crate::master_element::{HigherOrderScs, HigherOrderScv, MasterElement};
use crate::scratch::ScratchViews;
use crate::simd::{SimdMatrix, SimdVector};
use crate::time_integrator::TimeIntegrator;
use eyre::eyre;
use std::collections::BTreeSet;
use std::sync::Arc;

mod ksgs_source;
mod scalar_diffusion;
mod scalar_mass;
mod thermal_contact_source;

pub use ksgs_source::*;
pub use scalar_diffusion::*;
pub use scalar_mass::*;
pub use thermal_contact_source::*;

/// One physical term of an equation, evaluated for batches of elements.
pub trait Kernel: Send + Sync {
    fn name(&self) -> &str;

    /// Degrees of freedom per node of the local systems the kernel writes, or `None` if it
    /// writes local systems of any block size.
    fn dofs_per_node(&self) -> Option<usize> {
        Some(1)
    }

    /// Updates time dependent coefficients. Called once per assembly pass, before any batch.
    fn setup(&mut self, _time_integrator: &TimeIntegrator) {}

    /// Adds the contribution of the batch to `lhs` and `rhs`.
    ///
    /// Implementations must only accumulate into the local system, as other kernels contribute
    /// to the same batch.
    fn execute(&self, lhs: &mut SimdMatrix, rhs: &mut SimdVector, scratch: &ScratchViews);
}

/// Precomputed master element data that can be requested per element.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MasterElementCall {
    /// Integration point volumes of the sub-control-volume master element.
    ScvVolume,
    /// Physical shape function gradients at the sub-control-volume integration points.
    ScvGradOp,
    /// Weighted area vectors at the sub-control-surface integration points.
    ScsAreaVector,
    /// Physical shape function gradients at the sub-control-surface integration points.
    ScsGradOp,
}

impl MasterElementCall {
    fn requires_scv(&self) -> bool {
        matches!(self, Self::ScvVolume | Self::ScvGradOp)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldRequest {
    pub handle: FieldHandle,
    pub num_components: usize,
}

/// Registry of the fields and master element data that kernels of one algorithm read.
#[derive(Debug, Clone, Default)]
pub struct ElemDataRequests {
    scv: Option<Arc<HigherOrderScv>>,
    scs: Option<Arc<HigherOrderScs>>,
    coordinates: Option<FieldRequest>,
    fields: Vec<FieldRequest>,
    calls: BTreeSet<MasterElementCall>,
}

impl ElemDataRequests {
    pub fn new(scv: Option<Arc<HigherOrderScv>>, scs: Option<Arc<HigherOrderScs>>) -> Self {
        Self {
            scv,
            scs,
            ..Self::default()
        }
    }

    pub fn scv(&self) -> eyre::Result<&Arc<HigherOrderScv>> {
        self.scv
            .as_ref()
            .ok_or_else(|| eyre!("No sub-control-volume master element associated with the element data requests"))
    }

    pub fn scs(&self) -> eyre::Result<&Arc<HigherOrderScs>> {
        self.scs
            .as_ref()
            .ok_or_else(|| eyre!("No sub-control-surface master element associated with the element data requests"))
    }

    /// Declares the coordinates field. It is gathered like any other nodal field and is used
    /// for all master element calls.
    pub fn add_coordinates_field(&mut self, handle: FieldHandle, dimension: usize) -> eyre::Result<()> {
        let request = FieldRequest {
            handle,
            num_components: dimension,
        };
        match self.coordinates {
            Some(existing) if existing != request => {
                return Err(eyre!("Conflicting coordinates fields requested"));
            }
            _ => self.coordinates = Some(request),
        }
        self.add_gathered_nodal_field(handle, dimension)
    }

    pub fn add_gathered_nodal_field(&mut self, handle: FieldHandle, num_components: usize) -> eyre::Result<()> {
        match self.fields.iter().find(|r| r.handle == handle) {
            Some(existing) if existing.num_components != num_components => Err(eyre!(
                "Field {} requested with {} and {num_components} component(s)",
                handle.0,
                existing.num_components
            )),
            Some(_) => Ok(()),
            None => {
                self.fields.push(FieldRequest {
                    handle,
                    num_components,
                });
                Ok(())
            }
        }
    }

    pub fn add_master_element_call(&mut self, call: MasterElementCall) {
        self.calls.insert(call);
    }

    pub fn coordinates(&self) -> Option<FieldRequest> {
        self.coordinates
    }

    pub fn fields(&self) -> &[FieldRequest] {
        &self.fields
    }

    pub fn calls(&self) -> impl Iterator<Item = MasterElementCall> + '_ {
        self.calls.iter().copied()
    }

    pub fn has_call(&self, call: MasterElementCall) -> bool {
        self.calls.contains(&call)
    }

    /// Checks that the requests can be served for elements with the given number of nodes.
    pub fn validate(&self, nodes_per_element: usize) -> eyre::Result<()> {
        if self.calls.is_empty() {
            return Ok(());
        }
        let coordinates = self
            .coordinates
            .ok_or_else(|| eyre!("Master element data requested without a coordinates field"))?;

        for call in &self.calls {
            let (npe, dim) = if call.requires_scv() {
                let scv = self.scv()?;
                (scv.nodes_per_element(), scv.dimension())
            } else {
                let scs = self.scs()?;
                (scs.nodes_per_element(), scs.dimension())
            };
            if npe != nodes_per_element {
                return Err(eyre!(
                    "{call:?} requires elements with {npe} nodes, block has {nodes_per_element}"
                ));
            }
            if dim != coordinates.num_components {
                return Err(eyre!(
                    "{call:?} requires {dim}-dimensional coordinates, got {}",
                    coordinates.num_components
                ));
            }
        }
        Ok(())
    }
}
