use crate::field::{FieldHandle, FieldState, FieldStore};
use crate::kernel::{ElemDataRequests, Kernel, MasterElementCall};
use crate::master_element::{HigherOrderScv, MasterElement};
use crate::scratch::ScratchViews;
use crate::simd::{splat, zero, SimdMatrix, SimdVector};
use crate::time_integrator::TimeIntegrator;
use log::debug;
use std::sync::Arc;

/// Time derivative `d(rho q)/dt` of a scalar, discretized with the BDF coefficients of the
/// time integrator and a consistent mass matrix over the sub-control volumes.
#[derive(Debug, Clone)]
pub struct ScalarMassKernel {
    name: String,
    scalar: [FieldHandle; 3],
    density: FieldHandle,
    gammas: [f64; 3],
    time_step: f64,
    scv: Arc<HigherOrderScv>,
}

impl ScalarMassKernel {
    /// Looks up the scalar at the states `n + 1`, `n` and `n - 1`, see [`FieldState`].
    pub fn new(
        fields: &dyn FieldStore,
        requests: &mut ElemDataRequests,
        scalar_name: &str,
        density_name: &str,
    ) -> eyre::Result<Self> {
        let scv = Arc::clone(requests.scv()?);
        let coordinates = fields.require_field("coordinates")?;
        let q_np1 = fields.require_field(&FieldState::Np1.field_name(scalar_name))?;
        let q_n = fields.require_field(&FieldState::N.field_name(scalar_name))?;
        let q_nm1 = fields.require_field(&FieldState::Nm1.field_name(scalar_name))?;
        for handle in [q_np1, q_n, q_nm1] {
            requests.add_gathered_nodal_field(handle, 1)?;
        }
        let density = fields.require_field(density_name)?;
        requests.add_gathered_nodal_field(density, 1)?;
        requests.add_coordinates_field(coordinates, scv.dimension())?;
        requests.add_master_element_call(MasterElementCall::ScvVolume);

        Ok(Self {
            name: format!("ScalarMass({scalar_name})"),
            scalar: [q_np1, q_n, q_nm1],
            density,
            gammas: [1.0, -1.0, 0.0],
            time_step: 1.0,
            scv,
        })
    }
}

impl Kernel for ScalarMassKernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, time_integrator: &TimeIntegrator) {
        self.gammas = time_integrator.gammas();
        self.time_step = time_integrator.time_step();
        debug!("{}: gammas {:?}, time step {}", self.name, self.gammas, self.time_step);
    }

    fn execute(&self, lhs: &mut SimdMatrix, rhs: &mut SimdVector, scratch: &ScratchViews) {
        let npe = self.scv.nodes_per_element();
        let shape_functions = self.scv.shape_functions();
        let q = self.scalar.map(|handle| scratch.field(handle));
        let density = scratch.field(self.density);
        let scv_volume = scratch.scv_volume();
        let [gamma1, gamma2, gamma3] = self.gammas;
        let inv_dt = 1.0 / self.time_step;

        for (ip, &nn) in self.scv.ip_node_map().iter().enumerate() {
            let mut rho = zero();
            let mut q_ip = [zero(); 3];
            for ic in 0..npe {
                let r = splat(shape_functions[(ip, ic)]);
                rho += r * density[(0, ic)];
                for (value, field) in q_ip.iter_mut().zip(&q) {
                    *value += r * field[(0, ic)];
                }
            }

            let scaled_volume = rho * scv_volume[ip] * splat(inv_dt);
            rhs[nn] -= (splat(gamma1) * q_ip[0] + splat(gamma2) * q_ip[1] + splat(gamma3) * q_ip[2]) * scaled_volume;

            let lhs_fac = splat(gamma1) * scaled_volume;
            for ic in 0..npe {
                lhs[(nn, ic)] += splat(shape_functions[(ip, ic)]) * lhs_fac;
            }
        }
    }
}
