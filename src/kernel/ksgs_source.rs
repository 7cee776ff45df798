use crate::config::TurbulenceConstants;
use crate::field::{FieldHandle, FieldStore};
use crate::kernel::{ElemDataRequests, Kernel, MasterElementCall};
use crate::master_element::{HigherOrderScv, MasterElement};
use crate::scratch::ScratchViews;
use crate::simd::{splat, zero, SimdComplexField, SimdMatrix, SimdPartialOrd, SimdVector};
use std::sync::Arc;

/// Source term of the one-equation subgrid-scale turbulent kinetic energy model.
///
/// Per sub-control volume integration point, with the filter width taken as
/// `dual_nodal_volume^(1 / dim)`:
///
/// ```text
/// P_k = mu_t * sum_ij du_i/dx_j (du_i/dx_j + du_j/dx_i)
/// D_k = c_eps * rho * k^(3/2) / filter
/// ```
///
/// Production is clipped to `tke_prod_limit_ratio * D_k`, and the dissipation is linearized
/// in `k`.
#[derive(Debug, Clone)]
pub struct TurbKineticEnergyKsgsSrcKernel {
    velocity: FieldHandle,
    tke: FieldHandle,
    density: FieldHandle,
    turbulent_viscosity: FieldHandle,
    dual_nodal_volume: FieldHandle,
    c_eps: f64,
    tke_prod_limit_ratio: f64,
    scv: Arc<HigherOrderScv>,
}

impl TurbKineticEnergyKsgsSrcKernel {
    pub fn new(
        fields: &dyn FieldStore,
        requests: &mut ElemDataRequests,
        constants: &TurbulenceConstants,
    ) -> eyre::Result<Self> {
        let scv = Arc::clone(requests.scv()?);
        let dim = scv.dimension();

        let coordinates = fields.require_field("coordinates")?;
        let velocity = fields.require_field("velocity")?;
        let tke = fields.require_field("turbulent_ke")?;
        let density = fields.require_field("density")?;
        let turbulent_viscosity = fields.require_field("turbulent_viscosity")?;
        let dual_nodal_volume = fields.require_field("dual_nodal_volume")?;

        requests.add_coordinates_field(coordinates, dim)?;
        requests.add_gathered_nodal_field(velocity, dim)?;
        for scalar in [tke, density, turbulent_viscosity, dual_nodal_volume] {
            requests.add_gathered_nodal_field(scalar, 1)?;
        }
        requests.add_master_element_call(MasterElementCall::ScvVolume);
        requests.add_master_element_call(MasterElementCall::ScvGradOp);

        Ok(Self {
            velocity,
            tke,
            density,
            turbulent_viscosity,
            dual_nodal_volume,
            c_eps: constants.c_eps,
            tke_prod_limit_ratio: constants.tke_prod_limit_ratio,
            scv,
        })
    }
}

impl Kernel for TurbKineticEnergyKsgsSrcKernel {
    fn name(&self) -> &str {
        "TurbKineticEnergyKsgsSrc"
    }

    fn execute(&self, lhs: &mut SimdMatrix, rhs: &mut SimdVector, scratch: &ScratchViews) {
        let dim = self.scv.dimension();
        let npe = self.scv.nodes_per_element();
        let shape_functions = self.scv.shape_functions();
        let velocity = scratch.field(self.velocity);
        let tke = scratch.field(self.tke);
        let density = scratch.field(self.density);
        let tvisc = scratch.field(self.turbulent_viscosity);
        let dual_volume = scratch.field(self.dual_nodal_volume);
        let scv_volume = scratch.scv_volume();
        let grad_op = scratch.scv_grad_op();
        let inv_dim = 1.0 / dim as f64;

        for (ip, &nn) in self.scv.ip_node_map().iter().enumerate() {
            let mut rho = zero();
            let mut k = zero();
            let mut mu_t = zero();
            let mut dual_vol = zero();
            let mut dudx = [[zero(); 3]; 3];

            for ic in 0..npe {
                let r = splat(shape_functions[(ip, ic)]);
                rho += r * density[(0, ic)];
                k += r * tke[(0, ic)];
                mu_t += r * tvisc[(0, ic)];
                dual_vol += r * dual_volume[(0, ic)];

                for i in 0..dim {
                    let u_i = velocity[(i, ic)];
                    for j in 0..dim {
                        dudx[i][j] += grad_op[ip][(j, ic)] * u_i;
                    }
                }
            }

            let mut pk = zero();
            for i in 0..dim {
                for j in 0..dim {
                    pk += dudx[i][j] * (dudx[i][j] + dudx[j][i]);
                }
            }
            pk *= mu_t;

            let filter = dual_vol.simd_powf(splat(inv_dim));
            let k = k.simd_max(zero());
            let dk = splat(self.c_eps) * rho * k.simd_powf(splat(1.5)) / filter;
            let pk = pk.simd_min(splat(self.tke_prod_limit_ratio) * dk);

            let scv = scv_volume[ip];
            rhs[nn] += (pk - dk) * scv;

            let lhs_fac = splat(1.5 * self.c_eps) * rho * k.simd_sqrt() / filter * scv;
            for ic in 0..npe {
                lhs[(nn, ic)] += splat(shape_functions[(ip, ic)]) * lhs_fac;
            }
        }
    }
}
