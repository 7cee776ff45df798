use crate::config::ThermalContactConstants;
use crate::field::{FieldHandle, FieldStore};
use crate::kernel::{ElemDataRequests, Kernel, MasterElementCall};
use crate::master_element::{HigherOrderScv, MasterElement};
use crate::scratch::ScratchViews;
use crate::simd::{splat, zero, SimdComplexField, SimdMatrix, SimdVector};
use std::f64::consts::PI;
use std::sync::Arc;

/// Manufactured source for steady heat conduction with the exact solution
/// `T = 1/4 sum_d cos(2 a pi x_d)`, i.e. `S = k / 4 (2 a pi)^2 sum_d cos(2 a pi x_d)`.
#[derive(Debug, Clone)]
pub struct SteadyThermalContactSrcKernel {
    coordinates: FieldHandle,
    a: f64,
    k: f64,
    scv: Arc<HigherOrderScv>,
}

impl SteadyThermalContactSrcKernel {
    pub fn new(
        fields: &dyn FieldStore,
        requests: &mut ElemDataRequests,
        constants: &ThermalContactConstants,
    ) -> eyre::Result<Self> {
        let scv = Arc::clone(requests.scv()?);
        let coordinates = fields.require_field("coordinates")?;
        requests.add_coordinates_field(coordinates, scv.dimension())?;
        requests.add_master_element_call(MasterElementCall::ScvVolume);

        Ok(Self {
            coordinates,
            a: constants.a,
            k: constants.k,
            scv,
        })
    }

    /// Exact temperature at `x`.
    pub fn exact_temperature(&self, x: &[f64]) -> f64 {
        let wave = 2.0 * self.a * PI;
        0.25 * x.iter().map(|x_d| (wave * x_d).cos()).sum::<f64>()
    }

    /// Source at `x`.
    pub fn source(&self, x: &[f64]) -> f64 {
        let wave = 2.0 * self.a * PI;
        0.25 * self.k * wave * wave * x.iter().map(|x_d| (wave * x_d).cos()).sum::<f64>()
    }
}

impl Kernel for SteadyThermalContactSrcKernel {
    fn name(&self) -> &str {
        "SteadyThermalContactSrc"
    }

    fn execute(&self, _lhs: &mut SimdMatrix, rhs: &mut SimdVector, scratch: &ScratchViews) {
        let dim = self.scv.dimension();
        let shape_functions = self.scv.shape_functions();
        let coordinates = scratch.field(self.coordinates);
        let scv_volume = scratch.scv_volume();
        let wave = 2.0 * self.a * PI;
        let scale = 0.25 * self.k * wave * wave;

        for (ip, &nn) in self.scv.ip_node_map().iter().enumerate() {
            let mut cos_sum = zero();
            for d in 0..dim {
                let mut x_d = zero();
                for ic in 0..coordinates.ncols() {
                    x_d += splat(shape_functions[(ip, ic)]) * coordinates[(d, ic)];
                }
                cos_sum += (splat(wave) * x_d).simd_cos();
            }
            rhs[nn] += splat(scale) * cos_sum * scv_volume[ip];
        }
    }
}
