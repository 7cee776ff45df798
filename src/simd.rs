//! Fixed-width batches of `f64` values, one lane per element.
//!
//! Batched local matrices and vectors are ordinary `nalgebra` containers of [`SimdDouble`],
//! giving a struct-of-arrays layout in which each entry holds the values of all elements
//! of a batch. The lane type is `simba`'s wrapper around `wide::f64x4`, which lowers to AVX
//! registers where available and to pairs of SSE2 registers otherwise.
use nalgebra::storage::{Storage, StorageMut};
use nalgebra::{DMatrix, DVector, Dim, Matrix};
use simba::simd::WideF64x4;

pub use simba::simd::{SimdComplexField, SimdPartialOrd, SimdValue};

pub type SimdDouble = WideF64x4;

/// Number of elements processed together in a batch.
pub const SIMD_WIDTH: usize = 4;

pub type SimdMatrix = DMatrix<SimdDouble>;
pub type SimdVector = DVector<SimdDouble>;

/// Broadcasts a scalar to all lanes.
#[inline(always)]
pub fn splat(value: f64) -> SimdDouble {
    SimdDouble::splat(value)
}

/// All lanes zero.
#[inline(always)]
pub fn zero() -> SimdDouble {
    SimdDouble::splat(0.0)
}

/// Copies one lane of a batched matrix into a scalar matrix of the same shape.
pub fn extract_lane<R, C, S1, S2>(batched: &Matrix<SimdDouble, R, C, S1>, lane: usize, output: &mut Matrix<f64, R, C, S2>)
where
    R: Dim,
    C: Dim,
    S1: Storage<SimdDouble, R, C>,
    S2: StorageMut<f64, R, C>,
{
    assert_eq!(batched.shape(), output.shape());
    for (out, value) in output.iter_mut().zip(batched.iter()) {
        *out = value.extract(lane);
    }
}

/// Writes a scalar matrix into one lane of a batched matrix of the same shape.
pub fn set_lane<R, C, S1, S2>(batched: &mut Matrix<SimdDouble, R, C, S1>, lane: usize, values: &Matrix<f64, R, C, S2>)
where
    R: Dim,
    C: Dim,
    S1: StorageMut<SimdDouble, R, C>,
    S2: Storage<f64, R, C>,
{
    assert_eq!(batched.shape(), values.shape());
    for (entry, value) in batched.iter_mut().zip(values.iter()) {
        entry.replace(lane, *value);
    }
}

/// Writes a scalar slice into one lane of a slice of batched values.
pub fn set_lane_slice(batched: &mut [SimdDouble], lane: usize, values: &[f64]) {
    assert_eq!(batched.len(), values.len());
    for (entry, value) in batched.iter_mut().zip(values) {
        entry.replace(lane, *value);
    }
}
