use cvfem::nalgebra::DMatrix;
use matrixcompare::assert_matrix_eq;
use cvfem::simd::{
    extract_lane, set_lane, set_lane_slice, splat, zero, SimdComplexField, SimdDouble, SimdMatrix, SimdPartialOrd,
    SimdValue, SIMD_WIDTH,
};

fn lane_ramp() -> SimdDouble {
    let mut a = zero();
    for lane in 0..SIMD_WIDTH {
        a.replace(lane, lane as f64 + 1.0);
    }
    a
}

#[test]
fn lane_count_matches_batch_width() {
    assert_eq!(SimdDouble::lanes(), SIMD_WIDTH);
}

#[test]
fn arithmetic_is_lane_wise() {
    let a = lane_ramp();
    let b = splat(2.0);

    let sum = a + b;
    let product = a * b;
    let quotient = a / b;
    let scaled = splat(3.0) * a - splat(1.0);
    for lane in 0..SIMD_WIDTH {
        let x = lane as f64 + 1.0;
        assert_eq!(sum.extract(lane), x + 2.0);
        assert_eq!(product.extract(lane), 2.0 * x);
        assert_eq!(quotient.extract(lane), 0.5 * x);
        assert_eq!(scaled.extract(lane), 3.0 * x - 1.0);
        assert_eq!((-a).extract(lane), -x);
        assert_eq!(a.simd_sqrt().extract(lane), x.sqrt());
        assert_eq!(a.simd_min(b).extract(lane), x.min(2.0));
        assert_eq!(a.simd_max(b).extract(lane), x.max(2.0));
        assert_eq!(a.simd_powf(splat(1.5)).extract(lane), x.powf(1.5));
    }

    let mut c = a;
    c += b;
    c *= splat(2.0);
    c -= splat(1.0);
    c /= splat(0.5);
    assert_eq!(c.extract(0), 2.0 * (2.0 * 3.0 - 1.0));
}

#[test]
fn batched_matrix_product_matches_lane_products() {
    let lhs: Vec<DMatrix<f64>> = (0..SIMD_WIDTH)
        .map(|lane| DMatrix::from_fn(3, 2, |i, j| lane as f64 + 0.5 * i as f64 - j as f64))
        .collect();
    let rhs: Vec<DMatrix<f64>> = (0..SIMD_WIDTH)
        .map(|lane| DMatrix::from_fn(2, 4, |i, j| 1.0 + (lane * i) as f64 + 0.25 * j as f64))
        .collect();

    let mut batched_lhs = SimdMatrix::from_element(3, 2, zero());
    let mut batched_rhs = SimdMatrix::from_element(2, 4, zero());
    for lane in 0..SIMD_WIDTH {
        set_lane(&mut batched_lhs, lane, &lhs[lane]);
        set_lane(&mut batched_rhs, lane, &rhs[lane]);
    }

    let batched_product = &batched_lhs * &batched_rhs;
    let mut product = DMatrix::zeros(3, 4);
    for lane in 0..SIMD_WIDTH {
        extract_lane(&batched_product, lane, &mut product);
        let expected = &lhs[lane] * &rhs[lane];
        assert_matrix_eq!(product, expected, comp = abs, tol = 1e-12);
    }
}

#[test]
fn lanes_are_extracted_independently() {
    let mut batched = SimdMatrix::from_element(2, 3, zero());
    let lane_values: Vec<DMatrix<f64>> = (0..SIMD_WIDTH)
        .map(|lane| DMatrix::from_fn(2, 3, |i, j| (100 * lane + 10 * i + j) as f64))
        .collect();
    for (lane, values) in lane_values.iter().enumerate() {
        set_lane(&mut batched, lane, values);
    }

    let mut output = DMatrix::zeros(2, 3);
    for (lane, values) in lane_values.iter().enumerate() {
        extract_lane(&batched, lane, &mut output);
        assert_eq!(&output, values);
    }

    let mut entries = vec![zero(); 3];
    set_lane_slice(&mut entries, SIMD_WIDTH - 1, &[1.0, 2.0, 3.0]);
    assert_eq!(entries[2].extract(SIMD_WIDTH - 1), 3.0);
    assert_eq!(entries[2].extract(0), 0.0);
}
