use cvfem::basis::LagrangeBasis;
use cvfem::element::ElementDescription;
use cvfem::nalgebra::{DMatrix, DVector};
use cvfem::proptest::{point_near_reference_domain, tensor_polynomial, TensorPolynomial};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use proptest::prelude::*;

fn basis_for(dim: usize, order: usize) -> (ElementDescription, LagrangeBasis) {
    let description = ElementDescription::create(dim, order).unwrap();
    let basis = LagrangeBasis::from_description(&description);
    (description, basis)
}

fn order_and_point(dim: usize) -> impl Strategy<Value = (usize, Vec<f64>)> {
    (1..=5usize, point_near_reference_domain(dim))
}

fn polynomial_and_point(dim: usize) -> impl Strategy<Value = (TensorPolynomial, Vec<f64>)> {
    (1..=5usize).prop_flat_map(move |order| (tensor_polynomial(dim, order), point_near_reference_domain(dim)))
}

fn assert_reproduces_polynomial(polynomial: &TensorPolynomial, xi: &[f64]) {
    let (description, basis) = basis_for(polynomial.dimension, polynomial.degree);
    let nodal_values = DVector::from_fn(description.nodes_per_element(), |node, _| {
        polynomial.evaluate(&description.node_location(node))
    });

    let mut phi = vec![0.0; basis.num_nodes()];
    basis.populate_basis(&mut phi, xi);
    let interpolated = DVector::from_column_slice(&phi).dot(&nodal_values);
    assert_scalar_eq!(interpolated, polynomial.evaluate(xi), comp = abs, tol = 1e-10);

    let mut gradients = DMatrix::zeros(polynomial.dimension, basis.num_nodes());
    basis.populate_basis_gradients(&mut gradients, xi);
    let gradient = gradients * nodal_values;
    let expected = DVector::from_vec(polynomial.gradient(xi));
    assert_matrix_eq!(gradient, expected, comp = abs, tol = 1e-9);
}

#[test]
fn basis_is_kronecker_delta_at_nodes() {
    for dim in [2, 3] {
        for order in 1..=4 {
            let (description, basis) = basis_for(dim, order);
            let npe = description.nodes_per_element();
            let points: Vec<f64> = (0..npe)
                .flat_map(|node| description.node_location(node))
                .collect();
            let weights = basis.eval_basis_weights(&points);
            assert_matrix_eq!(weights, DMatrix::<f64>::identity(npe, npe), comp = abs, tol = 1e-12);
        }
    }
}

#[test]
fn lagrange_1d_derivative_matches_finite_difference() {
    let (_, basis) = basis_for(2, 4);
    let h = 1e-6;
    for j in 0..5 {
        for &x in &[-0.9, -0.31, 0.0, 0.42, 0.77] {
            let fd = (basis.lagrange_1d(j, x + h) - basis.lagrange_1d(j, x - h)) / (2.0 * h);
            assert_scalar_eq!(basis.lagrange_deriv_1d(j, x), fd, comp = abs, tol = 1e-7);
        }
    }
}

#[test]
fn eval_weights_match_pointwise_evaluation() {
    let (_, basis) = basis_for(3, 2);
    let points = [0.1, -0.2, 0.3, -0.7, 0.5, 0.9];
    let weights = basis.eval_basis_weights(&points);
    let derivs = basis.eval_deriv_weights(&points);
    assert_eq!(weights.shape(), (2, 27));
    assert_eq!(derivs.len(), 2);

    for (p, xi) in points.chunks_exact(3).enumerate() {
        let mut phi = vec![0.0; 27];
        basis.populate_basis(&mut phi, xi);
        let mut gradients = DMatrix::zeros(3, 27);
        basis.populate_basis_gradients(&mut gradients, xi);
        assert_matrix_eq!(weights.row(p).transpose(), DVector::from_vec(phi), comp = float);
        assert_matrix_eq!(derivs[p], gradients, comp = float);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn partition_of_unity_2d((order, xi) in order_and_point(2)) {
        let (_, basis) = basis_for(2, order);
        let mut phi = vec![0.0; basis.num_nodes()];
        basis.populate_basis(&mut phi, &xi);
        assert_scalar_eq!(phi.iter().sum::<f64>(), 1.0, comp = abs, tol = 1e-10);

        let mut gradients = DMatrix::zeros(2, basis.num_nodes());
        basis.populate_basis_gradients(&mut gradients, &xi);
        let row_sums = gradients.column_sum();
        assert_matrix_eq!(row_sums, DVector::<f64>::zeros(2), comp = abs, tol = 1e-9);
    }

    #[test]
    fn partition_of_unity_3d((order, xi) in order_and_point(3)) {
        let (_, basis) = basis_for(3, order);
        let mut phi = vec![0.0; basis.num_nodes()];
        basis.populate_basis(&mut phi, &xi);
        assert_scalar_eq!(phi.iter().sum::<f64>(), 1.0, comp = abs, tol = 1e-10);

        let mut gradients = DMatrix::zeros(3, basis.num_nodes());
        basis.populate_basis_gradients(&mut gradients, &xi);
        let row_sums = gradients.column_sum();
        assert_matrix_eq!(row_sums, DVector::<f64>::zeros(3), comp = abs, tol = 1e-9);
    }

    #[test]
    fn polynomials_of_element_order_are_reproduced_2d((polynomial, xi) in polynomial_and_point(2)) {
        assert_reproduces_polynomial(&polynomial, &xi);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn polynomials_of_element_order_are_reproduced_3d((polynomial, xi) in polynomial_and_point(3)) {
        assert_reproduces_polynomial(&polynomial, &xi);
    }
}
