use crate::reference_coordinates;
use cvfem::cvfem_quadrature::integrate;
use cvfem::cvfem_quadrature::tensor::{hexahedron_gauss, quadrilateral_gauss};
use cvfem::element::ElementDescription;
use cvfem::master_element::{
    locate_point, HigherOrderScs, HigherOrderScv, MasterElement, MasterElementRepository, PointLocationSettings,
};
use cvfem::nalgebra::{DMatrix, DVector};
use cvfem::proptest::{
    affine_element_coordinates, affine_field, perturbed_element_coordinates, point_in_box, AffineField,
    TensorPolynomial,
};
use cvfem::quadrature::QuadratureType;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use proptest::prelude::*;
use std::sync::Arc;

fn node_coordinates(coords: &DMatrix<f64>, node: usize) -> Vec<f64> {
    coords.column(node).iter().copied().collect()
}

/// A fixed polynomial with per-axis degree `degree` and non-trivial coefficients.
fn test_polynomial(dimension: usize, degree: usize) -> TensorPolynomial {
    let num_coefficients = (degree + 1).pow(dimension as u32);
    TensorPolynomial {
        dimension,
        degree,
        coefficients: (0..num_coefficients)
            .map(|i| (1.3 * i as f64 + 0.7).sin())
            .collect(),
    }
}

fn assert_volume_quadrature_consistency(dim: usize, order: usize, quadrature_type: QuadratureType) {
    let scv = HigherOrderScv::with_quadrature(dim, order, quadrature_type).unwrap();
    let description = scv.description().clone();
    let polynomial = test_polynomial(dim, order);
    let nodal_values = DVector::from_fn(description.nodes_per_element(), |node, _| {
        polynomial.evaluate(&description.node_location(node))
    });

    let interpolated = scv.shape_functions() * &nodal_values;
    let mut integrals = vec![0.0; description.nodes_per_element()];
    for ip in 0..scv.num_integration_points() {
        integrals[scv.ip_node_map()[ip]] += scv.ip_weights()[ip] * interpolated[ip];
    }

    let ends = scv.quadrature().scs_end_loc();
    for node in 0..description.nodes_per_element() {
        let index = description.tensor_index(node);
        let lower: Vec<_> = index.iter().map(|&i| ends[i]).collect();
        let upper: Vec<_> = index.iter().map(|&i| ends[i + 1]).collect();
        let exact = polynomial.integrate_box(&lower, &upper);
        assert_scalar_eq!(integrals[node], exact, comp = abs, tol = 1e-10);
    }

    // The sub-control volumes tile the element, so their sum is a whole-element rule
    let element_integral = match dim {
        2 => integrate(&quadrilateral_gauss(order + 1), |x| polynomial.evaluate(x)),
        _ => integrate(&hexahedron_gauss(order + 1), |x| polynomial.evaluate(x)),
    };
    let total: f64 = integrals.iter().sum();
    assert_scalar_eq!(total, element_integral, comp = abs, tol = 1e-10);
}

#[test]
fn volume_quadrature_consistency_quadrilateral() {
    for order in 1..=5 {
        assert_volume_quadrature_consistency(2, order, QuadratureType::GaussLegendre);
        assert_volume_quadrature_consistency(2, order, QuadratureType::GaussLobatto);
    }
}

#[test]
fn volume_quadrature_consistency_hexahedron() {
    for order in 1..=5 {
        assert_volume_quadrature_consistency(3, order, QuadratureType::GaussLegendre);
    }
}

#[test]
fn scv_integration_points_are_grouped_by_node() {
    let scv = HigherOrderScv::create(2, 3).unwrap();
    assert_eq!(scv.num_integration_points(), 16 * 9);
    let ip_node_map = scv.ip_node_map();
    assert!(ip_node_map.windows(2).all(|w| w[0] <= w[1]));
    for node in 0..16 {
        assert_eq!(ip_node_map.iter().filter(|&&n| n == node).count(), 9);
    }
    // Each integration point lies inside its sub-control volume
    let ends = scv.quadrature().scs_end_loc();
    for ip in 0..scv.num_integration_points() {
        let index = scv.description().tensor_index(ip_node_map[ip]);
        for (d, &xi) in scv.integration_location(ip).iter().enumerate() {
            assert!(ends[index[d]] < xi && xi < ends[index[d] + 1]);
        }
    }
}

#[test]
fn scv_volumes_of_affine_element_sum_to_element_volume() {
    let a = DMatrix::from_row_slice(3, 3, &[1.5, 0.2, 0.0, 0.1, 0.8, -0.1, 0.0, 0.3, 1.2]);
    let expected_volume = 8.0 * a.determinant();
    for order in 1..=3 {
        let scv = HigherOrderScv::create(3, order).unwrap();
        let reference = reference_coordinates(scv.description());
        let coords = &a * &reference;

        let mut volumes = vec![0.0; scv.nodes_per_element()];
        scv.sub_control_volumes(&coords, &mut volumes).unwrap();
        assert!(volumes.iter().all(|&v| v > 0.0));
        assert_scalar_eq!(volumes.iter().sum::<f64>(), expected_volume, comp = abs, tol = 1e-12);

        // Affine maps scale every sub-control volume uniformly
        let mut reference_volumes = vec![0.0; scv.nodes_per_element()];
        scv.sub_control_volumes(&reference, &mut reference_volumes).unwrap();
        for (v, v_ref) in volumes.iter().zip(&reference_volumes) {
            assert_scalar_eq!(*v, a.determinant() * v_ref, comp = abs, tol = 1e-12);
        }
    }
}

#[test]
fn scs_area_vectors_of_reference_element_sum_to_face_measure() {
    for dim in [2, 3] {
        for order in 1..=4 {
            let scs = HigherOrderScs::create(dim, order).unwrap();
            let coords = reference_coordinates(scs.description());
            let mut areas = DMatrix::zeros(dim, scs.num_integration_points());
            scs.area_vectors(&coords, &mut areas).unwrap();

            let face_measure = 2.0f64.powi(dim as i32 - 1);
            for d in 0..dim {
                for s in 0..order {
                    let surface = scs.quadrature().scs_loc()[s];
                    let mut total = DVector::zeros(dim);
                    for ip in 0..scs.num_integration_points() {
                        if scs.ip_directions()[ip] == d && scs.integration_location(ip)[d] == surface {
                            total += areas.column(ip);
                        }
                    }
                    let mut expected = DVector::zeros(dim);
                    expected[d] = face_measure;
                    assert_matrix_eq!(total, expected, comp = abs, tol = 1e-13);
                }
            }
        }
    }
}

#[test]
fn scs_adjacent_nodes_are_neighbors_along_surface_normal() {
    let scs = HigherOrderScs::create(3, 2).unwrap();
    let description = scs.description();
    assert_eq!(scs.num_integration_points(), 3 * 2 * 9 * 4);
    for (ip, [left, right]) in scs.adjacent_nodes().iter().enumerate() {
        let d = scs.ip_directions()[ip];
        let left_index = description.tensor_index(*left);
        let right_index = description.tensor_index(*right);
        for e in 0..3 {
            let expected_offset = if e == d { 1 } else { 0 };
            assert_eq!(right_index[e], left_index[e] + expected_offset);
        }
        assert_eq!(scs.ip_node_map()[ip], *left);
    }
}

#[test]
fn scs_surfaces_around_interior_nodes_are_closed() {
    let a = DMatrix::from_row_slice(3, 3, &[1.1, 0.3, -0.2, 0.0, 0.9, 0.1, 0.2, -0.1, 1.4]);
    for order in 2..=4 {
        let scs = HigherOrderScs::create(3, order).unwrap();
        let description = scs.description();
        let coords = &a * reference_coordinates(description);
        let mut areas = DMatrix::zeros(3, scs.num_integration_points());
        scs.area_vectors(&coords, &mut areas).unwrap();

        let mut net = DMatrix::zeros(3, description.nodes_per_element());
        for (ip, [left, right]) in scs.adjacent_nodes().iter().enumerate() {
            for i in 0..3 {
                net[(i, *left)] += areas[(i, ip)];
                net[(i, *right)] -= areas[(i, ip)];
            }
        }

        for node in 0..description.nodes_per_element() {
            let interior = description
                .tensor_index(node)
                .iter()
                .all(|&i| i != 0 && i != order);
            if interior {
                assert_matrix_eq!(net.column(node), DVector::<f64>::zeros(3), comp = abs, tol = 1e-12);
            }
        }
    }
}

#[test]
fn inverted_element_is_reported_but_outputs_are_written() {
    let scv = HigherOrderScv::create(2, 2).unwrap();
    let mut coords = reference_coordinates(scv.description());
    for x in coords.row_mut(0).iter_mut() {
        *x = -*x;
    }

    let field = AffineField {
        constant: 1.0,
        gradient: vec![2.0, -3.0],
    };
    let nodal_values = DVector::from_fn(scv.nodes_per_element(), |node, _| {
        field.evaluate(&node_coordinates(&coords, node))
    });

    let n_ip = scv.num_integration_points();
    let mut gradients = vec![DMatrix::zeros(2, scv.nodes_per_element()); n_ip];
    let mut det_j = vec![0.0; n_ip];
    let error = scv.grad_op(&coords, &mut gradients, &mut det_j).unwrap_err();
    assert_eq!(error.num_points, n_ip);
    assert_scalar_eq!(error.min_det_j, -1.0, comp = abs, tol = 1e-12);
    assert!(det_j.iter().all(|&det| (det + 1.0).abs() < 1e-12));
    for g in &gradients {
        assert_matrix_eq!(g * &nodal_values, DVector::from_vec(field.gradient.clone()), comp = abs, tol = 1e-10);
    }

    let scs = HigherOrderScs::create(2, 2).unwrap();
    let mut areas = DMatrix::zeros(2, scs.num_integration_points());
    assert!(scs.area_vectors(&coords, &mut areas).is_err());
    assert!(areas.iter().any(|&a| a != 0.0));
}

#[test]
fn point_far_outside_element_is_rejected() {
    for dim in [2, 3] {
        for order in 1..=5 {
            let scv = HigherOrderScv::create(dim, order).unwrap();
            let coords = reference_coordinates(scv.description());
            let location = scv.is_in_element(&coords, &vec![100.0; dim]);
            assert!(location.distance > 1.0 + 1e-8);
            assert!(!location.is_inside(1e-8));
        }
    }
}

#[test]
fn repository_caches_master_elements() {
    let repository = MasterElementRepository::new();
    let scv1 = repository.scv(3, 2, QuadratureType::GaussLegendre).unwrap();
    let scv2 = repository.scv(3, 2, QuadratureType::GaussLegendre).unwrap();
    let scv3 = repository.scv(3, 2, QuadratureType::GaussLobatto).unwrap();
    assert!(Arc::ptr_eq(&scv1, &scv2));
    assert!(!Arc::ptr_eq(&scv1, &scv3));

    let scs1 = repository.scs(2, 3, QuadratureType::GaussLegendre).unwrap();
    let scs2 = repository.scs(2, 3, QuadratureType::GaussLegendre).unwrap();
    assert!(Arc::ptr_eq(&scs1, &scs2));

    assert!(repository.scv(2, 0, QuadratureType::GaussLegendre).is_err());
    assert!(repository.scs(5, 1, QuadratureType::GaussLegendre).is_err());
}

/// Reference nodes moved by a smooth displacement, giving a curved but valid element.
fn smoothly_curved_hex(order: usize) -> DMatrix<f64> {
    let description = ElementDescription::create(3, order).unwrap();
    let reference = reference_coordinates(&description);
    DMatrix::from_fn(3, reference.ncols(), |i, node| {
        let x = reference.column(node);
        let j = (i + 1) % 3;
        x[i] + 0.05 * (1.3 * x[j] + 0.7 * i as f64).sin()
    })
}

#[test]
fn hex_point_location_and_grad_op_up_to_order_five() {
    let field = AffineField {
        constant: 0.5,
        gradient: vec![1.0, -2.0, 0.25],
    };
    let reference_points = [[0.0, 0.0, 0.0], [0.3, -0.7, 0.55], [-0.9, 0.85, -0.2]];
    for order in 1..=5 {
        let coords = smoothly_curved_hex(order);
        for xi in &reference_points {
            assert_locates_point(3, order, &coords, xi);
        }
        assert_grad_op_exact(&HigherOrderScv::create(3, order).unwrap(), &coords, &field);
        assert_grad_op_exact(&HigherOrderScs::create(3, order).unwrap(), &coords, &field);
    }
}

#[test]
fn exhausted_point_location_reports_last_iterate() {
    let scv = HigherOrderScv::create(3, 3).unwrap();
    let coords = smoothly_curved_hex(3);
    let xi = [0.3, -0.7, 0.55];
    let x = scv.interpolate_point(&xi, &coords);
    let settings = PointLocationSettings {
        max_iterations: 1,
        ..PointLocationSettings::default()
    };

    let location = locate_point(scv.basis(), &coords, x.as_slice(), &settings);
    assert!(!location.converged);
    assert_eq!(location.iterations, 1);
    let estimate = location
        .reference_point
        .iter()
        .fold(0.0f64, |norm, x| norm.max(x.abs()));
    assert_eq!(location.distance, estimate);
    assert!(location.is_inside(0.1));

    let collapsed = DMatrix::zeros(3, scv.nodes_per_element());
    let location = scv.is_in_element(&collapsed, &[0.5, 0.5, 0.5]);
    assert!(!location.converged);
    assert_eq!(location.distance, f64::MAX);
}

fn perturbed_element(dim: usize, max_order: usize, amplitude: f64) -> impl Strategy<Value = (usize, DMatrix<f64>)> {
    (1..=max_order).prop_flat_map(move |order| {
        let description = ElementDescription::create(dim, order).unwrap();
        (Just(order), perturbed_element_coordinates(description, amplitude))
    })
}

fn assert_locates_point(dim: usize, order: usize, coords: &DMatrix<f64>, xi: &[f64]) {
    let scv = HigherOrderScv::create(dim, order).unwrap();
    let x = scv.interpolate_point(xi, coords);
    let location = scv.is_in_element(coords, x.as_slice());
    assert!(location.converged);
    assert!(location.is_inside(1e-10));
    assert_matrix_eq!(
        DVector::from_vec(location.reference_point),
        DVector::from_column_slice(xi),
        comp = abs,
        tol = 1e-10
    );
}

fn assert_interpolates_affine_field(dim: usize, order: usize, coords: &DMatrix<f64>, field: &AffineField, xi: &[f64]) {
    let scv = HigherOrderScv::create(dim, order).unwrap();
    let nodal_values = DMatrix::from_fn(1, scv.nodes_per_element(), |_, node| {
        field.evaluate(&node_coordinates(coords, node))
    });
    let x = scv.interpolate_point(xi, coords);
    let value = scv.interpolate_point(xi, &nodal_values);
    assert_scalar_eq!(value[0], field.evaluate(x.as_slice()), comp = abs, tol = 1e-8);
}

fn assert_grad_op_exact(master_element: &dyn MasterElement, coords: &DMatrix<f64>, field: &AffineField) {
    let npe = master_element.nodes_per_element();
    let dim = master_element.dimension();
    let nodal_values = DVector::from_fn(npe, |node, _| field.evaluate(&node_coordinates(coords, node)));
    let n_ip = master_element.num_integration_points();
    let mut gradients = vec![DMatrix::zeros(dim, npe); n_ip];
    let mut det_j = vec![0.0; n_ip];
    master_element
        .grad_op(coords, &mut gradients, &mut det_j)
        .unwrap();

    let expected = DVector::from_vec(field.gradient.clone());
    for g in &gradients {
        assert_matrix_eq!(g * &nodal_values, expected, comp = abs, tol = 1e-8);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn point_location_recovers_reference_point_2d(
        (order, coords) in perturbed_element(2, 5, 0.2),
        xi in point_in_box(2, 0.125, 0.25)
    ) {
        assert_locates_point(2, order, &coords, &xi);
    }

    #[test]
    fn point_location_recovers_reference_point_3d(
        (order, coords) in perturbed_element(3, 5, 0.1),
        xi in point_in_box(3, 0.125, 0.25)
    ) {
        assert_locates_point(3, order, &coords, &xi);
    }

    #[test]
    fn point_location_in_affine_element(
        coords in affine_element_coordinates(ElementDescription::create(3, 2).unwrap()),
        xi in point_in_box(3, 0.125, 0.25)
    ) {
        assert_locates_point(3, 2, &coords, &xi);
    }

    #[test]
    fn interpolation_reproduces_affine_fields_2d(
        (order, coords) in perturbed_element(2, 5, 0.25),
        field in affine_field(2),
        xi in point_in_box(2, -1.0, 1.0)
    ) {
        assert_interpolates_affine_field(2, order, &coords, &field, &xi);
    }

    #[test]
    fn interpolation_reproduces_affine_fields_3d(
        (order, coords) in perturbed_element(3, 5, 0.25),
        field in affine_field(3),
        xi in point_in_box(3, -1.0, 1.0)
    ) {
        assert_interpolates_affine_field(3, order, &coords, &field, &xi);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn scv_grad_op_is_exact_for_affine_fields_on_perturbed_hex(
        (order, coords) in perturbed_element(3, 5, 0.1),
        field in affine_field(3)
    ) {
        let scv = HigherOrderScv::create(3, order).unwrap();
        assert_grad_op_exact(&scv, &coords, &field);
    }

    #[test]
    fn scs_grad_op_is_exact_for_affine_fields_on_perturbed_hex(
        (order, coords) in perturbed_element(3, 5, 0.1),
        field in affine_field(3)
    ) {
        let scs = HigherOrderScs::create(3, order).unwrap();
        assert_grad_op_exact(&scs, &coords, &field);
    }

    #[test]
    fn grad_op_is_exact_for_affine_fields_on_perturbed_quad(
        (order, coords) in perturbed_element(2, 5, 0.1),
        field in affine_field(2)
    ) {
        let scv = HigherOrderScv::create(2, order).unwrap();
        assert_grad_op_exact(&scv, &coords, &field);
    }
}
