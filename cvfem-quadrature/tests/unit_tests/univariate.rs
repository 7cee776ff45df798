use cvfem_quadrature::integrate;
use cvfem_quadrature::univariate::{gauss, gauss_lobatto, try_gauss_lobatto};
use cvfem_quadrature::Error;

use matrixcompare::assert_scalar_eq;

fn monomial_integral(alpha: i32) -> f64 {
    (1.0 - (-1.0f64).powi(alpha + 1)) / (alpha as f64 + 1.0)
}

#[test]
fn gauss_rules_satisfy_expected_accuracy() {
    for n in 1..=200 {
        let expected_polynomial_degree = 2 * n - 1;
        let rule = gauss(n);

        // Also test that weights are positive
        assert!(rule.0.iter().all(|&w| w > 0.0));

        // Integrate all monomials of degree <= expected polynomial degree that can be
        // exactly integrated
        for alpha in 0..=expected_polynomial_degree as i32 {
            let monomial = |x: f64| x.powi(alpha);
            let estimated_integral = integrate(&rule, |x| monomial(x[0]));

            assert_scalar_eq!(estimated_integral, monomial_integral(alpha), comp = abs, tol = 1e-14);
        }
    }
}

#[test]
fn gauss_points_are_strictly_ascending_and_symmetric() {
    for n in 1..=50 {
        let (_, points) = gauss(n);
        assert!(points.windows(2).all(|w| w[0][0] < w[1][0]));
        for i in 0..n {
            assert_scalar_eq!(points[i][0], -points[n - i - 1][0], comp = abs, tol = 1e-15);
        }
    }
}

#[test]
fn gauss_lobatto_rules_satisfy_expected_accuracy() {
    assert!(try_gauss_lobatto(0).is_none());
    assert!(try_gauss_lobatto(1).is_none());
    assert_eq!(gauss_lobatto(1), Err(Error::NoRuleAvailable));

    for n in 2..=32 {
        let expected_polynomial_degree = 2 * n - 3;
        let rule = try_gauss_lobatto(n).unwrap();

        // Check that rule contains endpoints, like Gauss-Lobatto should
        assert_eq!(rule.1.first().unwrap(), &[-1.0]);
        assert_eq!(rule.1.last().unwrap(), &[1.0]);
        assert!(rule.1.windows(2).all(|w| w[0][0] < w[1][0]));

        // Also test that weights are positive
        assert!(rule.0.iter().all(|&w| w > 0.0));

        for alpha in 0..=expected_polynomial_degree as i32 {
            let monomial = |x: f64| x.powi(alpha);
            let estimated_integral = integrate(&rule, |x| monomial(x[0]));

            assert_scalar_eq!(estimated_integral, monomial_integral(alpha), comp = abs, tol = 1e-13);
        }
    }
}

#[test]
fn gauss_lobatto_low_order_rules_match_closed_form() {
    let (weights, points) = gauss_lobatto(3).unwrap();
    assert_eq!(points.len(), 3);
    assert_scalar_eq!(points[1][0], 0.0, comp = abs, tol = 1e-15);
    assert_scalar_eq!(weights[0], 1.0 / 3.0, comp = abs, tol = 1e-15);
    assert_scalar_eq!(weights[1], 4.0 / 3.0, comp = abs, tol = 1e-15);

    let (_, points) = gauss_lobatto(4).unwrap();
    assert_scalar_eq!(points[2][0], (1.0f64 / 5.0).sqrt(), comp = abs, tol = 1e-15);
}
