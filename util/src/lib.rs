/// Poor man's approx assertion for matrices
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = $x - $y;

        let max_absdiff = diff.abs().max();
        let approx_eq = max_absdiff <= $tol;

        if !approx_eq {
            println!("abstol: {:e}", $tol);
            println!("left: {}", $x);
            println!("right: {}", $y);
            println!("diff: {:e}", diff);
        }
        assert!(approx_eq);
    }};
}

/// Integral of the monomial `x^alpha` over the interval `[a, b]`.
pub fn monomial_integral(alpha: i32, a: f64, b: f64) -> f64 {
    let p = alpha + 1;
    (b.powi(p) - a.powi(p)) / p as f64
}
