//! Quadrature rules for the reference interval `[-1, 1]` and tensor products thereof.
//!
//! The rules are used by `cvfem` to integrate over sub-control volumes and sub-control
//! surfaces of high-order quadrilateral and hexahedral elements, but have no dependency on it.
//!
//! Rules are represented as a pair `(weights, points)`, and one-dimensional rules always
//! list their points in ascending order.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod tensor;
pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable => {
                write!(f, "There is no quadrature rule satisfying the requirements available")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A D-dimensional rule.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize, F>(rule: &Rule<D>, f: F) -> f64
where
    F: Fn(&Point<D>) -> f64,
{
    let (weights, points) = rule;
    weights
        .iter()
        .zip(points)
        .map(|(w, x)| w * f(x))
        .sum()
}
