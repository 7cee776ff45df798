//! Error types for element construction and per-element numerical pathologies.
use std::fmt;
use std::fmt::{Display, Formatter};

/// Structural errors raised while constructing element descriptions, bases, quadrature rules
/// or master elements.
///
/// These are fatal for the caller: nothing built from invalid arguments can be used.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ElementError {
    /// The polynomial order is zero or the dimension is not 2 or 3.
    InvalidOrder { dimension: usize, order: usize },
    /// The quadrature rule name is not recognized.
    UnknownQuadratureRule(String),
    /// Sizes of provided data do not match the element.
    DimensionMismatch { expected: usize, actual: usize },
}

impl Display for ElementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOrder { dimension, order } => write!(
                f,
                "Invalid element: dimension {dimension} with polynomial order {order} \
                 (dimension must be 2 or 3 and order at least 1)"
            ),
            Self::UnknownQuadratureRule(name) => write!(f, "Unknown quadrature rule \"{name}\""),
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for ElementError {}

/// Reported when one or more Jacobian determinants of an element are non-positive.
///
/// Output buffers are still fully written when this error is returned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegenerateElementError {
    /// Number of evaluation points with non-positive determinant.
    pub num_points: usize,
    /// The smallest determinant encountered.
    pub min_det_j: f64,
}

impl Display for DegenerateElementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Degenerate element: {} point(s) with non-positive Jacobian determinant (min {:e})",
            self.num_points, self.min_det_j
        )
    }
}

impl std::error::Error for DegenerateElementError {}

/// Accumulates degenerate element reports over a batch or an assembly pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementQualityReport {
    pub num_degenerate_elements: usize,
    pub min_det_j: f64,
}

impl Default for ElementQualityReport {
    fn default() -> Self {
        Self {
            num_degenerate_elements: 0,
            min_det_j: f64::INFINITY,
        }
    }
}

impl ElementQualityReport {
    pub fn record(&mut self, error: &DegenerateElementError) {
        self.num_degenerate_elements += 1;
        self.min_det_j = self.min_det_j.min(error.min_det_j);
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            num_degenerate_elements: self.num_degenerate_elements + other.num_degenerate_elements,
            min_det_j: self.min_det_j.min(other.min_det_j),
        }
    }

    pub fn has_degenerate_elements(&self) -> bool {
        self.num_degenerate_elements > 0
    }
}
