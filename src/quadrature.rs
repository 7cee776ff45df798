//! Quadrature over the sub-control volumes of a tensor-product element.
//!
//! The interval `[-1, 1]` is partitioned into `order + 1` sub-control volumes, one per node,
//! whose interior boundaries are the Gauss-Legendre points of `order` points. These interlace
//! with the Gauss-Lobatto-Legendre nodes. Each sub-control volume carries its own 1D rule,
//! obtained by mapping a rule on `[-1, 1]` into it.
use crate::error::ElementError;
use cvfem_quadrature::univariate::{gauss, try_gauss_lobatto};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The 1D rule applied inside each sub-control volume.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuadratureType {
    /// `order` Gauss-Legendre points.
    #[default]
    GaussLegendre,
    /// `order + 1` Gauss-Lobatto-Legendre points, segmented per sub-control volume.
    GaussLobatto,
}

impl FromStr for QuadratureType {
    type Err = ElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GaussLegendre" => Ok(Self::GaussLegendre),
            "GaussLobatto" | "SGL" => Ok(Self::GaussLobatto),
            other => Err(ElementError::UnknownQuadratureRule(other.to_string())),
        }
    }
}

impl Display for QuadratureType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::GaussLegendre => write!(f, "GaussLegendre"),
            Self::GaussLobatto => write!(f, "GaussLobatto"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TensorProductQuadratureRule {
    quadrature_type: QuadratureType,
    order: usize,
    abscissae: Vec<f64>,
    weights: Vec<f64>,
    scs_loc: Vec<f64>,
    scs_end_loc: Vec<f64>,
}

impl TensorProductQuadratureRule {
    /// Constructs the rule from its name, see [`QuadratureType`].
    pub fn new(rule_name: &str, order: usize) -> Result<Self, ElementError> {
        Self::with_type(rule_name.parse()?, order)
    }

    /// Constructs the rule for a polynomial order. Each sub-control-volume rule integrates
    /// polynomials of degree `2 * order - 1` exactly.
    pub fn with_type(quadrature_type: QuadratureType, order: usize) -> Result<Self, ElementError> {
        if order < 1 {
            return Err(ElementError::InvalidOrder { dimension: 1, order });
        }

        let (weights, points) = match quadrature_type {
            QuadratureType::GaussLegendre => gauss(order),
            QuadratureType::GaussLobatto => try_gauss_lobatto(order + 1)
                .ok_or(ElementError::InvalidOrder { dimension: 1, order })?,
        };
        let abscissae = points.into_iter().map(|[x]| x).collect();

        let (_, boundaries) = gauss(order);
        let scs_loc: Vec<f64> = boundaries.into_iter().map(|[x]| x).collect();
        let scs_end_loc = std::iter::once(-1.0)
            .chain(scs_loc.iter().copied())
            .chain(std::iter::once(1.0))
            .collect();

        Ok(Self {
            quadrature_type,
            order,
            abscissae,
            weights,
            scs_loc,
            scs_end_loc,
        })
    }

    pub fn quadrature_type(&self) -> QuadratureType {
        self.quadrature_type
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of quadrature points per sub-control volume and dimension.
    pub fn num_quad(&self) -> usize {
        self.abscissae.len()
    }

    /// Abscissae of the underlying rule on `[-1, 1]`.
    pub fn abscissae(&self) -> &[f64] {
        &self.abscissae
    }

    /// Weights of the underlying rule on `[-1, 1]`.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Interior sub-control surface locations.
    pub fn scs_loc(&self) -> &[f64] {
        &self.scs_loc
    }

    /// Boundaries of the sub-control volumes, from -1 to 1.
    pub fn scs_end_loc(&self) -> &[f64] {
        &self.scs_end_loc
    }

    /// Location of quadrature point `gauss_ordinal` inside the sub-control volume of the node
    /// with 1D ordinal `node_ordinal`.
    pub fn gauss_point_location(&self, node_ordinal: usize, gauss_ordinal: usize) -> f64 {
        let left = self.scs_end_loc[node_ordinal];
        let right = self.scs_end_loc[node_ordinal + 1];
        0.5 * (right - left) * self.abscissae[gauss_ordinal] + 0.5 * (right + left)
    }

    /// Product of the mapped 1D weights in each direction.
    pub fn tensor_product_weight(&self, node_ordinals: &[usize], gauss_ordinals: &[usize]) -> f64 {
        assert_eq!(node_ordinals.len(), gauss_ordinals.len());
        node_ordinals
            .iter()
            .zip(gauss_ordinals)
            .map(|(&n, &q)| {
                let length = self.scs_end_loc[n + 1] - self.scs_end_loc[n];
                0.5 * length * self.weights[q]
            })
            .product()
    }
}
