//! Solver options consumed when constructing algorithms and kernels.
use crate::master_element::{HigherOrderScs, HigherOrderScv, MasterElementRepository};
use crate::quadrature::QuadratureType;
use eyre::{eyre, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Constants of the one-equation subgrid-scale kinetic energy model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurbulenceConstants {
    pub c_eps: f64,
    pub tke_prod_limit_ratio: f64,
}

impl Default for TurbulenceConstants {
    fn default() -> Self {
        Self {
            c_eps: 0.845,
            tke_prod_limit_ratio: 10.0,
        }
    }
}

/// Constants of the manufactured thermal contact solution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalContactConstants {
    pub a: f64,
    pub k: f64,
}

impl Default for ThermalContactConstants {
    fn default() -> Self {
        Self { a: 1.0, k: 1.0 }
    }
}

/// How element batches are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Execution {
    Serial,
    /// Batches are distributed over the rayon thread pool. The order in which contributions
    /// are summed into the global system is not deterministic.
    #[default]
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolutionOptions {
    /// Diagonal relaxation factor per equation. Equations not listed use 1.0.
    pub relaxation_factors: BTreeMap<String, f64>,
    /// Equations that never apply diagonal relaxation, regardless of `relaxation_factors`.
    pub unrelaxed_equations: Vec<String>,
    pub turbulence: TurbulenceConstants,
    pub thermal_contact: ThermalContactConstants,
    pub quadrature: QuadratureType,
    pub execution: Execution,
}

impl Default for SolutionOptions {
    fn default() -> Self {
        Self {
            relaxation_factors: BTreeMap::new(),
            unrelaxed_equations: vec!["pressure".to_string()],
            turbulence: TurbulenceConstants::default(),
            thermal_contact: ThermalContactConstants::default(),
            quadrature: QuadratureType::default(),
            execution: Execution::default(),
        }
    }
}

/// Division of the diagonal of each local element matrix before scatter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DiagonalRelaxation {
    Disabled,
    Factor(f64),
}

impl DiagonalRelaxation {
    pub fn factor(value: f64) -> eyre::Result<Self> {
        if value.is_finite() && value > 0.0 {
            Ok(Self::Factor(value))
        } else {
            Err(eyre!("Relaxation factor must be positive and finite, got {value}"))
        }
    }
}

/// Per-equation settings of an element solver algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct EquationConfig {
    pub name: String,
    pub dofs_per_node: usize,
    pub relaxation: DiagonalRelaxation,
    pub execution: Execution,
}

impl EquationConfig {
    pub fn new(name: impl Into<String>, dofs_per_node: usize) -> Self {
        Self {
            name: name.into(),
            dofs_per_node,
            relaxation: DiagonalRelaxation::Factor(1.0),
            execution: Execution::default(),
        }
    }

    pub fn with_relaxation(self, relaxation: DiagonalRelaxation) -> Self {
        Self { relaxation, ..self }
    }

    pub fn with_execution(self, execution: Execution) -> Self {
        Self { execution, ..self }
    }
}

impl SolutionOptions {
    /// Resolves the settings of the named equation.
    pub fn equation(&self, name: &str, dofs_per_node: usize) -> eyre::Result<EquationConfig> {
        self.validate()?;
        if dofs_per_node == 0 {
            return Err(eyre!("Equation \"{name}\" must have at least one degree of freedom per node"));
        }
        let relaxation = if self.unrelaxed_equations.iter().any(|e| e == name) {
            DiagonalRelaxation::Disabled
        } else {
            let factor = self.relaxation_factors.get(name).copied().unwrap_or(1.0);
            DiagonalRelaxation::factor(factor)
                .wrap_err_with(|| format!("Invalid settings for equation \"{name}\""))?
        };
        Ok(EquationConfig::new(name, dofs_per_node)
            .with_relaxation(relaxation)
            .with_execution(self.execution))
    }

    /// Checks all configured values.
    pub fn validate(&self) -> eyre::Result<()> {
        for (name, &factor) in &self.relaxation_factors {
            DiagonalRelaxation::factor(factor)
                .wrap_err_with(|| format!("Invalid settings for equation \"{name}\""))?;
        }
        let TurbulenceConstants {
            c_eps,
            tke_prod_limit_ratio,
        } = self.turbulence;
        if !(c_eps > 0.0 && tke_prod_limit_ratio > 0.0) {
            return Err(eyre!("Turbulence constants must be positive"));
        }
        let ThermalContactConstants { a, k } = self.thermal_contact;
        if !(a.is_finite() && k.is_finite()) {
            return Err(eyre!("Thermal contact constants must be finite"));
        }
        Ok(())
    }

    /// The sub-control-volume master element with the configured quadrature.
    pub fn scv(
        &self,
        repository: &MasterElementRepository,
        dimension: usize,
        order: usize,
    ) -> eyre::Result<Arc<HigherOrderScv>> {
        Ok(repository.scv(dimension, order, self.quadrature)?)
    }

    /// The sub-control-surface master element with the configured quadrature.
    pub fn scs(
        &self,
        repository: &MasterElementRepository,
        dimension: usize,
        order: usize,
    ) -> eyre::Result<Arc<HigherOrderScs>> {
        Ok(repository.scs(dimension, order, self.quadrature)?)
    }
}
