//! Time level bookkeeping and BDF coefficients consumed by kernels during setup.
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeScheme {
    #[default]
    BackwardEuler,
    /// Variable step second order backward differentiation. The first step falls back to
    /// backward Euler.
    Bdf2,
}

/// Current time step state.
///
/// The time derivative of a quantity `q` is approximated as
/// `(gamma_1 q^{n+1} + gamma_2 q^n + gamma_3 q^{n-1}) / dt`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeIntegrator {
    scheme: TimeScheme,
    time: f64,
    time_step: f64,
    previous_time_step: f64,
    step_count: usize,
}

impl TimeIntegrator {
    pub fn new(scheme: TimeScheme, time_step: f64) -> Self {
        Self {
            scheme,
            time: 0.0,
            time_step,
            previous_time_step: time_step,
            step_count: 0,
        }
    }

    /// Integrator for steady problems, with unit time step.
    pub fn steady() -> Self {
        Self::new(TimeScheme::BackwardEuler, 1.0)
    }

    pub fn scheme(&self) -> TimeScheme {
        self.scheme
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Completes the current step and sets the size of the next one.
    pub fn advance(&mut self, next_time_step: f64) {
        self.time += self.time_step;
        self.previous_time_step = self.time_step;
        self.time_step = next_time_step;
        self.step_count += 1;
    }

    /// The coefficients `[gamma_1, gamma_2, gamma_3]`.
    pub fn gammas(&self) -> [f64; 3] {
        match self.scheme {
            TimeScheme::Bdf2 if self.step_count > 0 => {
                let tau = self.time_step / self.previous_time_step;
                [
                    (1.0 + 2.0 * tau) / (1.0 + tau),
                    -(1.0 + tau),
                    tau * tau / (1.0 + tau),
                ]
            }
            _ => [1.0, -1.0, 0.0],
        }
    }
}
