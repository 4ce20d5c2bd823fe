//! Piecewise-constant reference programs.

use serde::{Deserialize, Serialize};
use zl_core::Real;

/// A scheduled setpoint change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Time at which the new value takes effect (seconds).
    pub at: Real,
    /// Setpoint value from `at` onward.
    pub value: Real,
}

/// Piecewise-constant reference: an initial value plus scheduled steps.
///
/// Steps are applied in list order, so the last entry at or before the
/// query time wins. Entries are normally sorted by time, but an unsorted
/// list is still well-defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepProgram {
    /// Value before the first step.
    pub initial: Real,
    /// Scheduled steps.
    pub steps: Vec<Step>,
}

impl StepProgram {
    /// A program with no steps.
    pub fn constant(value: Real) -> Self {
        Self {
            initial: value,
            steps: Vec::new(),
        }
    }

    /// A program from an initial value and a step schedule.
    pub fn new(initial: Real, steps: Vec<Step>) -> Self {
        Self { initial, steps }
    }

    /// Reference value at time `t`.
    pub fn value_at(&self, t: Real) -> Real {
        let mut value = self.initial;
        for step in &self.steps {
            if t >= step.at {
                value = step.value;
            }
        }
        value
    }
}
