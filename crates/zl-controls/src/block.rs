//! Discrete-time signal blocks.
//!
//! A [`DiscreteBlock`] is a scalar first-order discrete system advanced one
//! sample per call. It knows nothing about control loops; the PID controller
//! composes two of these, and the same type serves as a plant model on the
//! simulation side.
//!
//! The state layout follows the one-step-ahead convention: after a forward
//! step, the block holds the state it will commit on the *next* step. That
//! pending state is the only value that persists meaning across samples,
//! and [`DiscreteBlock::back_step`] rewinds exactly that prediction so a
//! sample can be replayed with a different input.

use serde::{Deserialize, Serialize};
use zl_core::Real;

/// Numerical scheme used to discretize a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepMethod {
    /// Ideal (unfiltered) form. Only meaningful for derivative blocks;
    /// other kinds treat it as their fallback row.
    Standard,
    /// Forward Euler. Best for small sample times; large sample times can
    /// lead to instability.
    ForwardEuler,
    /// Backward Euler. Stable whenever the corresponding continuous-time
    /// system is stable.
    BackwardEuler,
    /// Trapezoidal. Closest match in the frequency domain to the
    /// corresponding continuous-time system; stable whenever it is.
    Trapezoidal,
}

/// Block kind together with its kind-specific parameter.
///
/// Each variant carries the one coefficient its stepping formulas read:
/// an output multiplier for the integrator, the filter bandwidth `N` for
/// the derivative (as `N` grows the behavior approaches the ideal
/// unfiltered derivative), and a time constant in seconds for the
/// first-order lag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlockKind {
    /// Discrete integrator with output multiplier `gain`.
    Integrator { gain: Real },
    /// Filtered derivative with bandwidth `filter`.
    Derivative { filter: Real },
    /// First-order lag with time constant `tau` (seconds).
    FirstOrder { tau: Real },
}

/// A scalar discrete-time dynamical element.
///
/// Created with a fixed sample time, kind, and method; mutated only by
/// [`forward_step`](Self::forward_step), [`back_step`](Self::back_step),
/// and [`reset`](Self::reset). Dropping the block releases it.
///
/// The sample time is a caller contract: it must be positive and equal to
/// the cadence at which `forward_step` is called. It is not validated, and
/// a degenerate value yields well-defined but degenerate arithmetic (for a
/// first-order block, `tau + sample_time` near zero divides by a near-zero
/// denominator).
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteBlock {
    input_k: Real,
    output_k: Real,
    state_k: Real,
    state_next: Real,
    initial_state: Real,
    sample_time: Real,
    kind: BlockKind,
    method: StepMethod,
}

impl DiscreteBlock {
    /// Create a block holding `initial_state` as its pending state; all
    /// other signals start at zero.
    pub fn new(
        initial_state: Real,
        sample_time: Real,
        kind: BlockKind,
        method: StepMethod,
    ) -> Self {
        Self {
            input_k: 0.0,
            output_k: 0.0,
            state_k: 0.0,
            state_next: initial_state,
            initial_state,
            sample_time,
            kind,
            method,
        }
    }

    /// Advance one sample: commit the pending state, apply the stepping
    /// formula for this `(kind, method)`, and return the output at the
    /// current sample.
    pub fn forward_step(&mut self, input: Real) -> Real {
        self.input_k = input;
        self.state_k = self.state_next;

        let (output, state_next) = match self.kind {
            BlockKind::Integrator { gain } => self.step_integrator(gain),
            BlockKind::Derivative { filter } => self.step_derivative(filter),
            BlockKind::FirstOrder { tau } => self.step_first_order(tau),
        };

        self.output_k = output;
        self.state_next = state_next;
        self.output_k
    }

    /// Discard the pending prediction and rewind to "about to repeat this
    /// sample". The committed state, input, and output are untouched.
    pub fn back_step(&mut self) {
        self.state_next = self.state_k;
    }

    /// Restore the initial condition, zeroing every other signal. The next
    /// forward step behaves as on a freshly created block.
    pub fn reset(&mut self) {
        self.input_k = 0.0;
        self.output_k = 0.0;
        self.state_k = 0.0;
        self.state_next = self.initial_state;
    }

    /// Output at the most recent sample.
    pub fn output(&self) -> Real {
        self.output_k
    }

    /// Input at the most recent sample.
    pub fn input(&self) -> Real {
        self.input_k
    }

    /// Committed state at the most recent sample.
    pub fn state(&self) -> Real {
        self.state_k
    }

    /// Sample time in seconds, fixed at creation.
    pub fn sample_time(&self) -> Real {
        self.sample_time
    }

    /// Block kind and its parameter.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Discretization method requested at creation. Stored even for kinds
    /// that do not consult it.
    pub fn method(&self) -> StepMethod {
        self.method
    }

    fn step_integrator(&self, gain: Real) -> (Real, Real) {
        let ts = self.sample_time;
        let u = self.input_k;
        let x = self.state_k;
        match self.method {
            StepMethod::ForwardEuler => (x, x + gain * ts * u),
            StepMethod::BackwardEuler => {
                let y = x + gain * ts * u;
                (y, y)
            }
            StepMethod::Trapezoidal => {
                let y = x + gain * ts / 2.0 * u;
                (y, y + gain * ts / 2.0 * u)
            }
            // No integral meaning for the ideal form: pass the input
            // through and hold the state.
            StepMethod::Standard => (u, x),
        }
    }

    fn step_derivative(&self, filter: Real) -> (Real, Real) {
        let ts = self.sample_time;
        let u = self.input_k;
        let x = self.state_k;
        let n = filter;
        match self.method {
            StepMethod::Standard => ((1.0 / ts) * u + x, (-1.0 / ts) * u),
            StepMethod::ForwardEuler => {
                let y = x + n * u;
                (y, (1.0 - n * ts) * y - n * u)
            }
            StepMethod::BackwardEuler => {
                let y = n / (1.0 + n * ts) * u + x;
                (y, (y - n * u) / (1.0 + n * ts))
            }
            StepMethod::Trapezoidal => {
                let y = 2.0 * n / (2.0 + n * ts) * u + x;
                (y, ((1.0 - n * ts / 2.0) * y - n * u) / (1.0 + n * ts / 2.0))
            }
        }
    }

    // Single fixed formula; the stored method is deliberately not consulted
    // for this kind.
    fn step_first_order(&self, tau: Real) -> (Real, Real) {
        let ts = self.sample_time;
        let u = self.input_k;
        let x = self.state_k;
        let y = ts / (tau + ts) * u + x;
        (y, tau / (tau + ts) * y)
    }
}
