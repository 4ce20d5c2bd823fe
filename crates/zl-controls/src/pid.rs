//! Sampled PID controller with saturation back-propagation anti-windup.
//!
//! The controller owns two [`DiscreteBlock`]s: an integrator and a filtered
//! derivative. Each update computes the proportional, integral, and
//! derivative products of the error, steps the derivative block once, and
//! then resolves the anti-windup algebraic loop.
//!
//! The algebraic loop: the back-propagation term is proportional to the
//! amount the unsaturated sum exceeded the output limits, yet it must feed
//! the integrator's input on the very sample it is produced. Since the
//! integrator is stateful and single-shot per forward step, the loop is
//! solved by fixed-point iteration — rewind the integrator with
//! [`DiscreteBlock::back_step`], re-drive it with the corrected input, and
//! repeat until the term stabilizes or the iteration cap is reached.

use serde::{Deserialize, Serialize};
use zl_core::Real;

use crate::block::{BlockKind, DiscreteBlock, StepMethod};

/// PID controller configuration.
///
/// A plain value: copied in at creation, replaced wholesale by
/// [`PidController::set_params`], never partially mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidParams {
    /// Proportional gain.
    pub kp: Real,
    /// Integral gain.
    pub ki: Real,
    /// Derivative gain.
    pub kd: Real,
    /// Back-propagation gain (integral anti-windup).
    pub kb: Real,
    /// Derivative filter bandwidth N.
    pub filter: Real,
    /// Output minimum (saturation).
    pub output_min: Real,
    /// Output maximum (saturation).
    pub output_max: Real,
    /// Sample time in seconds.
    pub sample_time: Real,
    /// Integrator initial condition.
    pub integral_init: Real,
    /// Derivative initial condition.
    pub derivative_init: Real,
    /// Integrator discretization method.
    pub integral_method: StepMethod,
    /// Derivative discretization method.
    pub derivative_method: StepMethod,
}

/// Settings for the anti-windup fixed-point loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackpropSettings {
    /// Stop once the back-propagation term changes by no more than this
    /// between iterations.
    pub tolerance: Real,
    /// Hard iteration cap. Hitting it is not an error; the last computed
    /// output is returned as-is.
    pub max_iters: usize,
}

impl Default for BackpropSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_iters: 1000,
        }
    }
}

/// Outcome of the most recent anti-windup solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceReport {
    /// Iterations used by the last update.
    pub iterations: usize,
    /// Absolute change of the back-propagation term on the last iteration.
    pub last_delta: Real,
    /// False when the iteration cap cut the solve short.
    pub converged: bool,
}

/// Sampled PID controller.
///
/// Owns its integrator and derivative blocks exclusively; they are never
/// exposed to the caller. Per-sample signals (error, gain products,
/// saturation intermediates) are scratch values recomputed on every update.
/// The back-propagation term is the one signal that persists between
/// samples: it seeds the first iteration of the next update's fixed-point
/// loop. Dropping the controller releases both blocks.
#[derive(Debug, Clone)]
pub struct PidController {
    params: PidParams,
    backprop: BackpropSettings,
    integrator: DiscreteBlock,
    derivative: DiscreteBlock,
    backprop_term: Real,
    last_report: ConvergenceReport,
    ticks: u64,
}

impl PidController {
    /// Build a controller from `params`.
    ///
    /// The integrator block gets gain 1.0 (the integral gain scales the
    /// block's input instead), initial state `params.integral_init`, and
    /// `params.integral_method`; the derivative block gets the filter
    /// bandwidth, `params.derivative_init`, and `params.derivative_method`.
    /// Both share `params.sample_time`.
    pub fn new(params: PidParams) -> Self {
        let integrator = DiscreteBlock::new(
            params.integral_init,
            params.sample_time,
            BlockKind::Integrator { gain: 1.0 },
            params.integral_method,
        );
        let derivative = DiscreteBlock::new(
            params.derivative_init,
            params.sample_time,
            BlockKind::Derivative {
                filter: params.filter,
            },
            params.derivative_method,
        );
        Self {
            params,
            backprop: BackpropSettings::default(),
            integrator,
            derivative,
            backprop_term: 0.0,
            last_report: ConvergenceReport {
                iterations: 0,
                last_delta: 0.0,
                converged: true,
            },
            ticks: 0,
        }
    }

    /// Replace the anti-windup loop settings.
    pub fn with_backprop(mut self, settings: BackpropSettings) -> Self {
        self.backprop = settings;
        self
    }

    /// Current configuration.
    pub fn params(&self) -> PidParams {
        self.params
    }

    /// Replace the configuration wholesale.
    ///
    /// The internal blocks are neither rebuilt nor reset: fields read on
    /// every update (gains, output limits) take effect on the next call,
    /// while fields baked into the blocks at construction (sample time,
    /// methods, filter bandwidth, initial conditions) leave the blocks
    /// continuing uninterrupted on their previous trajectory.
    pub fn set_params(&mut self, params: PidParams) {
        self.params = params;
    }

    /// Anti-windup loop settings in effect.
    pub fn backprop_settings(&self) -> BackpropSettings {
        self.backprop
    }

    /// Number of completed updates.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Diagnostic for the most recent update's fixed-point solve.
    pub fn last_convergence(&self) -> ConvergenceReport {
        self.last_report
    }

    /// Advance the controller one sample: compute the error between
    /// `target` and `measured` and return the saturated control output.
    pub fn update(&mut self, target: Real, measured: Real) -> Real {
        let p = self.params;
        let error = target - measured;

        let p_out = p.kp * error;
        let i_out = p.ki * error;
        let d_out = p.kd * error;

        // The derivative path feeds straight from the error; one step per
        // sample, outside the loop below.
        let deriv_out = self.derivative.forward_step(d_out);

        let mut output;
        let mut delta;
        let mut iterations = 0;
        loop {
            let backprop_prev = self.backprop_term;

            // Rewind the integrator after the first pass so the sample is
            // replayed with the corrected input.
            if iterations > 0 {
                self.integrator.back_step();
            }
            let int_out = self.integrator.forward_step(i_out + backprop_prev);

            let pre_sat = p_out + int_out + deriv_out;
            output = saturate(pre_sat, p.output_min, p.output_max);
            self.backprop_term = p.kb * (output - pre_sat);

            iterations += 1;
            delta = (self.backprop_term - backprop_prev).abs();
            if delta <= self.backprop.tolerance || iterations >= self.backprop.max_iters {
                break;
            }
        }

        let converged = delta <= self.backprop.tolerance;
        if !converged {
            tracing::debug!(iterations, delta, "anti-windup loop stopped at iteration cap");
        }
        self.last_report = ConvergenceReport {
            iterations,
            last_delta: delta,
            converged,
        };

        self.ticks += 1;
        output
    }
}

// Explicit comparisons rather than `f64::clamp`: the bounds are a caller
// contract that may be equal or even inverted, and `clamp` panics on an
// inverted range.
fn saturate(value: Real, lo: Real, hi: Real) -> Real {
    if value > hi {
        hi
    } else if value < lo {
        lo
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zl_core::Tolerances;

    fn tol() -> Tolerances {
        Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        }
    }

    fn base_params() -> PidParams {
        PidParams {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            kb: 0.0,
            filter: 100.0,
            output_min: -1e6,
            output_max: 1e6,
            sample_time: 0.1,
            integral_init: 0.0,
            derivative_init: 0.0,
            integral_method: StepMethod::BackwardEuler,
            derivative_method: StepMethod::Trapezoidal,
        }
    }

    #[test]
    fn proportional_only_scales_the_error() {
        let mut pid = PidController::new(PidParams {
            kp: 2.0,
            ..base_params()
        });
        let out = pid.update(1.0, 0.5);
        assert!(tol().close(out, 1.0));
        assert_eq!(pid.ticks(), 1);
    }

    #[test]
    fn integral_accumulates_across_updates() {
        let mut pid = PidController::new(PidParams {
            ki: 1.0,
            ..base_params()
        });
        // Backward Euler, unit gain block: each update adds Ts * Ki * error.
        assert!(tol().close(pid.update(1.0, 0.0), 0.1));
        assert!(tol().close(pid.update(1.0, 0.0), 0.2));
        assert!(tol().close(pid.update(1.0, 0.0), 0.3));
    }

    #[test]
    fn derivative_path_matches_a_standalone_block() {
        // Kd-only controller with wide bounds: the output is exactly the
        // derivative block's trajectory driven by Kd * error.
        let mut pid = PidController::new(PidParams {
            kd: 2.0,
            derivative_method: StepMethod::BackwardEuler,
            ..base_params()
        });
        let mut reference = DiscreteBlock::new(
            0.0,
            0.1,
            BlockKind::Derivative { filter: 100.0 },
            StepMethod::BackwardEuler,
        );
        for i in 0..5 {
            let error = i as Real * 0.5;
            let out = pid.update(error, 0.0);
            let expected = reference.forward_step(2.0 * error);
            assert!(tol().close(out, expected));
        }
    }

    #[test]
    fn saturation_pins_output_when_bounds_coincide() {
        let mut pid = PidController::new(PidParams {
            kp: 10.0,
            ki: 3.0,
            kd: 2.0,
            kb: 0.1,
            output_min: 5.0,
            output_max: 5.0,
            ..base_params()
        });
        for (target, measured) in [(100.0, 0.0), (-50.0, 20.0), (0.0, 0.0)] {
            assert_eq!(pid.update(target, measured), 5.0);
        }
    }

    #[test]
    fn zero_backprop_gain_converges_in_one_iteration() {
        let mut pid = PidController::new(PidParams {
            kp: 1.0,
            ki: 5.0,
            output_min: -1.0,
            output_max: 1.0,
            ..base_params()
        });
        for _ in 0..10 {
            pid.update(10.0, 0.0);
            let report = pid.last_convergence();
            assert_eq!(report.iterations, 1);
            assert!(report.converged);
            assert_eq!(report.last_delta, 0.0);
        }
    }

    #[test]
    fn backprop_iterates_until_the_term_stabilizes() {
        // Heavy integral action into a tight saturation band: the
        // back-propagation term contracts by |kb| per pass.
        let mut pid = PidController::new(PidParams {
            ki: 100.0,
            kb: 0.5,
            output_min: 0.0,
            output_max: 1.0,
            sample_time: 1.0,
            ..base_params()
        });
        let out = pid.update(1.0, 0.0);
        let report = pid.last_convergence();
        assert_eq!(out, 1.0);
        assert!(report.converged);
        assert!(report.iterations > 1);
        assert!(report.last_delta <= pid.backprop_settings().tolerance);
    }

    #[test]
    fn iteration_cap_bounds_a_diverging_loop() {
        // |kb| > 1 makes the fixed-point map expansive; the loop must stop
        // at the cap and report non-convergence instead of hanging.
        let mut pid = PidController::new(PidParams {
            ki: 100.0,
            kb: 2.0,
            output_min: 0.0,
            output_max: 1.0,
            sample_time: 1.0,
            ..base_params()
        })
        .with_backprop(BackpropSettings {
            tolerance: 1e-3,
            max_iters: 25,
        });
        let out = pid.update(1.0, 0.0);
        let report = pid.last_convergence();
        assert!(!report.converged);
        assert_eq!(report.iterations, 25);
        // Still a saturated value, just a precision compromise.
        assert!((0.0..=1.0).contains(&out));
    }

    #[test]
    fn set_params_keeps_block_state() {
        let mut pid = PidController::new(PidParams {
            ki: 1.0,
            ..base_params()
        });
        assert!(tol().close(pid.update(1.0, 0.0), 0.1));
        assert!(tol().close(pid.update(1.0, 0.0), 0.2));

        // Doubling Ki doubles the integrator's input from here on; the
        // accumulated state is untouched.
        let mut params = pid.params();
        params.ki = 2.0;
        pid.set_params(params);
        assert!(tol().close(pid.update(1.0, 0.0), 0.4));
    }

    #[test]
    fn set_params_does_not_rebuild_blocks() {
        let mut pid = PidController::new(PidParams {
            ki: 1.0,
            ..base_params()
        });
        pid.update(1.0, 0.0);

        // A changed integral method only affects the stored configuration;
        // the existing block keeps stepping with its construction-time
        // method.
        let mut params = pid.params();
        params.integral_method = StepMethod::ForwardEuler;
        pid.set_params(params);
        assert!(tol().close(pid.update(1.0, 0.0), 0.2));
        assert_eq!(pid.params().integral_method, StepMethod::ForwardEuler);
    }

    #[test]
    fn identical_runs_are_bit_identical() {
        let run = || {
            let mut pid = PidController::new(PidParams {
                kp: 1.0,
                ki: 5.0,
                kd: 1.0,
                kb: 0.1,
                output_min: 0.0,
                output_max: 100.0,
                sample_time: 0.001,
                integral_method: StepMethod::Trapezoidal,
                ..base_params()
            });
            let mut outputs = Vec::new();
            let mut measured = 0.0;
            for i in 0..200 {
                let target = if i >= 50 { 100.0 } else { 0.0 };
                let out = pid.update(target, measured);
                // Crude plant stand-in to exercise the feedback path.
                measured = 0.99 * measured + 0.01 * out;
                outputs.push(out);
            }
            outputs
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn saturate_handles_equal_and_inverted_bounds() {
        assert_eq!(saturate(3.0, 0.0, 1.0), 1.0);
        assert_eq!(saturate(-3.0, 0.0, 1.0), 0.0);
        assert_eq!(saturate(0.5, 0.0, 1.0), 0.5);
        assert_eq!(saturate(0.5, 2.0, 2.0), 2.0);
        // Inverted bounds: upper check wins first, mirroring the explicit
        // comparison order.
        assert_eq!(saturate(5.0, 2.0, 1.0), 1.0);
    }
}
