//! Discrete-time control primitives for zloop.
//!
//! This crate provides the two layers of the control loop:
//! - [`DiscreteBlock`]: a scalar discrete-time dynamical element
//!   (integrator, filtered derivative, first-order lag) advanced one sample
//!   per call under a selectable discretization scheme
//! - [`PidController`]: a sampled PID controller with output saturation and
//!   integral anti-windup via saturation back-propagation
//!
//! # Design principles
//!
//! - **Hidden state**: block and controller internals are private; the only
//!   mutations are the documented stepping operations
//! - **Exclusive ownership**: a controller owns its blocks outright, and a
//!   block belongs to exactly one owner; dropping the owner releases it
//! - **Fixed cadence**: all formulas assume the caller steps at the sample
//!   time fixed at construction
//! - **No validation**: inputs are plain numbers; degenerate configurations
//!   (e.g. a non-positive sample time) produce degenerate arithmetic, not
//!   errors

pub mod block;
pub mod pid;

pub use block::{BlockKind, DiscreteBlock, StepMethod};
pub use pid::{BackpropSettings, ConvergenceReport, PidController, PidParams};
