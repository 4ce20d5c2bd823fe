//! Closed-loop simulation driver for zloop controllers.
//!
//! Provides:
//! - Piecewise-constant reference programs (step schedules)
//! - Fixed-step closed-loop runner connecting a controller to a plant block
//! - Recorded time series with decimation

pub mod error;
pub mod program;
pub mod runner;

// Re-exports for public API
pub use error::{SimError, SimResult};
pub use program::{Step, StepProgram};
pub use runner::{SimOptions, SimRecord, run_closed_loop};
