//! Closed-loop runner and result recording.

use zl_controls::{DiscreteBlock, PidController};
use zl_core::{Real, ensure_finite};

use crate::error::{SimError, SimResult};
use crate::program::StepProgram;

/// Options for closed-loop runs.
///
/// The loop cadence is not an option: it is the sample time embedded in the
/// controller's configuration, which the plant block must share.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Final simulation time (seconds)
    pub t_end: Real,
    /// Maximum number of ticks (safety limit)
    pub max_steps: usize,
    /// Record every N-th tick (decimation)
    pub record_every: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            t_end: 1.0,
            max_steps: 1_000_000,
            record_every: 1,
        }
    }
}

/// Recorded closed-loop time series.
#[derive(Clone, Debug, Default)]
pub struct SimRecord {
    /// Time points (seconds)
    pub t: Vec<Real>,
    /// Reference (target) values
    pub target: Vec<Real>,
    /// Controller outputs
    pub control: Vec<Real>,
    /// Plant (measured) outputs
    pub measured: Vec<Real>,
}

impl SimRecord {
    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.t.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Index of the last sample at or before time `t`, if any.
    pub fn index_at(&self, t: Real) -> Option<usize> {
        match self.t.iter().position(|&ti| ti > t) {
            Some(0) => None,
            Some(i) => Some(i - 1),
            None if self.t.is_empty() => None,
            None => Some(self.t.len() - 1),
        }
    }

    fn push(&mut self, t: Real, target: Real, control: Real, measured: Real) {
        self.t.push(t);
        self.target.push(target);
        self.control.push(control);
        self.measured.push(measured);
    }
}

/// Run a fixed-step closed-loop simulation of a controller driving a plant.
///
/// Per tick: sample the reference program, update the controller from
/// `(target, measured)`, advance the plant one sample on the control
/// signal. The plant output is checked for finiteness so a degenerate
/// block configuration surfaces here rather than as a silent NaN trace.
pub fn run_closed_loop(
    controller: &mut PidController,
    plant: &mut DiscreteBlock,
    program: &StepProgram,
    opts: &SimOptions,
) -> SimResult<SimRecord> {
    if opts.t_end < 0.0 {
        return Err(SimError::InvalidArg {
            what: "t_end must be non-negative",
        });
    }
    if opts.max_steps == 0 {
        return Err(SimError::InvalidArg {
            what: "max_steps must be positive",
        });
    }
    if opts.record_every == 0 {
        return Err(SimError::InvalidArg {
            what: "record_every must be positive",
        });
    }
    let sample_time = controller.params().sample_time;
    if sample_time <= 0.0 {
        return Err(SimError::InvalidArg {
            what: "controller sample time must be positive",
        });
    }

    let mut record = SimRecord::default();
    let mut measured = plant.output();

    let mut tick: usize = 0;
    let mut t = 0.0;
    let mut last_sample = (t, program.value_at(t), 0.0, measured);
    while t < opts.t_end && tick < opts.max_steps {
        tick += 1;
        t = tick as Real * sample_time;

        let target = program.value_at(t);
        let control = controller.update(target, measured);
        measured = ensure_finite(plant.forward_step(control), "plant output")?;

        last_sample = (t, target, control, measured);
        if tick % opts.record_every == 0 {
            record.push(t, target, control, measured);
        }
    }

    // Always record the final tick
    if tick % opts.record_every != 0 {
        let (t, target, control, measured) = last_sample;
        record.push(t, target, control, measured);
    }

    tracing::debug!(ticks = tick, t_end = opts.t_end, "closed-loop run complete");

    Ok(record)
}
