//! Scenario files: a complete closed-loop setup as one YAML document.

use serde::{Deserialize, Serialize};
use zl_controls::{
    BackpropSettings, BlockKind, DiscreteBlock, PidController, PidParams, StepMethod,
};
use zl_core::Real;
use zl_sim::{SimOptions, Step, StepProgram};

/// A closed-loop simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Controller configuration.
    pub controller: PidParams,
    /// Anti-windup loop settings.
    #[serde(default)]
    pub backprop: BackpropSettings,
    /// Plant model.
    pub plant: PlantConfig,
    /// Reference program.
    pub program: StepProgram,
    /// Final simulation time (seconds).
    pub t_end: Real,
    /// Record every N-th tick.
    #[serde(default = "default_record_every")]
    pub record_every: usize,
}

fn default_record_every() -> usize {
    1
}

/// Plant block configuration.
///
/// The plant has no sample time of its own: the loop runs at the
/// controller's cadence, so the plant block is built on the controller's
/// sample time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantConfig {
    /// Initial condition for the plant state.
    #[serde(default)]
    pub initial_state: Real,
    /// Plant block kind and parameter.
    pub kind: BlockKind,
    /// Discretization method for the plant block.
    #[serde(default = "default_plant_method")]
    pub method: StepMethod,
}

fn default_plant_method() -> StepMethod {
    StepMethod::Standard
}

impl Scenario {
    /// The built-in demo: step-response of a PID-driven first-order plant.
    pub fn demo(t_end: Real) -> Self {
        let sample_time = 1e-3;
        Self {
            controller: PidParams {
                kp: 1.0,
                ki: 5.0,
                kd: 1.0,
                kb: 0.1,
                filter: 100.0,
                output_min: 0.0,
                output_max: 100.0,
                sample_time,
                integral_init: 0.0,
                derivative_init: 0.0,
                integral_method: StepMethod::Trapezoidal,
                derivative_method: StepMethod::Trapezoidal,
            },
            backprop: BackpropSettings::default(),
            plant: PlantConfig {
                initial_state: 0.0,
                kind: BlockKind::FirstOrder { tau: 0.1 },
                method: StepMethod::Standard,
            },
            program: StepProgram::new(
                0.0,
                vec![
                    Step {
                        at: 0.1,
                        value: 100.0,
                    },
                    Step { at: 2.0, value: 0.0 },
                ],
            ),
            t_end,
            record_every: 1,
        }
    }

    /// Build the live controller, plant, and run options.
    pub fn build(&self) -> (PidController, DiscreteBlock, SimOptions) {
        let controller = PidController::new(self.controller).with_backprop(self.backprop);
        let plant = DiscreteBlock::new(
            self.plant.initial_state,
            self.controller.sample_time,
            self.plant.kind,
            self.plant.method,
        );
        let opts = SimOptions {
            t_end: self.t_end,
            record_every: self.record_every,
            ..SimOptions::default()
        };
        (controller, plant, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_YAML: &str = r#"
controller:
  kp: 1.0
  ki: 5.0
  kd: 1.0
  kb: 0.1
  filter: 100.0
  output_min: 0.0
  output_max: 100.0
  sample_time: 0.001
  integral_init: 0.0
  derivative_init: 0.0
  integral_method: Trapezoidal
  derivative_method: Trapezoidal
plant:
  initial_state: 0.0
  kind:
    type: FirstOrder
    tau: 0.1
program:
  initial: 0.0
  steps:
    - at: 0.1
      value: 100.0
    - at: 2.0
      value: 0.0
t_end: 5.0
"#;

    #[test]
    fn scenario_parses_from_yaml() {
        let scenario: Scenario = serde_yaml::from_str(SCENARIO_YAML).unwrap();
        assert_eq!(scenario.controller.ki, 5.0);
        assert_eq!(scenario.plant.kind, BlockKind::FirstOrder { tau: 0.1 });
        assert_eq!(scenario.plant.method, StepMethod::Standard);
        assert_eq!(scenario.program.steps.len(), 2);
        assert_eq!(scenario.record_every, 1);
        // Omitted backprop settings fall back to the defaults.
        assert_eq!(scenario.backprop, BackpropSettings::default());
    }

    #[test]
    fn plant_shares_the_controller_cadence() {
        let scenario = Scenario::demo(1.0);
        let (controller, plant, _) = scenario.build();
        assert_eq!(plant.sample_time(), controller.params().sample_time);
    }

    #[test]
    fn demo_round_trips_through_yaml() {
        let scenario = Scenario::demo(5.0);
        let text = serde_yaml::to_string(&scenario).unwrap();
        let parsed: Scenario = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed.controller, scenario.controller);
        assert_eq!(parsed.program, scenario.program);
    }
}
