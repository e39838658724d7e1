//! Tick source parameters for the in-process simulator driver.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct SimulatorConfig {
    /// Ticks the clock advances per driver step.
    #[serde(default = "default_ticks_per_step")]
    #[validate(range(min = 1))]
    pub ticks_per_step: u64,

    /// Real time between steps of the background driver, in microseconds.
    /// Zero runs steps back to back.
    #[serde(default = "default_step_period_us")]
    pub step_period_us: u64,

    /// Number of steps a bounded run performs.
    #[serde(default = "default_steps")]
    #[validate(range(min = 1))]
    pub steps: u64,
}

fn default_ticks_per_step() -> u64 {
    1
}

fn default_step_period_us() -> u64 {
    10_000
}

fn default_steps() -> u64 {
    1_000
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            ticks_per_step: default_ticks_per_step(),
            step_period_us: default_step_period_us(),
            steps: default_steps(),
        }
    }
}
