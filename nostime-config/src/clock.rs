//! Virtual clock and timer table parameters.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Virtual clock parameters, fixed for the process lifetime.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ClockConfig {
    /// Simulator ticks per second of virtual time.
    #[serde(default = "default_tick_rate")]
    #[validate(range(min = 1, max = 1_000_000_000))]
    pub tick_rate: u64,

    /// Tick count the clock starts at.
    #[serde(default)]
    pub initial_ticks: u64,
}

fn default_tick_rate() -> u64 {
    100
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
            initial_ticks: 0,
        }
    }
}

/// Software timer table parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TimerConfig {
    /// Number of timer slots; never grows at runtime.
    #[serde(default = "default_capacity")]
    #[validate(range(min = 1, max = 1024))]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    16
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}
