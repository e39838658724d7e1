//! # nostime configuration
//!
//! Layered configuration for the virtual time core and its simulator driver.
//!
//! ## Hierarchy
//! 1. Default values
//! 2. `config/nostime.yaml`
//! 3. `config/<NOSTIME_ENV>.yaml` (`NOSTIME_ENV` defaults to `simulation`)
//! 4. `NOSTIME_*` environment variables, sections split by `__`
//!    (`NOSTIME_CLOCK__TICK_RATE=50`)

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod clock;
mod error;
mod simulator;
mod telemetry;
mod validation;

pub use clock::{ClockConfig, TimerConfig};
pub use error::ConfigError;
pub use simulator::SimulatorConfig;
pub use telemetry::TelemetryConfig;

const BASE_FILE: &str = "config/nostime.yaml";
const ENV_PREFIX: &str = "NOSTIME_";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct NosTimeConfig {
    #[serde(default)]
    #[validate(nested)]
    pub clock: ClockConfig,

    #[serde(default)]
    #[validate(nested)]
    pub timers: TimerConfig,

    #[serde(default)]
    #[validate(nested)]
    pub simulator: SimulatorConfig,

    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl NosTimeConfig {
    /// Loads the full hierarchy from the working directory and environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(NosTimeConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        }

        let env = std::env::var("NOSTIME_ENV").unwrap_or_else(|_| "simulation".into());
        let env_file = format!("config/{env}.yaml");
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Loads defaults, then `path`, then environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Self::extract(
            Figment::from(Serialized::defaults(NosTimeConfig::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}
