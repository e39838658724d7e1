use nostime_config::ConfigError;
use nostime_core::TimeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Time core error: {0}")]
    Time(#[from] TimeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tick driver thread panicked")]
    DriverPanicked,
}
