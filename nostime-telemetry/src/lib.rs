//! # nostime telemetry
//!
//! Logging setup and timer/sleep metrics for the virtual time core.

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::MetricsRecorder;
