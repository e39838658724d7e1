//! ## nostime-telemetry::logging
//! **Subscriber setup for `tracing`**
//!
//! `RUST_LOG` wins over the configured filter so a single run can be made
//! more verbose without touching configuration files.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

/// Error returned when a global subscriber is already installed or the
/// filter does not parse.
pub type LoggingError = Box<dyn std::error::Error + Send + Sync>;

/// Installs the global fmt subscriber.
///
/// `default_filter` is used when `RUST_LOG` is unset, e.g. `"info"` or
/// `"nostime_core=debug,info"`.
pub fn init_logging(default_filter: &str) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)?,
    };

    fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE)
        .try_init()
}
