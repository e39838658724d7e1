use thiserror::Error;

use crate::time::TimeValue;

/// Failure kinds reported by the time and timer core.
///
/// Every variant is recoverable; nothing here is retried internally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeError {
    /// Malformed time value, tick rate or timer handle.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Every timer slot is in use.
    #[error("Timer table exhausted: all {capacity} slots in use")]
    ResourceExhausted { capacity: usize },

    /// A sleep ended early because the sleeping thread was signalled.
    #[error("Interrupted with {remaining} remaining")]
    Interrupted { remaining: TimeValue },

    /// A host clock, signal or simulator primitive failed.
    #[error("Host primitive unavailable: {0}")]
    Unavailable(String),
}

pub type TimeResult<T> = Result<T, TimeError>;

impl TimeError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        TimeError::InvalidArgument(msg.into())
    }

    pub(crate) fn unavailable(msg: impl Into<String>) -> Self {
        TimeError::Unavailable(msg.into())
    }
}
