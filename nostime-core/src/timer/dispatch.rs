//! ## nostime-core::timer::dispatch
//! **Per-tick timer expiration**
//!
//! The simulator calls [`TickDispatcher::dispatch`] once per tick event; it is
//! the only substitute for a timer interrupt on the simulated target. A scan
//! is bounded by the table capacity and never blocks: expirations are
//! collected under the registry lock, and notifications go out after the lock
//! is released.
//!
//! Overrun policy: when a periodic timer has missed one or more whole
//! periods by the time it is dispatched, it fires once and its next expiry is
//! clamped to the dispatched tick. Missed periods are coalesced, never
//! replayed as a burst.

use std::sync::Arc;

use nostime_telemetry::MetricsRecorder;
use tracing::{debug, instrument, trace, warn};

use super::registry::{Expiration, TimerRegistry};
use crate::error::{TimeError, TimeResult};
use crate::notify::Notifier;

/// What one dispatch call did.
///
/// The registry has been updated by the time a report exists, so a report
/// carrying a notification failure still counts everything that fired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Notifications delivered.
    pub fired: usize,
    /// Periodic timers whose next expiry had to be clamped.
    pub overruns: usize,
    /// Timers still armed after the scan.
    pub armed: usize,
    /// Notifications the notifier rejected.
    pub failed: usize,
    /// The first rejection, if any.
    pub first_error: Option<TimeError>,
}

impl DispatchReport {
    /// Maps a report carrying a notification failure to that failure.
    pub fn into_result(mut self) -> TimeResult<Self> {
        match self.first_error.take() {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}

pub struct TickDispatcher {
    registry: Arc<TimerRegistry>,
    notifier: Arc<dyn Notifier>,
    metrics: Option<MetricsRecorder>,
}

impl TickDispatcher {
    pub fn new(registry: Arc<TimerRegistry>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            registry,
            notifier,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Arc<TimerRegistry> {
        &self.registry
    }

    /// Fires every timer due at `current_tick`.
    ///
    /// Each expired timer is notified exactly once per call, however many
    /// ticks were skipped. A notification failure does not stop the others;
    /// it is counted in the report and the first one is kept.
    #[instrument(level = "trace", skip(self))]
    pub fn dispatch(&self, current_tick: u64) -> DispatchReport {
        let mut fired: Vec<Expiration> = Vec::new();
        let armed = self.registry.collect_expired(current_tick, &mut fired);

        let mut report = DispatchReport {
            armed,
            ..DispatchReport::default()
        };

        for expiration in &fired {
            if expiration.overrun {
                report.overruns += 1;
                debug!(handle = %expiration.handle, current_tick, "Timer overrun coalesced");
            }
            trace!(handle = %expiration.handle, target = expiration.notify.target, "Timer fired");
            match self.notifier.notify(&expiration.notify) {
                Ok(()) => report.fired += 1,
                Err(e) => {
                    warn!(handle = %expiration.handle, error = %e, "Timer notification failed");
                    report.failed += 1;
                    report.first_error.get_or_insert(e);
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_dispatch(
                report.fired as u64,
                report.overruns as u64,
                report.armed as i64,
            );
        }

        report
    }
}
