//! ## nostime-core::sleep
//! **Blocking sleep against the virtual clock**
//!
//! The virtual clock has no "wake me at tick X" primitive, so a sleeping
//! thread polls it: suspend for one tick's worth of real time, re-sample the
//! clock, repeat until the deadline tick is reached or a signal interrupts
//! the suspension. The clock lock is only held while sampling.

use std::sync::Arc;
use std::time::Duration;

use nostime_telemetry::MetricsRecorder;
use tracing::{debug, instrument, trace};

use crate::clock::VirtualClock;
use crate::error::{TimeError, TimeResult};
use crate::signal::{RealTimeWait, WaitOutcome};
use crate::time::{ClockMode, TimeValue};

/// How a sleep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepOutcome {
    /// A signal cut the sleep short.
    pub interrupted: bool,
    /// Unslept time, zero when the deadline was reached.
    pub remaining: TimeValue,
}

impl SleepOutcome {
    /// Maps an interrupted sleep to [`TimeError::Interrupted`].
    pub fn into_result(self) -> TimeResult<()> {
        if self.interrupted {
            Err(TimeError::Interrupted {
                remaining: self.remaining,
            })
        } else {
            Ok(())
        }
    }
}

/// Sleeps the calling thread against a [`VirtualClock`].
///
/// Each thread that sleeps should own a `Sleeper` built around its own wait
/// primitive, so that signals reach the right sleeper.
pub struct Sleeper {
    clock: Arc<VirtualClock>,
    waiter: Arc<dyn RealTimeWait>,
    metrics: Option<MetricsRecorder>,
}

impl Sleeper {
    pub fn new(clock: Arc<VirtualClock>, waiter: Arc<dyn RealTimeWait>) -> Self {
        Self {
            clock,
            waiter,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sleeps until the virtual clock reaches the requested time.
    ///
    /// In [`ClockMode::Relative`] the request is a duration from now; in
    /// [`ClockMode::Absolute`] it is a virtual time. The reported remainder
    /// of a relative sleep never exceeds the request.
    #[instrument(level = "trace", skip(self))]
    pub fn sleep(&self, mode: ClockMode, requested: TimeValue) -> TimeResult<SleepOutcome> {
        let rate = self.clock.tick_rate();
        let requested_ticks = requested.to_ticks(rate)?;

        let mut now = self.clock.now_ticks();
        let end_tick = match mode {
            ClockMode::Relative => now.saturating_add(requested_ticks),
            ClockMode::Absolute => requested_ticks,
        };
        let delay = self.clock.resolution().as_duration();

        let mut interrupted = false;
        let mut leftover = Duration::ZERO;
        while now < end_tick && !interrupted {
            if let WaitOutcome::Interrupted { remaining } = self.waiter.wait(delay)? {
                interrupted = true;
                leftover = remaining;
            }
            now = self.clock.now_ticks();
            trace!(now, end_tick, "Sleep poll");
        }

        let mut remaining = TimeValue::ZERO;
        if end_tick > now {
            remaining = TimeValue::from_ticks(end_tick - now, rate) + TimeValue::from(leftover);
            if mode == ClockMode::Relative {
                remaining = remaining.min(requested);
            }
        }

        if interrupted {
            debug!(%remaining, "Sleep interrupted");
            if let Some(metrics) = &self.metrics {
                metrics.inc_interrupted_sleeps();
            }
        }

        Ok(SleepOutcome {
            interrupted,
            remaining,
        })
    }
}
