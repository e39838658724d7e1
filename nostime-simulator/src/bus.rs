//! In-process stand-in for the simulator bus.

use std::sync::atomic::{AtomicU64, Ordering};

use nostime_core::{SimBus, TimeResult};
use tracing::debug;

/// Accepts every published time and remembers the latest one.
#[derive(Debug, Default)]
pub struct LoopbackBus {
    last_published: AtomicU64,
    publishes: AtomicU64,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick count from the most recent publish, if any.
    pub fn last_published(&self) -> Option<u64> {
        (self.publish_count() > 0).then(|| self.last_published.load(Ordering::Acquire))
    }

    pub fn publish_count(&self) -> u64 {
        self.publishes.load(Ordering::Acquire)
    }
}

impl SimBus for LoopbackBus {
    fn publish_time(&self, ticks: u64) -> TimeResult<()> {
        self.last_published.store(ticks, Ordering::Release);
        self.publishes.fetch_add(1, Ordering::AcqRel);
        debug!(ticks, "Published time to simulator bus");
        Ok(())
    }
}
