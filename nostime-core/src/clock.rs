//! ## nostime-core::clock
//! **The virtual clock driven by the bus simulator**
//!
//! The clock never advances on its own. The simulator feeds it through
//! [`VirtualClock::update_ticks`] (or [`VirtualClock::advance`]); application
//! code reads it and, rarely, sets it, in which case the new time is also
//! published back to the simulator through a [`SimBus`].

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::TimeResult;
use crate::time::{TickRate, TimeValue};

/// The simulator side of the clock.
pub trait SimBus: Send + Sync {
    /// Installs `ticks` as the simulator's notion of current time.
    fn publish_time(&self, ticks: u64) -> TimeResult<()>;
}

/// Process-wide virtual time, shared by `Arc` with every component that
/// needs "now".
pub struct VirtualClock {
    rate: TickRate,
    ticks: Mutex<u64>,
    bus: Option<Arc<dyn SimBus>>,
}

impl VirtualClock {
    /// Creates a clock that is not connected to a simulator bus.
    pub fn new(rate: TickRate, initial_ticks: u64) -> Self {
        Self {
            rate,
            ticks: Mutex::new(initial_ticks),
            bus: None,
        }
    }

    /// Creates a clock whose `set_time` calls are published to `bus`.
    pub fn with_bus(rate: TickRate, initial_ticks: u64, bus: Arc<dyn SimBus>) -> Self {
        Self {
            rate,
            ticks: Mutex::new(initial_ticks),
            bus: Some(bus),
        }
    }

    #[inline]
    pub fn tick_rate(&self) -> TickRate {
        self.rate
    }

    /// Current tick count.
    #[inline]
    pub fn now_ticks(&self) -> u64 {
        *self.ticks.lock()
    }

    pub fn resolution(&self) -> TimeValue {
        self.rate.resolution()
    }

    /// Current virtual time.
    pub fn time(&self) -> TimeValue {
        TimeValue::from_ticks(self.now_ticks(), self.rate)
    }

    /// Installs `value` as the authoritative time and publishes it to the
    /// simulator. On a publish failure the local clock is left untouched.
    pub fn set_time(&self, value: TimeValue) -> TimeResult<()> {
        let ticks = value.to_ticks(self.rate)?;
        if let Some(bus) = &self.bus {
            bus.publish_time(ticks)?;
        }
        *self.ticks.lock() = ticks;
        info!(%value, ticks, "Virtual clock set");
        Ok(())
    }

    /// Simulator feed: replaces the tick count.
    pub fn update_ticks(&self, ticks: u64) {
        let mut current = self.ticks.lock();
        if ticks < *current {
            warn!(from = *current, to = ticks, "Simulator moved the virtual clock backwards");
        }
        *current = ticks;
    }

    /// Simulator feed: advances by `delta` ticks and returns the new count.
    pub fn advance(&self, delta: u64) -> u64 {
        let mut current = self.ticks.lock();
        *current = current.saturating_add(delta);
        debug!(ticks = *current, "Virtual clock advanced");
        *current
    }
}

impl std::fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualClock")
            .field("rate", &self.rate)
            .field("ticks", &self.now_ticks())
            .field("bus", &self.bus.is_some())
            .finish()
    }
}
