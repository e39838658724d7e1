//! ## nostime-core::timer
//! **Software interval timers on the virtual clock**
//!
//! The simulated target has no hardware interval timers. They are emulated
//! by a fixed-capacity table of slots ([`TimerRegistry`]) that the simulator
//! scans once per tick event through a [`TickDispatcher`].
//!
//! ### Key Submodules:
//! - `registry`: slot table, create/delete/arm/disarm/query
//! - `dispatch`: per-tick expiration scan and notification delivery

pub mod dispatch;
pub mod registry;

pub use dispatch::{DispatchReport, TickDispatcher};
pub use registry::{TimerRegistry, DEFAULT_TIMER_CAPACITY, MAX_TIMERS};

use std::fmt;

use crate::time::TimeValue;

/// Identifies which thread (and which signal on it) a timer notifies.
///
/// Opaque to the core; its meaning belongs to the host's [`crate::notify::Notifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationDescriptor {
    pub target: u64,
    pub signal: i32,
}

impl NotificationDescriptor {
    pub fn new(target: u64, signal: i32) -> Self {
        Self { target, signal }
    }
}

/// Opaque reference to a timer slot.
///
/// The generation makes a handle kept past `delete` stale: it is rejected
/// even after the slot has been handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    index: u32,
    generation: u32,
}

impl TimerHandle {
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        Self {
            index: index as u32,
            generation,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    #[inline]
    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}.{}", self.index, self.generation)
    }
}

/// First expiry and repeat interval of a timer (POSIX `itimerspec`).
///
/// A zero `initial_expiry` disarms; a zero `interval` makes a one-shot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntervalSpec {
    pub initial_expiry: TimeValue,
    pub interval: TimeValue,
}

impl IntervalSpec {
    pub const DISARMED: IntervalSpec = IntervalSpec {
        initial_expiry: TimeValue::ZERO,
        interval: TimeValue::ZERO,
    };

    pub fn one_shot(expiry: TimeValue) -> Self {
        Self {
            initial_expiry: expiry,
            interval: TimeValue::ZERO,
        }
    }

    pub fn periodic(first: TimeValue, every: TimeValue) -> Self {
        Self {
            initial_expiry: first,
            interval: every,
        }
    }
}
