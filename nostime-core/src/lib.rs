//! # nostime-core
//!
//! Virtual time and software timers for flight software running against a
//! bus simulator instead of a hardware clock source.
//!
//! The simulator owns time: it feeds tick counts into a [`VirtualClock`] and
//! calls [`TickDispatcher::dispatch`] once per tick event. Everything else
//! (reading the time, sleeping, arming timers) is built on top of that feed.
//!
//! ### Key Submodules:
//! - `time`: tick <-> second/nanosecond arithmetic and canonical [`TimeValue`]s
//! - `clock`: the process-wide [`VirtualClock`] and the [`SimBus`] it publishes to
//! - `realtime`: virtual -> host real time translation for host timed waits
//! - `signal`: interruptible real-time suspension ([`ThreadSignal`])
//! - `sleep`: blocking sleep polled at tick resolution
//! - `timer`: fixed-capacity timer table and the tick dispatcher
//! - `notify`: delivery of timer expirations to threads

pub mod clock;
pub mod error;
pub mod notify;
pub mod realtime;
pub mod signal;
pub mod sleep;
pub mod time;
pub mod timer;

pub mod prelude {
    pub use crate::clock::*;
    pub use crate::error::*;
    pub use crate::notify::*;
    pub use crate::realtime::*;
    pub use crate::signal::*;
    pub use crate::sleep::*;
    pub use crate::time::*;
    pub use crate::timer::*;
}

pub use clock::{SimBus, VirtualClock};
pub use error::{TimeError, TimeResult};
pub use sleep::{SleepOutcome, Sleeper};
pub use time::{ClockMode, TickRate, TimeValue};
pub use timer::{IntervalSpec, NotificationDescriptor, TickDispatcher, TimerHandle, TimerRegistry};
