//! # nostime simulator
//!
//! In-process tick source for the virtual time core: a loopback simulator
//! bus, a driver that advances the clock and dispatches timers, and the
//! assembly of a full time system from configuration.

pub mod bus;
pub mod driver;
pub mod error;
pub mod system;

pub use bus::LoopbackBus;
pub use driver::{DriverHandle, DriverSummary, TickDriver};
pub use error::SimulationError;
pub use system::TimeSystem;
