//! ## nostime-core::realtime
//! **Virtual -> host real time translation**
//!
//! Host blocking primitives (condition variable timed waits and friends) only
//! understand the host's real clock. [`RealTimeTranslator`] converts a
//! virtual deadline into a real one by sampling both clocks back to back and
//! applying the instantaneous offset.
//!
//! This bridge is best-effort and racy by nature: the offset is only valid at
//! the instant it was sampled. If the simulator drives virtual time at a
//! different rate than real time, or jumps it discontinuously, a translated
//! deadline drifts from the virtual deadline it was computed from. Callers
//! needing exact virtual deadlines must poll the virtual clock instead (see
//! [`crate::sleep`]).

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::trace;

use crate::clock::VirtualClock;
use crate::error::{TimeError, TimeResult};
use crate::time::TimeValue;

/// Source of host real time.
pub trait RealClock: Send + Sync {
    fn now(&self) -> TimeResult<TimeValue>;
}

/// The host's realtime clock, as seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRealClock;

impl RealClock for SystemRealClock {
    fn now(&self) -> TimeResult<TimeValue> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(TimeValue::from)
            .map_err(|e| TimeError::unavailable(format!("host clock before epoch: {e}")))
    }
}

pub struct RealTimeTranslator<R: RealClock = SystemRealClock> {
    clock: Arc<VirtualClock>,
    real: R,
}

impl RealTimeTranslator<SystemRealClock> {
    pub fn new(clock: Arc<VirtualClock>) -> Self {
        Self::with_real_clock(clock, SystemRealClock)
    }
}

impl<R: RealClock> RealTimeTranslator<R> {
    pub fn with_real_clock(clock: Arc<VirtualClock>, real: R) -> Self {
        Self { clock, real }
    }

    /// `virtual_now - real_now`, canonicalized. May be negative.
    pub fn offset(&self) -> TimeResult<TimeValue> {
        let real_now = self.real.now()?;
        let virtual_now = self.clock.time();
        let offset = virtual_now - real_now;
        trace!(%virtual_now, %real_now, %offset, "Sampled virtual/real offset");
        Ok(offset)
    }

    /// Real time at which `virtual_time` is expected to occur.
    pub fn to_real(&self, virtual_time: TimeValue) -> TimeResult<TimeValue> {
        virtual_time.validate()?;
        Ok(virtual_time - self.offset()?)
    }

    /// Real-time duration from now until the virtual deadline, zero if it has
    /// already passed. Suitable for a host timed wait.
    pub fn timeout_until(&self, virtual_deadline: TimeValue) -> TimeResult<Duration> {
        let real_deadline = self.to_real(virtual_deadline)?;
        let real_now = self.real.now()?;
        Ok((real_deadline - real_now).as_duration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TickRate;

    struct FixedRealClock(TimeValue);

    impl RealClock for FixedRealClock {
        fn now(&self) -> TimeResult<TimeValue> {
            Ok(self.0)
        }
    }

    fn translator(virtual_ticks: u64, real: TimeValue) -> RealTimeTranslator<FixedRealClock> {
        let clock = Arc::new(VirtualClock::new(TickRate::new(100).unwrap(), virtual_ticks));
        RealTimeTranslator::with_real_clock(clock, FixedRealClock(real))
    }

    #[test]
    fn offset_borrows_when_virtual_is_behind() {
        // virtual 1.5s, real 1000.75s
        let t = translator(150, TimeValue::new(1_000, 750_000_000).unwrap());
        let offset = t.offset().unwrap();
        assert_eq!((offset.seconds(), offset.nanoseconds()), (-1_000, 750_000_000));
        assert!(offset.is_canonical());
    }

    #[test]
    fn virtual_deadline_maps_onto_real_clock() {
        let t = translator(150, TimeValue::new(1_000, 750_000_000).unwrap());
        let real = t.to_real(TimeValue::new(2, 0).unwrap()).unwrap();
        assert_eq!(real, TimeValue::new(1_001, 250_000_000).unwrap());
        assert_eq!(
            t.timeout_until(TimeValue::new(2, 0).unwrap()).unwrap(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn passed_deadline_gives_zero_timeout() {
        let t = translator(500, TimeValue::new(10, 0).unwrap());
        assert_eq!(
            t.timeout_until(TimeValue::new(1, 0).unwrap()).unwrap(),
            Duration::ZERO
        );
    }

    #[test]
    fn rejects_unnormalized_virtual_time() {
        let t = translator(0, TimeValue::ZERO);
        assert!(matches!(
            t.to_real(TimeValue::canonical(-5, 0)),
            Err(TimeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn system_clock_is_after_epoch() {
        let now = SystemRealClock.now().unwrap();
        assert!(now.seconds() > 0);
    }
}
