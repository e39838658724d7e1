//! ## nostime-core::timer::registry
//! **Fixed-capacity timer slot table**
//!
//! Slots live in a boxed slice allocated once at construction; a timer handle
//! is an index into it plus a generation. Every operation takes the registry
//! lock for a bounded scan and releases it before returning. The virtual
//! clock is always sampled before the registry lock is taken, so the two
//! locks are never held together.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{IntervalSpec, NotificationDescriptor, TimerHandle};
use crate::clock::VirtualClock;
use crate::error::{TimeError, TimeResult};
use crate::time::{ClockMode, TickRate, TimeValue};

pub const DEFAULT_TIMER_CAPACITY: usize = 16;
pub const MAX_TIMERS: usize = 1024;

#[derive(Debug, Default)]
struct TimerSlot {
    in_use: bool,
    armed: bool,
    generation: u32,
    notify: Option<NotificationDescriptor>,
    interval: TimeValue,
    interval_ticks: u64,
    expire_at: u64,
}

impl TimerSlot {
    fn disarm(&mut self) {
        self.armed = false;
        self.interval = TimeValue::ZERO;
        self.interval_ticks = 0;
        self.expire_at = 0;
    }

    fn release(&mut self) {
        self.disarm();
        self.in_use = false;
        self.notify = None;
        self.generation = self.generation.wrapping_add(1);
    }

    fn setting(&self, now: u64, rate: TickRate) -> IntervalSpec {
        if !self.armed {
            return IntervalSpec::DISARMED;
        }
        IntervalSpec {
            initial_expiry: TimeValue::from_ticks(self.expire_at.saturating_sub(now), rate),
            interval: self.interval,
        }
    }
}

/// A timer found expired by a dispatch scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Expiration {
    pub handle: TimerHandle,
    pub notify: NotificationDescriptor,
    pub overrun: bool,
}

pub struct TimerRegistry {
    clock: Arc<VirtualClock>,
    slots: Mutex<Box<[TimerSlot]>>,
}

impl TimerRegistry {
    /// Creates a table of `capacity` free slots. The capacity never changes.
    pub fn new(clock: Arc<VirtualClock>, capacity: usize) -> TimeResult<Self> {
        if capacity == 0 || capacity > MAX_TIMERS {
            return Err(TimeError::invalid(format!(
                "timer capacity {capacity} outside 1..={MAX_TIMERS}"
            )));
        }
        let slots = (0..capacity)
            .map(|_| TimerSlot::default())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            clock,
            slots: Mutex::new(slots),
        })
    }

    pub fn clock(&self) -> &Arc<VirtualClock> {
        &self.clock
    }

    pub fn capacity(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn in_use(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.in_use).count()
    }

    pub fn armed(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.in_use && s.armed).count()
    }

    /// Allocates the first free slot for a timer notifying `notify`.
    pub fn create(&self, notify: NotificationDescriptor) -> TimeResult<TimerHandle> {
        let mut slots = self.slots.lock();
        let capacity = slots.len();
        let Some((index, slot)) = slots.iter_mut().enumerate().find(|(_, s)| !s.in_use) else {
            warn!(capacity, "Timer table exhausted");
            return Err(TimeError::ResourceExhausted { capacity });
        };

        slot.in_use = true;
        slot.disarm();
        slot.notify = Some(notify);
        let handle = TimerHandle::new(index, slot.generation);
        debug!(%handle, target = notify.target, signal = notify.signal, "Timer created");
        Ok(handle)
    }

    /// Disarms and frees the slot behind `handle`.
    pub fn delete(&self, handle: TimerHandle) -> TimeResult<()> {
        let mut slots = self.slots.lock();
        Self::slot_mut(&mut slots, handle)?.release();
        debug!(%handle, "Timer deleted");
        Ok(())
    }

    /// Arms, rearms or (with a zero `initial_expiry`) disarms a timer.
    ///
    /// Returns the setting that was in effect before the call.
    pub fn set_time(
        &self,
        handle: TimerHandle,
        mode: ClockMode,
        spec: IntervalSpec,
    ) -> TimeResult<IntervalSpec> {
        let rate = self.clock.tick_rate();
        let expiry_ticks = spec.initial_expiry.to_ticks(rate)?;
        let mut interval_ticks = spec.interval.to_ticks(rate)?;
        if !spec.interval.is_zero() {
            // sub-tick intervals repeat every tick
            interval_ticks = interval_ticks.max(1);
        }
        let now = self.clock.now_ticks();

        let mut slots = self.slots.lock();
        let slot = Self::slot_mut(&mut slots, handle)?;
        let previous = slot.setting(now, rate);

        if spec.initial_expiry.is_zero() {
            slot.disarm();
            debug!(%handle, "Timer disarmed");
            return Ok(previous);
        }

        slot.armed = true;
        slot.interval = spec.interval;
        slot.interval_ticks = interval_ticks;
        slot.expire_at = match mode {
            ClockMode::Relative => now.saturating_add(expiry_ticks),
            ClockMode::Absolute => expiry_ticks,
        };
        debug!(
            %handle,
            expire_at = slot.expire_at,
            interval_ticks,
            ?mode,
            "Timer armed"
        );
        Ok(previous)
    }

    /// Time left until the next expiry, and the repeat interval.
    ///
    /// A disarmed timer reports [`IntervalSpec::DISARMED`].
    pub fn get_time(&self, handle: TimerHandle) -> TimeResult<IntervalSpec> {
        let rate = self.clock.tick_rate();
        let now = self.clock.now_ticks();
        let mut slots = self.slots.lock();
        Ok(Self::slot_mut(&mut slots, handle)?.setting(now, rate))
    }

    /// Tick at which an armed timer next expires.
    pub fn next_expiry_tick(&self, handle: TimerHandle) -> TimeResult<Option<u64>> {
        let mut slots = self.slots.lock();
        let slot = Self::slot_mut(&mut slots, handle)?;
        Ok(slot.armed.then_some(slot.expire_at))
    }

    /// Expires every armed timer due at `current_tick`, pushing one entry per
    /// fired timer onto `fired`. Returns the number of timers still armed.
    pub(crate) fn collect_expired(&self, current_tick: u64, fired: &mut Vec<Expiration>) -> usize {
        let mut slots = self.slots.lock();
        let mut armed = 0;

        for (index, slot) in slots.iter_mut().enumerate() {
            if !(slot.in_use && slot.armed) {
                continue;
            }
            if slot.expire_at <= current_tick {
                let mut overrun = false;
                if slot.interval_ticks == 0 {
                    slot.armed = false;
                } else {
                    slot.expire_at = slot.expire_at.saturating_add(slot.interval_ticks);
                    if slot.expire_at < current_tick {
                        // missed periods are coalesced into this one firing
                        slot.expire_at = current_tick;
                        overrun = true;
                    }
                }
                if let Some(notify) = slot.notify {
                    fired.push(Expiration {
                        handle: TimerHandle::new(index, slot.generation),
                        notify,
                        overrun,
                    });
                }
            }
            if slot.armed {
                armed += 1;
            }
        }
        armed
    }

    fn slot_mut(slots: &mut [TimerSlot], handle: TimerHandle) -> TimeResult<&mut TimerSlot> {
        let capacity = slots.len();
        let slot = slots.get_mut(handle.index()).ok_or_else(|| {
            TimeError::invalid(format!("{handle} out of range (capacity {capacity})"))
        })?;
        if !slot.in_use || slot.generation != handle.generation() {
            return Err(TimeError::invalid(format!("{handle} is not a live timer")));
        }
        Ok(slot)
    }
}

impl std::fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("capacity", &self.capacity())
            .field("in_use", &self.in_use())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    fn registry(capacity: usize) -> TimerRegistry {
        let clock = Arc::new(VirtualClock::new(TickRate::new(100).unwrap(), 1_000));
        TimerRegistry::new(clock, capacity).unwrap()
    }

    fn notify(target: u64) -> NotificationDescriptor {
        NotificationDescriptor::new(target, 14)
    }

    #[test]
    fn rejects_bad_capacity() {
        let clock = Arc::new(VirtualClock::new(TickRate::new(100).unwrap(), 0));
        assert!(TimerRegistry::new(clock.clone(), 0).is_err());
        assert!(TimerRegistry::new(clock, MAX_TIMERS + 1).is_err());
    }

    #[test]
    fn create_hands_out_first_free_slot() {
        let reg = registry(3);
        let a = reg.create(notify(1)).unwrap();
        let b = reg.create(notify(2)).unwrap();
        assert_eq!((a.index(), b.index()), (0, 1));

        reg.delete(a).unwrap();
        let c = reg.create(notify(3)).unwrap();
        assert_eq!(c.index(), 0);
        assert_eq!(reg.in_use(), 2);
    }

    #[test]
    fn exhaustion_is_reported() {
        let reg = registry(2);
        reg.create(notify(1)).unwrap();
        reg.create(notify(2)).unwrap();
        assert_eq!(
            reg.create(notify(3)),
            Err(TimeError::ResourceExhausted { capacity: 2 })
        );
    }

    #[test]
    fn out_of_range_handle_is_rejected() {
        let reg = registry(2);
        let bogus = TimerHandle::new(7, 0);
        assert!(matches!(reg.delete(bogus), Err(TimeError::InvalidArgument(_))));
        assert!(matches!(
            reg.set_time(
                bogus,
                ClockMode::Relative,
                IntervalSpec::one_shot(TimeValue::from_millis(10))
            ),
            Err(TimeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn stale_handle_is_rejected_after_reuse() {
        let reg = registry(1);
        let old = reg.create(notify(1)).unwrap();
        reg.delete(old).unwrap();
        assert!(matches!(reg.delete(old), Err(TimeError::InvalidArgument(_))));

        let new = reg.create(notify(2)).unwrap();
        assert_eq!(new.index(), old.index());
        assert!(matches!(reg.get_time(old), Err(TimeError::InvalidArgument(_))));
        assert!(reg.get_time(new).is_ok());
    }

    #[test]
    fn reused_slot_does_not_inherit_state() {
        let reg = registry(1);
        let old = reg.create(notify(1)).unwrap();
        reg.set_time(
            old,
            ClockMode::Relative,
            IntervalSpec::periodic(TimeValue::from_millis(50), TimeValue::from_millis(50)),
        )
        .unwrap();
        reg.delete(old).unwrap();

        let new = reg.create(notify(2)).unwrap();
        assert_eq!(reg.get_time(new).unwrap(), IntervalSpec::DISARMED);
        assert_eq!(reg.next_expiry_tick(new).unwrap(), None);

        let mut fired = Vec::new();
        reg.collect_expired(u64::MAX, &mut fired);
        assert!(fired.is_empty());

        reg.set_time(new, ClockMode::Absolute, IntervalSpec::one_shot(TimeValue::from_millis(1)))
            .unwrap();
        reg.collect_expired(u64::MAX, &mut fired);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].notify, notify(2));
    }

    #[test]
    fn relative_arm_adds_current_tick() {
        let reg = registry(1);
        let t = reg.create(notify(1)).unwrap();
        reg.set_time(t, ClockMode::Relative, IntervalSpec::one_shot(TimeValue::from_millis(250)))
            .unwrap();
        assert_eq!(reg.next_expiry_tick(t).unwrap(), Some(1_025));
        assert_eq!(
            reg.get_time(t).unwrap(),
            IntervalSpec::one_shot(TimeValue::from_millis(250))
        );
    }

    #[test]
    fn absolute_arm_uses_tick_directly() {
        let reg = registry(1);
        let t = reg.create(notify(1)).unwrap();
        reg.set_time(
            t,
            ClockMode::Absolute,
            IntervalSpec::periodic(TimeValue::new(12, 0).unwrap(), TimeValue::from_millis(100)),
        )
        .unwrap();
        assert_eq!(reg.next_expiry_tick(t).unwrap(), Some(1_200));
        assert_eq!(reg.get_time(t).unwrap().interval, TimeValue::from_millis(100));
    }

    #[test]
    fn zero_expiry_disarms_and_returns_previous() {
        let reg = registry(1);
        let t = reg.create(notify(1)).unwrap();
        let spec = IntervalSpec::periodic(TimeValue::from_millis(30), TimeValue::from_millis(10));

        assert_eq!(reg.set_time(t, ClockMode::Relative, spec).unwrap(), IntervalSpec::DISARMED);
        assert_eq!(reg.armed(), 1);

        let previous = reg.set_time(t, ClockMode::Relative, IntervalSpec::DISARMED).unwrap();
        assert_eq!(previous, spec);
        assert_eq!(reg.armed(), 0);
        assert_eq!(reg.in_use(), 1);
        assert_eq!(reg.get_time(t).unwrap(), IntervalSpec::DISARMED);
    }

    #[test]
    fn arm_rejects_unnormalized_values() {
        let reg = registry(1);
        let t = reg.create(notify(1)).unwrap();
        let bad = IntervalSpec::periodic(TimeValue::from_millis(10), TimeValue::canonical(-1, 0));
        assert!(matches!(
            reg.set_time(t, ClockMode::Relative, bad),
            Err(TimeError::InvalidArgument(_))
        ));
        assert_eq!(reg.armed(), 0);
    }

    #[test]
    fn sub_tick_interval_repeats_every_tick() {
        let reg = registry(1);
        let t = reg.create(notify(1)).unwrap();
        reg.set_time(
            t,
            ClockMode::Absolute,
            IntervalSpec::periodic(TimeValue::new(10, 0).unwrap(), TimeValue::new(0, 1).unwrap()),
        )
        .unwrap();

        let mut fired = Vec::new();
        reg.collect_expired(1_000, &mut fired);
        assert_eq!(reg.next_expiry_tick(t).unwrap(), Some(1_001));
    }

    #[test]
    fn concurrent_creates_never_collide() {
        let reg = Arc::new(registry(32));
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let reg = reg.clone();
                thread::spawn(move || {
                    (0..8)
                        .filter_map(|i| reg.create(notify(worker * 100 + i)).ok())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let handles: Vec<TimerHandle> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        let unique: HashSet<_> = handles.iter().map(|h| h.index()).collect();

        assert_eq!(handles.len(), 32);
        assert_eq!(unique.len(), 32);
        assert!(unique.iter().all(|i| *i < 32));
        assert_eq!(reg.in_use(), 32);
    }
}
