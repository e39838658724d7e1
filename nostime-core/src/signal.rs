//! ## nostime-core::signal
//! **Interruptible real-time suspension**
//!
//! The host supplies the primitive that actually suspends a thread; the core
//! only needs to know whether a suspension ran to completion or was cut
//! short by a signal, and how much real time was left when it was.
//! [`ThreadSignal`] is the in-process implementation: one per thread, raised
//! by timer notifications or by any other thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::TimeResult;

/// Result of one real-time suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full duration elapsed.
    Elapsed,
    /// A signal arrived; `remaining` is the real time that was left.
    Interrupted { remaining: Duration },
}

/// Host real-time wait primitive.
pub trait RealTimeWait: Send + Sync {
    /// Suspends the caller for `duration` of real time unless interrupted.
    fn wait(&self, duration: Duration) -> TimeResult<WaitOutcome>;
}

/// A per-thread pending-signal flag with a condition variable.
///
/// A signal raised while nobody is waiting stays pending and interrupts the
/// next wait immediately, the way a pending POSIX signal interrupts the next
/// `nanosleep`.
#[derive(Debug, Default)]
pub struct ThreadSignal {
    pending: Mutex<bool>,
    cond: Condvar,
    raised: AtomicU64,
}

impl ThreadSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the signal pending and wakes the waiter, if any.
    pub fn raise(&self) {
        let mut pending = self.pending.lock();
        *pending = true;
        self.raised.fetch_add(1, Ordering::Relaxed);
        self.cond.notify_all();
    }

    /// Clears a pending signal, returning whether one was pending.
    pub fn take_pending(&self) -> bool {
        std::mem::replace(&mut *self.pending.lock(), false)
    }

    pub fn is_pending(&self) -> bool {
        *self.pending.lock()
    }

    /// Total number of times this signal has been raised.
    pub fn raised_count(&self) -> u64 {
        self.raised.load(Ordering::Relaxed)
    }
}

impl RealTimeWait for ThreadSignal {
    fn wait(&self, duration: Duration) -> TimeResult<WaitOutcome> {
        let deadline = Instant::now() + duration;
        let mut pending = self.pending.lock();
        loop {
            if *pending {
                *pending = false;
                let remaining = deadline.saturating_duration_since(Instant::now());
                return Ok(WaitOutcome::Interrupted { remaining });
            }
            if self.cond.wait_until(&mut pending, deadline).timed_out() && !*pending {
                return Ok(WaitOutcome::Elapsed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wait_elapses_without_signal() {
        let signal = ThreadSignal::new();
        let outcome = signal.wait(Duration::from_millis(5)).unwrap();
        assert_eq!(outcome, WaitOutcome::Elapsed);
    }

    #[test]
    fn pending_signal_interrupts_next_wait() {
        let signal = ThreadSignal::new();
        signal.raise();
        assert!(signal.is_pending());
        let outcome = signal.wait(Duration::from_secs(10)).unwrap();
        assert!(matches!(
            outcome,
            WaitOutcome::Interrupted { remaining } if remaining > Duration::from_secs(9)
        ));
        assert!(!signal.is_pending());
        assert_eq!(signal.raised_count(), 1);
    }

    #[test]
    fn raise_from_another_thread_wakes_waiter() {
        let signal = Arc::new(ThreadSignal::new());
        let raiser = {
            let signal = signal.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                signal.raise();
            })
        };
        let outcome = signal.wait(Duration::from_secs(30)).unwrap();
        raiser.join().unwrap();
        assert!(matches!(outcome, WaitOutcome::Interrupted { .. }));
    }

    #[test]
    fn take_pending_clears_flag() {
        let signal = ThreadSignal::new();
        assert!(!signal.take_pending());
        signal.raise();
        assert!(signal.take_pending());
        assert!(!signal.is_pending());
    }
}
