//! ## nostime-core::notify
//! **Delivery of timer expirations**
//!
//! The dispatcher only decides when, and to whom, a notification goes. The
//! host decides what a notification is: a POSIX signal, a channel message, a
//! condition variable broadcast. Implementations must not block; they are
//! called from the simulator's tick context.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{TimeError, TimeResult};
use crate::signal::ThreadSignal;
use crate::timer::NotificationDescriptor;

pub trait Notifier: Send + Sync {
    fn notify(&self, descriptor: &NotificationDescriptor) -> TimeResult<()>;
}

/// Sends each fired descriptor down a crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: Sender<NotificationDescriptor>,
}

impl ChannelNotifier {
    pub fn unbounded() -> (Self, Receiver<NotificationDescriptor>) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, rx)
    }

    /// A full channel is reported as [`TimeError::Unavailable`] rather than
    /// blocking the dispatcher.
    pub fn bounded(capacity: usize) -> (Self, Receiver<NotificationDescriptor>) {
        let (tx, rx) = channel::bounded(capacity);
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, descriptor: &NotificationDescriptor) -> TimeResult<()> {
        self.tx.try_send(*descriptor).map_err(|e| match e {
            TrySendError::Full(_) => TimeError::unavailable("notification channel full"),
            TrySendError::Disconnected(_) => {
                TimeError::unavailable("notification channel disconnected")
            }
        })
    }
}

/// Raises the [`ThreadSignal`] registered for a descriptor's target.
///
/// A thread sleeping on that signal is woken, so a timer expiry interrupts
/// the owner's sleep the way a POSIX timer signal does.
#[derive(Debug, Default)]
pub struct SignalNotifier {
    targets: RwLock<HashMap<u64, Arc<ThreadSignal>>>,
}

impl SignalNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `signal` for `target`, returning any signal it replaces.
    pub fn register(&self, target: u64, signal: Arc<ThreadSignal>) -> Option<Arc<ThreadSignal>> {
        debug!(target, "Registered notification target");
        self.targets.write().insert(target, signal)
    }

    pub fn unregister(&self, target: u64) -> Option<Arc<ThreadSignal>> {
        self.targets.write().remove(&target)
    }
}

impl Notifier for SignalNotifier {
    fn notify(&self, descriptor: &NotificationDescriptor) -> TimeResult<()> {
        let targets = self.targets.read();
        let signal = targets.get(&descriptor.target).ok_or_else(|| {
            TimeError::unavailable(format!("no thread registered for target {}", descriptor.target))
        })?;
        signal.raise();
        Ok(())
    }
}
