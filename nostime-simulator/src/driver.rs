//! Tick source: advances the virtual clock and dispatches timers.
//!
//! [`TickDriver::step`] and [`TickDriver::run`] drive time synchronously for
//! deterministic tests. [`TickDriver::spawn`] paces steps in real time on a
//! dedicated thread until stopped through its [`DriverHandle`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use nostime_core::timer::DispatchReport;
use nostime_core::{TickDispatcher, VirtualClock};
use tracing::{debug, info, warn};

use crate::SimulationError;

/// Totals over a run of steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverSummary {
    pub steps: u64,
    pub fired: u64,
    pub overruns: u64,
    /// Notifications the notifier rejected.
    pub notify_failures: u64,
    pub last_tick: u64,
}

impl DriverSummary {
    fn record(&mut self, tick: u64, report: &DispatchReport) {
        self.steps += 1;
        self.fired += report.fired as u64;
        self.overruns += report.overruns as u64;
        self.notify_failures += report.failed as u64;
        self.last_tick = tick;
        if let Some(e) = &report.first_error {
            warn!(tick, failed = report.failed, error = %e, "Dispatch reported a failure");
        }
    }
}

pub struct TickDriver {
    clock: Arc<VirtualClock>,
    dispatcher: Arc<TickDispatcher>,
    ticks_per_step: u64,
}

impl TickDriver {
    pub fn new(
        clock: Arc<VirtualClock>,
        dispatcher: Arc<TickDispatcher>,
        ticks_per_step: u64,
    ) -> Self {
        Self {
            clock,
            dispatcher,
            ticks_per_step: ticks_per_step.max(1),
        }
    }

    /// Advances the clock by one step and dispatches the new tick.
    ///
    /// Returns the dispatched tick along with the dispatch report.
    pub fn step(&self) -> (u64, DispatchReport) {
        let tick = self.clock.advance(self.ticks_per_step);
        (tick, self.dispatcher.dispatch(tick))
    }

    /// Runs `steps` steps back to back.
    ///
    /// Notification failures are logged and counted; the run keeps going.
    pub fn run(&self, steps: u64) -> DriverSummary {
        let mut summary = DriverSummary::default();
        for _ in 0..steps {
            let (tick, report) = self.step();
            summary.record(tick, &report);
        }
        debug!(?summary, "Driver run complete");
        summary
    }

    /// Steps every `period` of real time on a background thread, until
    /// `max_steps` is reached (if given) or the handle is stopped.
    ///
    /// Notification failures are logged and counted; the driver keeps going.
    pub fn spawn(
        self,
        period: Duration,
        max_steps: Option<u64>,
    ) -> Result<DriverHandle, SimulationError> {
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("nostime-tick".into())
            .spawn(move || {
                info!(?period, ticks_per_step = self.ticks_per_step, "Tick driver started");
                let mut summary = DriverSummary::default();

                while max_steps.map_or(true, |max| summary.steps < max) {
                    match stop_rx.recv_timeout(period) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    let (tick, report) = self.step();
                    summary.record(tick, &report);
                }

                info!(?summary, "Tick driver stopped");
                Ok(summary)
            })?;

        Ok(DriverHandle {
            stop: stop_tx,
            thread,
        })
    }
}

/// Control handle for a background [`TickDriver`].
pub struct DriverHandle {
    stop: Sender<()>,
    thread: JoinHandle<Result<DriverSummary, SimulationError>>,
}

impl DriverHandle {
    /// Stops the driver and waits for its summary.
    pub fn stop(self) -> Result<DriverSummary, SimulationError> {
        let _ = self.stop.try_send(());
        self.join()
    }

    /// Waits for the driver to reach its step limit.
    pub fn join(self) -> Result<DriverSummary, SimulationError> {
        self.thread
            .join()
            .map_err(|_| SimulationError::DriverPanicked)?
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostime_core::notify::ChannelNotifier;
    use nostime_core::prelude::*;
    use tracing_test::traced_test;

    type Expirations = crossbeam::channel::Receiver<NotificationDescriptor>;

    fn driver_with(
        ticks_per_step: u64,
        notifier: Arc<dyn Notifier>,
    ) -> (TickDriver, Arc<TimerRegistry>) {
        let clock = Arc::new(VirtualClock::new(TickRate::new(100).unwrap(), 0));
        let registry = Arc::new(TimerRegistry::new(clock.clone(), 4).unwrap());
        let dispatcher = Arc::new(TickDispatcher::new(registry.clone(), notifier));
        (TickDriver::new(clock, dispatcher, ticks_per_step), registry)
    }

    fn setup(ticks_per_step: u64) -> (TickDriver, Arc<TimerRegistry>, Expirations) {
        let (notifier, rx) = ChannelNotifier::unbounded();
        let (driver, registry) = driver_with(ticks_per_step, Arc::new(notifier));
        (driver, registry, rx)
    }

    /// Rejects one target and forwards the rest to a channel.
    struct RejectOne {
        reject: u64,
        inner: ChannelNotifier,
    }

    impl Notifier for RejectOne {
        fn notify(&self, descriptor: &NotificationDescriptor) -> TimeResult<()> {
            if descriptor.target == self.reject {
                return Err(TimeError::Unavailable("thread gone".into()));
            }
            self.inner.notify(descriptor)
        }
    }

    fn arm_one_shots(registry: &TimerRegistry, targets: u64) {
        for target in 0..targets {
            let t = registry.create(NotificationDescriptor::new(target, 14)).unwrap();
            let spec = IntervalSpec::one_shot(TimeValue::from_millis(10));
            registry.set_time(t, ClockMode::Absolute, spec).unwrap();
        }
    }

    #[test]
    fn run_advances_clock_and_fires_timers() {
        let (driver, registry, rx) = setup(1);
        let t = registry.create(NotificationDescriptor::new(3, 14)).unwrap();
        registry
            .set_time(
                t,
                ClockMode::Relative,
                IntervalSpec::periodic(TimeValue::from_millis(100), TimeValue::from_millis(100)),
            )
            .unwrap();

        let summary = driver.run(50);
        assert_eq!(summary.steps, 50);
        assert_eq!(summary.last_tick, 50);
        assert_eq!(summary.fired, 5);
        assert_eq!(summary.overruns, 0);
        assert_eq!(rx.try_iter().count(), 5);
    }

    #[test]
    fn coarse_steps_coalesce_missed_periods() {
        let (driver, registry, rx) = setup(25);
        let t = registry.create(NotificationDescriptor::new(3, 14)).unwrap();
        registry
            .set_time(
                t,
                ClockMode::Relative,
                IntervalSpec::periodic(TimeValue::from_millis(50), TimeValue::from_millis(50)),
            )
            .unwrap();

        // ticks 25, 50, 75, 100: a period is 5 ticks, so every step overruns
        let summary = driver.run(4);
        assert_eq!(summary.fired, 4);
        assert_eq!(summary.overruns, 4);
        assert_eq!(rx.try_iter().count(), 4);
    }

    #[test]
    #[traced_test]
    fn run_logs_its_summary() {
        let (driver, _registry, _rx) = setup(1);
        driver.run(3);
        assert!(logs_contain("Driver run complete"));
    }

    #[test]
    fn background_driver_honours_step_limit() {
        let (driver, _registry, _rx) = setup(2);
        let handle = driver.spawn(Duration::ZERO, Some(10)).unwrap();
        let summary = handle.join().unwrap();
        assert_eq!(summary.steps, 10);
        assert_eq!(summary.last_tick, 20);
    }

    #[test]
    fn failed_notification_keeps_other_counts() {
        let (inner, rx) = ChannelNotifier::unbounded();
        let (driver, registry) = driver_with(1, Arc::new(RejectOne { reject: 1, inner }));
        arm_one_shots(&registry, 3);

        let summary = driver.run(3);
        assert_eq!(summary.steps, 3);
        assert_eq!(summary.fired, 2);
        assert_eq!(summary.notify_failures, 1);
        assert_eq!(summary.last_tick, 3);
        assert_eq!(registry.armed(), 0);
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn background_driver_counts_around_failed_notifications() {
        let (inner, rx) = ChannelNotifier::unbounded();
        let (driver, registry) = driver_with(1, Arc::new(RejectOne { reject: 1, inner }));
        arm_one_shots(&registry, 3);

        let summary = driver.spawn(Duration::ZERO, Some(3)).unwrap().join().unwrap();
        assert_eq!(summary.fired, 2);
        assert_eq!(summary.overruns, 0);
        assert_eq!(summary.notify_failures, 1);
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn step_reports_the_dispatched_tick() {
        let (driver, _registry, _rx) = setup(5);
        let (tick, report) = driver.step();
        assert_eq!(tick, 5);
        assert_eq!(report, DispatchReport::default());

        driver.clock.update_ticks(100);
        let (tick, _) = driver.step();
        assert_eq!(tick, 105);
    }

    #[test]
    fn background_driver_stops_on_request() {
        let (driver, _registry, _rx) = setup(1);
        let handle = driver.spawn(Duration::from_millis(1), None).unwrap();
        thread::sleep(Duration::from_millis(20));
        let summary = handle.stop().unwrap();
        assert!(summary.steps > 0);
        assert_eq!(summary.last_tick, summary.steps);
    }
}
