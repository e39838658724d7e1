//! Assembly of a complete virtual time stack from configuration.

use std::sync::Arc;
use std::time::Duration;

use nostime_config::NosTimeConfig;
use nostime_core::notify::{Notifier, SignalNotifier};
use nostime_core::realtime::RealTimeTranslator;
use nostime_core::signal::RealTimeWait;
use nostime_core::{Sleeper, TickDispatcher, TickRate, TimerRegistry, VirtualClock};
use nostime_telemetry::MetricsRecorder;
use tracing::info;

use crate::bus::LoopbackBus;
use crate::driver::{DriverHandle, TickDriver};
use crate::SimulationError;

/// Clock, timer table and dispatcher sharing one configuration.
pub struct TimeSystem {
    config: NosTimeConfig,
    pub clock: Arc<VirtualClock>,
    pub registry: Arc<TimerRegistry>,
    pub dispatcher: Arc<TickDispatcher>,
    pub bus: Arc<LoopbackBus>,
    pub metrics: Option<MetricsRecorder>,
}

impl TimeSystem {
    /// Builds the stack with a caller-supplied notification mechanism.
    pub fn new(
        config: NosTimeConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, SimulationError> {
        let rate = TickRate::new(config.clock.tick_rate)?;
        let bus = Arc::new(LoopbackBus::new());
        let clock = Arc::new(VirtualClock::with_bus(
            rate,
            config.clock.initial_ticks,
            bus.clone(),
        ));
        let registry = Arc::new(TimerRegistry::new(clock.clone(), config.timers.capacity)?);

        let metrics = if config.telemetry.metrics_enabled {
            Some(MetricsRecorder::new()?)
        } else {
            None
        };

        let mut dispatcher = TickDispatcher::new(registry.clone(), notifier);
        if let Some(metrics) = &metrics {
            dispatcher = dispatcher.with_metrics(metrics.clone());
        }

        info!(
            %rate,
            resolution = %rate.resolution(),
            capacity = config.timers.capacity,
            "Virtual time system ready"
        );

        Ok(Self {
            config,
            clock,
            registry,
            dispatcher: Arc::new(dispatcher),
            bus,
            metrics,
        })
    }

    /// Builds the stack with timer expirations delivered as thread signals.
    pub fn with_thread_signals(
        config: NosTimeConfig,
    ) -> Result<(Self, Arc<SignalNotifier>), SimulationError> {
        let signals = Arc::new(SignalNotifier::new());
        let system = Self::new(config, signals.clone())?;
        Ok((system, signals))
    }

    pub fn config(&self) -> &NosTimeConfig {
        &self.config
    }

    /// A sleeper for the thread owning `waiter`.
    pub fn sleeper(&self, waiter: Arc<dyn RealTimeWait>) -> Sleeper {
        let sleeper = Sleeper::new(self.clock.clone(), waiter);
        match &self.metrics {
            Some(metrics) => sleeper.with_metrics(metrics.clone()),
            None => sleeper,
        }
    }

    pub fn translator(&self) -> RealTimeTranslator {
        RealTimeTranslator::new(self.clock.clone())
    }

    pub fn driver(&self) -> TickDriver {
        TickDriver::new(
            self.clock.clone(),
            self.dispatcher.clone(),
            self.config.simulator.ticks_per_step,
        )
    }

    /// Starts a paced background driver bounded by the configured step count.
    pub fn spawn_driver(&self) -> Result<DriverHandle, SimulationError> {
        let period = Duration::from_micros(self.config.simulator.step_period_us);
        self.driver().spawn(period, Some(self.config.simulator.steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostime_core::TimeValue;

    #[test]
    fn builds_from_default_config() {
        let (system, _signals) = TimeSystem::with_thread_signals(NosTimeConfig::default()).unwrap();
        assert_eq!(system.clock.tick_rate().get(), 100);
        assert_eq!(system.registry.capacity(), 16);
        assert!(system.metrics.is_some());
    }

    #[test]
    fn set_time_reaches_the_bus() {
        let (system, _signals) = TimeSystem::with_thread_signals(NosTimeConfig::default()).unwrap();
        system.clock.set_time(TimeValue::new(4, 0).unwrap()).unwrap();
        assert_eq!(system.bus.last_published(), Some(400));
        assert_eq!(system.bus.publish_count(), 1);
    }

    #[test]
    fn rejects_invalid_rate_that_skipped_validation() {
        let mut config = NosTimeConfig::default();
        config.clock.tick_rate = 0;
        assert!(matches!(
            TimeSystem::with_thread_signals(config),
            Err(SimulationError::Time(_))
        ));
    }
}
