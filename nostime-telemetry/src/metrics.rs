//! ## nostime-telemetry::metrics
//! **Prometheus counters for timers and sleeps**

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

/// Cloning shares the underlying collectors.
#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub timer_expirations: IntCounter,
    pub timer_overruns: IntCounter,
    pub interrupted_sleeps: IntCounter,
    pub armed_timers: IntGauge,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let timer_expirations = IntCounter::new(
            "nostime_timer_expirations_total",
            "Timer notifications issued by the tick dispatcher",
        )?;
        let timer_overruns = IntCounter::new(
            "nostime_timer_overruns_total",
            "Periodic timers whose missed periods were coalesced",
        )?;
        let interrupted_sleeps = IntCounter::new(
            "nostime_interrupted_sleeps_total",
            "Virtual clock sleeps cut short by a signal",
        )?;
        let armed_timers = IntGauge::new(
            "nostime_armed_timers",
            "Timers armed after the most recent dispatch",
        )?;

        registry.register(Box::new(timer_expirations.clone()))?;
        registry.register(Box::new(timer_overruns.clone()))?;
        registry.register(Box::new(interrupted_sleeps.clone()))?;
        registry.register(Box::new(armed_timers.clone()))?;

        Ok(Self {
            registry,
            timer_expirations,
            timer_overruns,
            interrupted_sleeps,
            armed_timers,
        })
    }

    /// Records the outcome of one dispatch call.
    pub fn record_dispatch(&self, fired: u64, overruns: u64, armed: i64) {
        self.timer_expirations.inc_by(fired);
        self.timer_overruns.inc_by(overruns);
        self.armed_timers.set(armed);
    }

    pub fn inc_interrupted_sleeps(&self) {
        self.interrupted_sleeps.inc();
    }

    /// Text exposition format.
    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::<u8>::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
