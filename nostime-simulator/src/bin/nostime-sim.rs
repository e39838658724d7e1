//! Runs the virtual time stack against a paced tick driver and reports what
//! the timers and a sleeping worker observed.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use nostime_config::NosTimeConfig;
use nostime_core::notify::ChannelNotifier;
use nostime_core::prelude::*;
use nostime_core::signal::ThreadSignal;
use nostime_simulator::TimeSystem;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "nostime-sim", version, about = "Virtual clock simulation driver")]
struct Args {
    /// Configuration file; the layered defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured number of driver steps
    #[arg(short, long)]
    steps: Option<u64>,

    /// Number of periodic demo timers to arm
    #[arg(short, long, default_value_t = 3)]
    timers: u64,

    /// Period of the first demo timer in virtual milliseconds
    #[arg(short, long, default_value_t = 100)]
    period_ms: u64,

    /// Drive the clock as fast as possible instead of pacing steps
    #[arg(long)]
    unpaced: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => NosTimeConfig::load_from_path(path),
        None => NosTimeConfig::load(),
    }
    .context("Failed to load configuration")?;
    if let Some(steps) = args.steps {
        config.simulator.steps = steps;
    }

    nostime_telemetry::init_logging(&config.telemetry.log_filter)
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))?;

    let (notifier, expirations) = ChannelNotifier::unbounded();
    let system = TimeSystem::new(config.clone(), Arc::new(notifier))?;

    let mut handles = Vec::new();
    for n in 0..args.timers {
        let handle = system.registry.create(NotificationDescriptor::new(n, 14))?;
        let period = TimeValue::from_millis(args.period_ms * (n + 1));
        system
            .registry
            .set_time(handle, ClockMode::Relative, IntervalSpec::periodic(period, period))?;
        info!(%handle, %period, "Armed demo timer");
        handles.push(handle);
    }

    // Sleeps for a quarter of the run, then is woken early by the main thread.
    let signal = Arc::new(ThreadSignal::new());
    let sleeper = system.sleeper(signal.clone());
    let nap = TimeValue::from_ticks(
        config.simulator.steps.saturating_mul(config.simulator.ticks_per_step) / 4,
        system.clock.tick_rate(),
    );
    let worker = thread::Builder::new()
        .name("nostime-sleeper".into())
        .spawn(move || sleeper.sleep(ClockMode::Relative, nap))?;

    let summary = if args.unpaced {
        let driver = system.driver();
        let summary = driver.run(config.simulator.steps);
        signal.raise();
        summary
    } else {
        let driver = system.spawn_driver()?;
        thread::sleep(Duration::from_micros(config.simulator.step_period_us) * 2);
        signal.raise();
        driver.join()?
    };

    match worker.join() {
        Ok(Ok(outcome)) => info!(
            interrupted = outcome.interrupted,
            remaining = %outcome.remaining,
            "Sleeper finished"
        ),
        Ok(Err(e)) => warn!(error = %e, "Sleeper failed"),
        Err(_) => warn!("Sleeper thread panicked"),
    }

    let delivered = expirations.try_iter().count();
    info!(
        steps = summary.steps,
        fired = summary.fired,
        overruns = summary.overruns,
        delivered,
        virtual_time = %system.clock.time(),
        "Simulation complete"
    );

    match system.translator().offset() {
        Ok(offset) => info!(%offset, "Virtual clock offset from real time"),
        Err(e) => warn!(error = %e, "Could not read real time"),
    }

    for handle in handles {
        system.registry.delete(handle)?;
    }

    if let Some(metrics) = &system.metrics {
        print!("{}", metrics.gather_metrics()?);
    }

    Ok(())
}
