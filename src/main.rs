//! netpulse Binary Entry Point
//!
//! Runs the monitor headless and reports snapshots until interrupted.
//! Core functionality is provided by the `netpulse` library crate.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use netpulse::{
    IcmpProber, Monitor, MonitorConfig, StatsSnapshot, SysinfoCounter,
    config::parse_duration, parse_target_list,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// netpulse - host reachability and throughput monitor
#[derive(Parser, Debug)]
#[command(name = "netpulse", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (optional)
    #[arg(short, long, env = "NETPULSE_CONFIG")]
    config: Option<String>,

    /// Comma-separated targets (overrides config file)
    #[arg(short, long, env = "NETPULSE_TARGETS")]
    targets: Option<String>,

    /// Period between intervals, e.g. "2s" (overrides config file)
    #[arg(long, env = "NETPULSE_INTERVAL", value_parser = parse_duration)]
    interval: Option<Duration>,

    /// Per-probe timeout, e.g. "1500ms" (overrides config file)
    #[arg(long, env = "NETPULSE_PROBE_TIMEOUT", value_parser = parse_duration)]
    probe_timeout: Option<Duration>,

    /// Low/high latency boundary in milliseconds (overrides config file)
    #[arg(long, env = "NETPULSE_THRESHOLD_MS")]
    threshold_ms: Option<u64>,

    /// Print snapshots as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,netpulse=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            MonitorConfig::load(path)?
        }
        None => MonitorConfig::default(),
    };

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(targets) = &cli.targets {
        config.targets = parse_target_list(targets)?;
    }
    if let Some(interval) = cli.interval {
        config.interval = interval;
    }
    if let Some(timeout) = cli.probe_timeout {
        config.probe_timeout = timeout;
    }
    if let Some(threshold) = cli.threshold_ms {
        config.latency_threshold_ms = threshold;
    }
    config.validate()?;

    if config.targets.is_empty() {
        tracing::warn!("No targets configured, only throughput will be sampled");
    }

    let prober = IcmpProber::new()?;
    let monitor = Monitor::new(Arc::new(prober), Arc::new(SysinfoCounter::new()), &config)?;
    monitor.start(config.targets.as_slice()).await?;

    let mut ticker = tokio::time::interval(config.report_interval);
    ticker.tick().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => report(&monitor.snapshot(), cli.json)?,
        }
    }

    tracing::info!("Stopping monitor...");
    monitor.stop().await;
    report(&monitor.snapshot(), cli.json)?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Print one snapshot to stdout.
fn report(snapshot: &StatsSnapshot, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
        return Ok(());
    }

    let last_delta = snapshot.throughput_series.last().copied().unwrap_or(0);
    println!(
        "latency low {:.1}% / high {:.1}% ({} samples, {} failed) | last interval {} bytes | {} intervals",
        snapshot.low_latency_pct,
        snapshot.high_latency_pct,
        snapshot.sample_count,
        snapshot.failed_probe_count,
        last_delta,
        snapshot.interval_count,
    );
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
