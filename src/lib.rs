//! netpulse - Host Reachability and Throughput Monitor
//!
//! This crate provides a cancellable sampling engine that periodically probes
//! a set of hosts for round-trip latency and samples the host's cumulative
//! network byte counters, folding both into rolling statistics that can be
//! read at any time. It can be used as a library, or run headless with the
//! `netpulse` executable.
//!
//! # Architecture
//!
//! - **Probe**: [`Prober`] capability and the ICMP [`IcmpProber`]
//! - **Counter**: [`Counter`] capability and the sysinfo-backed [`SysinfoCounter`]
//! - **Sampler**: one interval, all targets probed concurrently
//! - **Stats**: latency classification and bounded throughput history
//! - **Monitor**: start / stop / reconfigure of the sampling loop
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use netpulse::{IcmpProber, Monitor, MonitorConfig, SysinfoCounter};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let monitor = Monitor::new(
//!     Arc::new(IcmpProber::new()?),
//!     Arc::new(SysinfoCounter::new()),
//!     &MonitorConfig::default(),
//! )?;
//!
//! monitor.start(&["1.1.1.1", "8.8.8.8"]).await?;
//! tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//! let snapshot = monitor.snapshot();
//! println!("low latency: {:.1}%", snapshot.low_latency_pct);
//! monitor.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod counter;
pub mod monitor;
pub mod probe;
pub mod sampler;
pub mod stats;

pub use config::{ConfigError, MonitorConfig};
pub use counter::{Counter, CounterError, SysinfoCounter};
pub use monitor::{Monitor, MonitorError};
pub use probe::{IcmpProber, ProbeError, Prober, Target, TargetError, parse_target_list};
pub use sampler::{IntervalRecord, ProbeFailure, ProbeResult, Sampler};
pub use stats::{RollingStats, StatsAggregator, StatsSnapshot};
