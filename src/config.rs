//! Configuration module for netpulse.
//!
//! Provides YAML-based configuration loading and validation for the monitor
//! tunables: targets, interval period, probe timeout, latency threshold and
//! throughput history size.

mod app;
mod validation;

pub use app::MonitorConfig;
pub use validation::{ConfigError, parse_duration};

// Re-export constants
pub use app::{
    DEFAULT_INTERVAL, DEFAULT_PROBE_TIMEOUT, DEFAULT_REPORT_INTERVAL, MAX_PROBE_TIMEOUT,
    MIN_INTERVAL,
};
