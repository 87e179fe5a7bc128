//! Monitor configuration structures.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::probe::Target;
use crate::stats::{DEFAULT_HISTORY_CAPACITY, DEFAULT_LATENCY_THRESHOLD_MS};

use super::validation::{ConfigError, check_range};

// =============================================================================
// Constants
// =============================================================================

/// Default period between intervals (2 seconds).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Default per-probe timeout (2 seconds).
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Default period between snapshot reports in the binary (5 seconds).
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Minimum allowed interval and report period.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Maximum allowed probe timeout.
pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Monitor Configuration
// =============================================================================

/// Tunables for the monitoring loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Hosts to probe each interval.
    pub targets: Vec<Target>,

    /// Period slept between intervals (default: 2s).
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Per-probe timeout (default: 2s).
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,

    /// Latencies below this are "low", at or above are "high" (default: 200).
    pub latency_threshold_ms: u64,

    /// Throughput points kept in the rolling series (default: 300).
    pub history_capacity: usize,

    /// How often the binary prints a snapshot (default: 5s).
    #[serde(with = "humantime_serde")]
    pub report_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            interval: DEFAULT_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            latency_threshold_ms: DEFAULT_LATENCY_THRESHOLD_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("interval", self.interval, MIN_INTERVAL, None)?;
        check_range(
            "probe_timeout",
            self.probe_timeout,
            Duration::from_millis(1),
            Some(MAX_PROBE_TIMEOUT),
        )?;
        check_range("report_interval", self.report_interval, MIN_INTERVAL, None)?;

        if self.latency_threshold_ms == 0 {
            return Err(ConfigError::ValidationError(
                "latency_threshold_ms must be positive".to_string(),
            ));
        }

        if self.history_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "history_capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Set the target list.
    pub fn with_targets(mut self, targets: Vec<Target>) -> Self {
        self.targets = targets;
        self
    }

    /// Set the interval period.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the latency threshold.
    pub fn with_latency_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.latency_threshold_ms = threshold_ms;
        self
    }

    /// Set the throughput history capacity.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Set the report period.
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_monitor_config_default() {
        let config = MonitorConfig::default();
        assert!(config.targets.is_empty());
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.probe_timeout, DEFAULT_PROBE_TIMEOUT);
        assert_eq!(config.latency_threshold_ms, 200);
        assert_eq!(config.history_capacity, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_monitor_config_builder() {
        let config = MonitorConfig::default()
            .with_targets(vec![Target::parse("1.1.1.1").unwrap()])
            .with_interval(Duration::from_secs(5))
            .with_probe_timeout(Duration::from_secs(1))
            .with_latency_threshold_ms(100)
            .with_history_capacity(10)
            .with_report_interval(Duration::from_secs(10));

        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.probe_timeout, Duration::from_secs(1));
        assert_eq!(config.latency_threshold_ms, 100);
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.report_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_config_validation_invalid() {
        let zero_threshold = MonitorConfig::default().with_latency_threshold_ms(0);
        assert!(zero_threshold.validate().is_err());

        let zero_capacity = MonitorConfig::default().with_history_capacity(0);
        assert!(zero_capacity.validate().is_err());

        let fast = MonitorConfig::default().with_interval(Duration::from_millis(10));
        assert!(
            fast.validate()
                .unwrap_err()
                .to_string()
                .contains("interval must be at least")
        );

        let slow_probe = MonitorConfig::default().with_probe_timeout(Duration::from_secs(31));
        assert!(slow_probe.validate().is_err());

        let no_probe = MonitorConfig::default().with_probe_timeout(Duration::ZERO);
        assert!(no_probe.validate().is_err());
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "targets:\n  - 8.8.8.8\n  - example.com\ninterval: 3s\nprobe_timeout: 1500ms\nlatency_threshold_ms: 150"
        )
        .unwrap();

        let config = MonitorConfig::load(file.path()).unwrap();
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[1].as_str(), "example.com");
        assert_eq!(config.interval, Duration::from_secs(3));
        assert_eq!(config.probe_timeout, Duration::from_millis(1500));
        assert_eq!(config.latency_threshold_ms, 150);
        assert_eq!(config.history_capacity, DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn test_load_rejects_bad_target() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "targets:\n  - \"not a host\"").unwrap();

        let err = MonitorConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = MonitorConfig::load(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
