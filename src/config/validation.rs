//! Configuration validation utilities.

use std::time::Duration;

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Parse duration string using humantime.
///
/// Supports `2s`, `500ms`, `1m30s` and the other humantime formats.
///
/// # Examples
///
/// ```
/// use netpulse::config::parse_duration;
///
/// assert_eq!(parse_duration("2s").unwrap().as_secs(), 2);
/// assert_eq!(parse_duration("1500ms").unwrap().as_millis(), 1500);
/// assert_eq!(parse_duration("1m").unwrap().as_secs(), 60);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Check that `value` lies within `[min, max]`.
pub(crate) fn check_range(
    field: &str,
    value: Duration,
    min: Duration,
    max: Option<Duration>,
) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::ValidationError(format!(
            "{field} must be at least {}, got {}",
            humantime::format_duration(min),
            humantime::format_duration(value)
        )));
    }
    if let Some(max) = max
        && value > max
    {
        return Err(ConfigError::ValidationError(format!(
            "{field} must be at most {}, got {}",
            humantime::format_duration(max),
            humantime::format_duration(value)
        )));
    }
    Ok(())
}
