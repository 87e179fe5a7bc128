//! Probe target addresses.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest hostname accepted (RFC 1035).
const MAX_HOSTNAME_LEN: usize = 253;

/// Target validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// Address string is empty after trimming.
    #[error("target address is empty")]
    Empty,

    /// Address is neither an IP literal nor a valid hostname.
    #[error("invalid target address: '{0}'")]
    Malformed(String),
}

/// A host to probe: an IP literal or a DNS hostname.
///
/// Construction validates the syntax only; resolution happens at probe time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Target(String);

impl Target {
    /// Parse and validate a target address. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, TargetError> {
        let host = input.trim();
        if host.is_empty() {
            return Err(TargetError::Empty);
        }
        if host.parse::<IpAddr>().is_ok() || is_valid_hostname(host) {
            Ok(Self(host.to_string()))
        } else {
            Err(TargetError::Malformed(host.to_string()))
        }
    }

    /// The address as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address as an IP literal, if it is one.
    pub fn ip(&self) -> Option<IpAddr> {
        self.0.parse().ok()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Target {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Target {
    type Error = TargetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.0
    }
}

impl std::str::FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_valid_hostname(host: &str) -> bool {
    static LABEL_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let regex = LABEL_REGEX.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
            .expect("failed to compile hostname label regex")
    });

    let host = host.strip_suffix('.').unwrap_or(host);
    !host.is_empty() && host.len() <= MAX_HOSTNAME_LEN && host.split('.').all(|l| regex.is_match(l))
}

/// Validate a whole target list, failing on the first bad entry.
pub fn validate_targets<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Target>, TargetError> {
    inputs.iter().map(|s| Target::parse(s.as_ref())).collect()
}

/// Split a comma-separated target list.
///
/// Entries are trimmed and blank entries dropped, so `"10.0.0.1, ,host"`
/// yields two targets. Any remaining malformed entry is an error.
pub fn parse_target_list(input: &str) -> Result<Vec<Target>, TargetError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Target::parse)
        .collect()
}
