//! Core prober trait and error types.

use std::time::Duration;

use thiserror::Error;

use super::Target;

/// Errors a single probe can end with.
///
/// All of these are per-target observations. The sampler records them as a
/// failed [`ProbeResult`](crate::ProbeResult) and keeps going.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No reply arrived within the probe timeout.
    #[error("timeout elapsed")]
    Timeout,

    /// Host could not be reached (ICMP error, no route, socket failure).
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Target could not be turned into an address.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// Network I/O error.
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),
}

/// Reachability probe capability.
///
/// Implementations send one echo request to one target and report the
/// round-trip time. They hold no per-target state and must honour `timeout`
/// themselves; the sampler applies the same bound on top as a backstop.
#[async_trait::async_trait]
pub trait Prober: Send + Sync + 'static {
    /// Probe `target` once.
    ///
    /// # Returns
    ///
    /// - `Ok(rtt)`: the target answered
    /// - `Err(ProbeError)`: the target did not answer in time or could not be probed
    async fn probe(&self, target: &Target, timeout: Duration) -> Result<Duration, ProbeError>;
}
