//! One monitoring interval: probe every target, then sample the byte counter.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::time::timeout;

use crate::counter::Counter;
use crate::probe::{ProbeError, Prober, Target};

/// Why a probe produced no latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFailure {
    /// No reply before the probe timeout.
    Timeout,
    /// Host answered with an error or the probe could not be sent.
    Unreachable,
    /// Target did not resolve to an address.
    InvalidTarget,
}

impl From<&ProbeError> for ProbeFailure {
    fn from(err: &ProbeError) -> Self {
        match err {
            ProbeError::Timeout => Self::Timeout,
            ProbeError::InvalidTarget(_) => Self::InvalidTarget,
            ProbeError::Unreachable(_) | ProbeError::Network(_) => Self::Unreachable,
        }
    }
}

/// Outcome of probing one target in one interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub target: Target,
    /// Round-trip time rounded to whole milliseconds, `None` on failure.
    pub latency_ms: Option<u64>,
    pub succeeded: bool,
    pub failure: Option<ProbeFailure>,
}

impl ProbeResult {
    /// Successful probe.
    pub fn success(target: Target, rtt: Duration) -> Self {
        Self {
            target,
            latency_ms: Some(duration_to_ms(rtt)),
            succeeded: true,
            failure: None,
        }
    }

    /// Failed probe.
    pub fn failure(target: Target, failure: ProbeFailure) -> Self {
        Self {
            target,
            latency_ms: None,
            succeeded: false,
            failure: Some(failure),
        }
    }
}

/// Everything observed during one interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalRecord {
    pub timestamp: DateTime<Utc>,
    /// One result per target, in the order the targets were given.
    pub results: Vec<ProbeResult>,
    /// Cumulative byte counter at sample time.
    pub cumulative_bytes: u64,
    /// `false` when the counter read failed and `cumulative_bytes` is the
    /// last-known value (or 0).
    pub counter_available: bool,
}

impl IntervalRecord {
    /// Number of probes that got a reply.
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded).count()
    }
}

/// Runs monitoring intervals against injected prober and counter.
///
/// Holds the last good counter reading so a failed read can be papered over
/// for that interval only.
pub struct Sampler {
    prober: Arc<dyn Prober>,
    counter: Arc<dyn Counter>,
    probe_timeout: Duration,
    last_known_bytes: Option<u64>,
}

impl Sampler {
    pub fn new(prober: Arc<dyn Prober>, counter: Arc<dyn Counter>, probe_timeout: Duration) -> Self {
        Self {
            prober,
            counter,
            probe_timeout,
            last_known_bytes: None,
        }
    }

    /// Probe all `targets` concurrently, then read the counter once.
    ///
    /// Total cost is bounded by one probe timeout plus the counter read,
    /// independent of the number of targets. Dropping the returned future
    /// abandons every in-flight probe.
    pub async fn run_interval(&mut self, targets: &[Target]) -> IntervalRecord {
        let probes = targets.iter().map(|target| self.probe_one(target));
        let results = join_all(probes).await;

        let (cumulative_bytes, counter_available) = match self.counter.read_cumulative_bytes().await
        {
            Ok(bytes) => {
                self.last_known_bytes = Some(bytes);
                (bytes, true)
            }
            Err(e) => {
                let fallback = self.last_known_bytes.unwrap_or(0);
                tracing::warn!(error = %e, fallback, "Byte counter read failed, using last known value");
                (fallback, false)
            }
        };

        let record = IntervalRecord {
            timestamp: Utc::now(),
            results,
            cumulative_bytes,
            counter_available,
        };
        tracing::debug!(
            targets = targets.len(),
            succeeded = record.success_count(),
            cumulative_bytes,
            "Interval sampled"
        );
        record
    }

    async fn probe_one(&self, target: &Target) -> ProbeResult {
        let result = timeout(self.probe_timeout, self.prober.probe(target, self.probe_timeout))
            .await
            .unwrap_or(Err(ProbeError::Timeout));

        match result {
            Ok(rtt) => {
                let probe = ProbeResult::success(target.clone(), rtt);
                tracing::debug!(host = %target, latency_ms = ?probe.latency_ms, "Probe successful");
                probe
            }
            Err(e) => {
                tracing::warn!(host = %target, error = %e, "Probe failed");
                ProbeResult::failure(target.clone(), ProbeFailure::from(&e))
            }
        }
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("probe_timeout", &self.probe_timeout)
            .field("last_known_bytes", &self.last_known_bytes)
            .finish_non_exhaustive()
    }
}

fn duration_to_ms(d: Duration) -> u64 {
    (d.as_secs_f64() * 1000.0).round() as u64
}
