//! Rolling latency and throughput statistics.
//!
//! [`StatsAggregator`] folds [`IntervalRecord`]s into [`RollingStats`] and
//! publishes each new state as an immutable `Arc`. Readers load the current
//! `Arc` without locking, so a snapshot always reflects whole records.
//!
//! Failed probes are left out of the latency ratio entirely and only show up
//! in `failed_probe_count`.

use std::collections::VecDeque;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sampler::IntervalRecord;

/// Default low/high latency boundary in milliseconds.
pub const DEFAULT_LATENCY_THRESHOLD_MS: u64 = 200;

/// Default number of throughput points kept (10 minutes at 2s intervals).
pub const DEFAULT_HISTORY_CAPACITY: usize = 300;

/// Running state of one session.
#[derive(Debug, Clone, Default)]
pub struct RollingStats {
    pub low_latency_count: u64,
    pub high_latency_count: u64,
    pub failed_probe_count: u64,
    pub interval_count: u64,
    /// Per-interval byte deltas, oldest first, capped at the history capacity.
    pub throughput_series: VecDeque<u64>,
    /// Baseline for the next delta; `None` until a good counter reading.
    pub last_cumulative_bytes: Option<u64>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub last_sample_at: Option<DateTime<Utc>>,
}

/// Point-in-time copy of the statistics handed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub low_latency_pct: f64,
    pub high_latency_pct: f64,
    pub throughput_series: Vec<u64>,
    /// Successful probes classified so far (`low + high`).
    pub sample_count: u64,
    pub low_latency_count: u64,
    pub high_latency_count: u64,
    pub failed_probe_count: u64,
    pub interval_count: u64,
    pub last_cumulative_bytes: Option<u64>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub last_sample_at: Option<DateTime<Utc>>,
}

impl From<&RollingStats> for StatsSnapshot {
    fn from(stats: &RollingStats) -> Self {
        let sample_count = stats.low_latency_count + stats.high_latency_count;
        let pct = |count: u64| {
            if sample_count == 0 {
                0.0
            } else {
                count as f64 / sample_count as f64 * 100.0
            }
        };

        Self {
            low_latency_pct: pct(stats.low_latency_count),
            high_latency_pct: pct(stats.high_latency_count),
            throughput_series: stats.throughput_series.iter().copied().collect(),
            sample_count,
            low_latency_count: stats.low_latency_count,
            high_latency_count: stats.high_latency_count,
            failed_probe_count: stats.failed_probe_count,
            interval_count: stats.interval_count,
            last_cumulative_bytes: stats.last_cumulative_bytes,
            session_started_at: stats.session_started_at,
            last_sample_at: stats.last_sample_at,
        }
    }
}

/// Folds interval records into published rolling statistics.
///
/// `fold` and `reset` must only be called from one task at a time (the
/// monitor loop); `snapshot` may be called from anywhere.
pub struct StatsAggregator {
    state: ArcSwap<RollingStats>,
    latency_threshold_ms: u64,
    history_capacity: usize,
}

impl StatsAggregator {
    pub fn new(latency_threshold_ms: u64, history_capacity: usize) -> Self {
        Self {
            state: ArcSwap::from_pointee(RollingStats::default()),
            latency_threshold_ms,
            history_capacity: history_capacity.max(1),
        }
    }

    /// Discard all state and mark the start of a new session.
    pub fn reset(&self) {
        self.state.store(Arc::new(RollingStats {
            session_started_at: Some(Utc::now()),
            ..RollingStats::default()
        }));
    }

    /// Fold one interval into the running statistics.
    pub fn fold(&self, record: &IntervalRecord) {
        let mut next = RollingStats::clone(&self.state.load());

        for result in &record.results {
            match result.latency_ms {
                Some(ms) if result.succeeded => {
                    if ms < self.latency_threshold_ms {
                        next.low_latency_count += 1;
                    } else {
                        next.high_latency_count += 1;
                    }
                }
                _ => next.failed_probe_count += 1,
            }
        }

        let delta = if record.counter_available {
            let delta = next
                .last_cumulative_bytes
                .map_or(0, |prev| record.cumulative_bytes.saturating_sub(prev));
            next.last_cumulative_bytes = Some(record.cumulative_bytes);
            delta
        } else {
            0
        };

        if next.throughput_series.len() >= self.history_capacity {
            next.throughput_series.pop_front();
        }
        next.throughput_series.push_back(delta);
        next.interval_count += 1;
        next.last_sample_at = Some(record.timestamp);

        self.state.store(Arc::new(next));
    }

    /// Consistent copy of the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot::from(self.state.load().as_ref())
    }

    pub fn latency_threshold_ms(&self) -> u64 {
        self.latency_threshold_ms
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_THRESHOLD_MS, DEFAULT_HISTORY_CAPACITY)
    }
}

impl std::fmt::Debug for StatsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsAggregator")
            .field("latency_threshold_ms", &self.latency_threshold_ms)
            .field("history_capacity", &self.history_capacity)
            .field("interval_count", &self.state.load().interval_count)
            .finish()
    }
}
