//! Monitor lifecycle: start, stop and reconfigure the sampling loop.
//!
//! A [`Monitor`] is either idle or running exactly one session. A session is
//! a single tokio task that repeatedly runs a [`Sampler`] interval, folds the
//! record into the session's own [`StatsAggregator`], then sleeps for the
//! configured period. The task handle and its [`CancellationToken`] are held
//! by the monitor, so `stop` can cancel and join it. The session slot stays
//! locked until the old loop has exited, so no two loops ever overlap.
//!
//! Calling [`Monitor::start`] while a session is running swaps the live
//! target list; the interval already in flight finishes with the old list
//! and the next one picks up the new list. Statistics are kept.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{ConfigError, MonitorConfig};
use crate::counter::Counter;
use crate::probe::{Prober, Target, TargetError, validate_targets};
use crate::sampler::Sampler;
use crate::stats::{StatsAggregator, StatsSnapshot};

/// Errors returned by monitor operations.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A target in the start request is malformed. Nothing was changed.
    #[error(transparent)]
    InvalidTarget(#[from] TargetError),

    /// Monitor tunables are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A running session.
struct Session {
    id: Uuid,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Session {
    fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Controls the monitoring loop.
pub struct Monitor {
    prober: Arc<dyn Prober>,
    counter: Arc<dyn Counter>,
    interval: Duration,
    probe_timeout: Duration,
    latency_threshold_ms: u64,
    history_capacity: usize,
    /// Aggregator of the running (or last) session; replaced on every start.
    stats: ArcSwap<StatsAggregator>,
    targets: Arc<ArcSwap<Vec<Target>>>,
    session: Mutex<Option<Session>>,
}

impl Monitor {
    /// Create an idle monitor.
    ///
    /// Targets in `config` are ignored here; pass them to [`Monitor::start`].
    ///
    /// # Errors
    /// Returns `MonitorError::Config` if `config` fails validation.
    pub fn new(
        prober: Arc<dyn Prober>,
        counter: Arc<dyn Counter>,
        config: &MonitorConfig,
    ) -> Result<Self, MonitorError> {
        config.validate()?;

        Ok(Self {
            prober,
            counter,
            interval: config.interval,
            probe_timeout: config.probe_timeout,
            latency_threshold_ms: config.latency_threshold_ms,
            history_capacity: config.history_capacity,
            stats: ArcSwap::from_pointee(StatsAggregator::new(
                config.latency_threshold_ms,
                config.history_capacity,
            )),
            targets: Arc::new(ArcSwap::from_pointee(Vec::new())),
            session: Mutex::new(None),
        })
    }

    /// Start monitoring `targets`, or replace the live target list if a
    /// session is already running.
    ///
    /// The whole list is validated first; on error nothing changes.
    ///
    /// # Errors
    /// Returns `MonitorError::InvalidTarget` for a malformed address.
    pub async fn start<S: AsRef<str>>(&self, targets: &[S]) -> Result<(), MonitorError> {
        let targets = validate_targets(targets)?;
        let mut session = self.session.lock().await;

        if let Some(active) = session.as_ref().filter(|s| s.is_active()) {
            tracing::info!(
                session = %active.id,
                targets = targets.len(),
                "Reconfiguring targets, effective from next interval"
            );
            self.targets.store(Arc::new(targets));
            return Ok(());
        }

        // Reap a session whose task ended without a stop.
        if let Some(dead) = session.take() {
            if let Err(e) = dead.handle.await {
                tracing::error!(session = %dead.id, error = %e, "Monitoring loop terminated abnormally");
            }
        }

        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        let target_count = targets.len();

        let stats = Arc::new(StatsAggregator::new(
            self.latency_threshold_ms,
            self.history_capacity,
        ));
        stats.reset();
        self.targets.store(Arc::new(targets));
        self.stats.store(Arc::clone(&stats));

        let sampler = Sampler::new(
            Arc::clone(&self.prober),
            Arc::clone(&self.counter),
            self.probe_timeout,
        );
        let handle = tokio::spawn(run_loop(
            id,
            sampler,
            stats,
            Arc::clone(&self.targets),
            self.interval,
            token.clone(),
        ));

        tracing::info!(
            session = %id,
            targets = target_count,
            interval = ?self.interval,
            probe_timeout = ?self.probe_timeout,
            "Monitoring started"
        );
        *session = Some(Session { id, token, handle });
        Ok(())
    }

    /// Stop the running session and wait for its loop to exit.
    ///
    /// An interval in flight is abandoned, so this returns within one probe
    /// timeout. Does nothing when idle. The session slot stays locked until
    /// the loop has exited, so a concurrent `start` waits for it.
    pub async fn stop(&self) {
        let mut slot = self.session.lock().await;
        let Some(session) = slot.take() else {
            return;
        };

        session.token.cancel();
        match session.handle.await {
            Ok(()) => tracing::info!(session = %session.id, "Monitoring stopped"),
            Err(e) => {
                tracing::error!(session = %session.id, error = %e, "Monitoring loop terminated abnormally")
            }
        }
    }

    /// Whether a session loop is currently running.
    pub async fn is_running(&self) -> bool {
        self.session.lock().await.as_ref().is_some_and(Session::is_active)
    }

    /// Id of the running session, if any.
    pub async fn session_id(&self) -> Option<Uuid> {
        self.session
            .lock()
            .await
            .as_ref()
            .filter(|s| s.is_active())
            .map(|s| s.id)
    }

    /// Current statistics of the running (or last) session.
    ///
    /// Never blocks on the loop.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.load().snapshot()
    }

    /// Live target list.
    pub fn targets(&self) -> Vec<Target> {
        self.targets.load().as_ref().clone()
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("interval", &self.interval)
            .field("probe_timeout", &self.probe_timeout)
            .field("targets", &self.targets.load().len())
            .field("stats", &**self.stats.load())
            .finish_non_exhaustive()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.token.cancel();
        }
    }
}

/// Session loop body. Runs until `token` is cancelled.
async fn run_loop(
    id: Uuid,
    mut sampler: Sampler,
    stats: Arc<StatsAggregator>,
    targets: Arc<ArcSwap<Vec<Target>>>,
    interval: Duration,
    token: CancellationToken,
) {
    loop {
        let current = targets.load_full();

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            outcome = AssertUnwindSafe(sampler.run_interval(&current)).catch_unwind() => outcome,
        };

        // A panicking prober or counter costs one interval, not the session.
        match outcome {
            Ok(record) => {
                stats.fold(&record);
                tracing::debug!(
                    session = %id,
                    probes = record.results.len(),
                    succeeded = record.success_count(),
                    "Interval folded"
                );
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(session = %id, reason = %reason, "Interval panicked, record discarded");
            }
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    tracing::debug!(session = %id, "Monitoring loop exited");
}
