//! Host network byte counters.
//!
//! [`Counter`] reports the cumulative bytes sent plus received across all
//! interfaces. [`SysinfoCounter`] reads the kernel interface totals, which
//! count from OS boot (or interface creation), not from process start.

use std::sync::{Arc, Mutex};

use sysinfo::Networks;
use thiserror::Error;

/// Errors reading the byte counter.
#[derive(Debug, Error)]
pub enum CounterError {
    /// The OS statistics source could not be read.
    #[error("network counters unavailable: {0}")]
    Unavailable(String),
}

/// Cumulative byte counter capability.
#[async_trait::async_trait]
pub trait Counter: Send + Sync + 'static {
    /// Current sent+received byte total.
    ///
    /// Non-decreasing unless the underlying counter wraps or an interface
    /// disappears; callers compute deltas and never assume a zero baseline.
    async fn read_cumulative_bytes(&self) -> Result<u64, CounterError>;
}

/// Counter over `sysinfo` interface statistics.
///
/// The refresh reads `/proc` (or the platform equivalent) synchronously, so
/// it runs on the blocking pool rather than a runtime worker.
pub struct SysinfoCounter {
    networks: Arc<Mutex<Networks>>,
}

impl SysinfoCounter {
    /// Create a counter with the current interface list loaded.
    pub fn new() -> Self {
        Self {
            networks: Arc::new(Mutex::new(Networks::new_with_refreshed_list())),
        }
    }
}

impl Default for SysinfoCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SysinfoCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoCounter").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Counter for SysinfoCounter {
    async fn read_cumulative_bytes(&self) -> Result<u64, CounterError> {
        let networks = Arc::clone(&self.networks);
        tokio::task::spawn_blocking(move || {
            let mut networks = networks
                .lock()
                .map_err(|_| CounterError::Unavailable("counter state poisoned".into()))?;
            sum_interfaces(&mut networks)
        })
        .await
        .map_err(|e| CounterError::Unavailable(format!("counter task failed: {e}")))?
    }
}

fn sum_interfaces(networks: &mut Networks) -> Result<u64, CounterError> {
    networks.refresh(true);

    if networks.is_empty() {
        return Err(CounterError::Unavailable("no network interfaces found".into()));
    }

    Ok(networks
        .iter()
        .map(|(_, data)| data.total_received().saturating_add(data.total_transmitted()))
        .fold(0u64, u64::saturating_add))
}
