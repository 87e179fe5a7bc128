//! Monitor Integration Tests for netpulse
//!
//! Drives the full start → sample → fold → snapshot pipeline with scripted
//! probers and counters on tokio's paused clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use netpulse::{
    Counter, CounterError, Monitor, MonitorConfig, ProbeError, Prober, Target,
};

// =============================================================================
// Test Helpers
// =============================================================================

const PROBE_TIMEOUT: Duration = Duration::from_secs(1);
const INTERVAL: Duration = Duration::from_secs(2);

/// Replies after a per-host delay; hosts without an entry never reply.
/// Records every probed host with the (paused) time it was probed at.
#[derive(Default)]
struct ScriptedProber {
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, Duration)>>,
    epoch: Mutex<Option<tokio::time::Instant>>,
}

impl ScriptedProber {
    fn new(delays: &[(&str, u64)]) -> Self {
        Self {
            delays: delays
                .iter()
                .map(|(host, ms)| (host.to_string(), Duration::from_millis(*ms)))
                .collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, Duration)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, target: &Target, _timeout: Duration) -> Result<Duration, ProbeError> {
        let at = {
            let mut epoch = self.epoch.lock().unwrap();
            epoch.get_or_insert_with(tokio::time::Instant::now).elapsed()
        };
        self.calls.lock().unwrap().push((target.to_string(), at));

        match self.delays.get(target.as_str()) {
            Some(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(*delay)
            }
            None => std::future::pending().await,
        }
    }
}

/// Returns scripted readings in order, repeating the last one.
struct ScriptedCounter {
    readings: Vec<u64>,
    next: AtomicUsize,
}

impl ScriptedCounter {
    fn new(readings: &[u64]) -> Self {
        Self {
            readings: readings.to_vec(),
            next: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Counter for ScriptedCounter {
    async fn read_cumulative_bytes(&self) -> Result<u64, CounterError> {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        self.readings
            .get(i.min(self.readings.len().saturating_sub(1)))
            .copied()
            .ok_or_else(|| CounterError::Unavailable("no readings".into()))
    }
}

/// Returns scripted readings in order, `None` being a failed read; repeats
/// the last one.
struct FlakyCounter {
    readings: Vec<Option<u64>>,
    next: AtomicUsize,
}

#[async_trait::async_trait]
impl Counter for FlakyCounter {
    async fn read_cumulative_bytes(&self) -> Result<u64, CounterError> {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        self.readings
            .get(i.min(self.readings.len().saturating_sub(1)))
            .copied()
            .flatten()
            .ok_or_else(|| CounterError::Unavailable("interface gone".into()))
    }
}

/// First read blocks its worker thread, later reads return at once.
#[derive(Default)]
struct SlowFirstCounter {
    reads: AtomicUsize,
}

#[async_trait::async_trait]
impl Counter for SlowFirstCounter {
    async fn read_cumulative_bytes(&self) -> Result<u64, CounterError> {
        if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
            std::thread::sleep(Duration::from_millis(500));
            Ok(1_000)
        } else {
            Ok(5_000)
        }
    }
}

fn config() -> MonitorConfig {
    MonitorConfig::default()
        .with_interval(INTERVAL)
        .with_probe_timeout(PROBE_TIMEOUT)
}

fn monitor(prober: Arc<ScriptedProber>, counter: ScriptedCounter) -> Monitor {
    Monitor::new(prober, Arc::new(counter), &config()).expect("valid config")
}

// =============================================================================
// Statistics Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_fast_and_timed_out_target() {
    let prober = Arc::new(ScriptedProber::new(&[("10.0.0.1", 50)]));
    let monitor = monitor(prober, ScriptedCounter::new(&[0]));

    monitor.start(&["10.0.0.1", "10.0.0.2"]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let snap = monitor.snapshot();
    assert_eq!(snap.interval_count, 1);
    assert_eq!(snap.low_latency_pct, 100.0);
    assert_eq!(snap.high_latency_pct, 0.0);
    assert_eq!(snap.sample_count, 1);
    assert_eq!(snap.failed_probe_count, 1);

    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_counts_match_successful_probes() {
    let prober = Arc::new(ScriptedProber::new(&[
        ("10.0.0.1", 20),
        ("10.0.0.2", 250),
        ("10.0.0.3", 199),
    ]));
    let monitor = monitor(prober, ScriptedCounter::new(&[0]));

    monitor
        .start(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"])
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(7_500)).await;

    let snap = monitor.snapshot();
    assert_eq!(snap.interval_count, 3);
    assert_eq!(snap.low_latency_count, 6);
    assert_eq!(snap.high_latency_count, 3);
    assert_eq!(snap.sample_count, snap.low_latency_count + snap.high_latency_count);
    assert_eq!(snap.failed_probe_count, 3);
    assert!((snap.low_latency_pct - 200.0 / 3.0).abs() < 1e-9);

    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_throughput_deltas_follow_counter() {
    let prober = Arc::new(ScriptedProber::default());
    let readings = [10_000, 10_400, 12_000, 12_000, 15_500];
    let monitor = monitor(prober, ScriptedCounter::new(&readings));

    monitor.start::<&str>(&[]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(8_500)).await;
    monitor.stop().await;

    let snap = monitor.snapshot();
    assert_eq!(snap.throughput_series, vec![0, 400, 1_600, 0, 3_500]);
    assert_eq!(snap.last_cumulative_bytes, Some(15_500));
}

#[tokio::test(start_paused = true)]
async fn test_empty_targets_still_sample_throughput() {
    let prober = Arc::new(ScriptedProber::default());
    let monitor = monitor(Arc::clone(&prober), ScriptedCounter::new(&[0, 100, 300]));

    monitor.start::<&str>(&[]).await.unwrap();
    assert!(monitor.is_running().await);
    tokio::time::sleep(Duration::from_millis(4_500)).await;

    let snap = monitor.snapshot();
    assert_eq!(snap.throughput_series, vec![0, 100, 200]);
    assert_eq!(snap.sample_count, 0);
    assert_eq!(snap.low_latency_pct, 0.0);
    assert_eq!(snap.high_latency_pct, 0.0);
    assert!(!snap.low_latency_pct.is_nan());
    assert!(prober.calls().is_empty());

    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_counter_failure_mid_run_keeps_session() {
    let prober = Arc::new(ScriptedProber::default());
    let counter = FlakyCounter {
        readings: vec![Some(1_000), None, Some(1_500)],
        next: AtomicUsize::new(0),
    };
    let monitor = Monitor::new(prober, Arc::new(counter), &config()).unwrap();

    monitor.start::<&str>(&[]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(monitor.is_running().await);
    assert_eq!(monitor.snapshot().last_cumulative_bytes, Some(1_000));

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    assert!(monitor.is_running().await);

    let snap = monitor.snapshot();
    assert_eq!(snap.interval_count, 3);
    assert_eq!(snap.throughput_series, vec![0, 0, 500]);
    assert_eq!(snap.last_cumulative_bytes, Some(1_500));

    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_snapshots_never_decrease() {
    let prober = Arc::new(ScriptedProber::new(&[("10.0.0.1", 10), ("10.0.0.2", 300)]));
    let monitor = Arc::new(monitor(prober, ScriptedCounter::new(&[0])));
    monitor.start(&["10.0.0.1", "10.0.0.2"]).await.unwrap();

    let reader = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move {
            let mut last = 0;
            for _ in 0..200 {
                let snap = monitor.snapshot();
                assert!(snap.low_latency_count + snap.high_latency_count >= last);
                last = snap.low_latency_count + snap.high_latency_count;
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            last
        })
    };

    let observed = reader.await.unwrap();
    assert!(observed >= 8);
    monitor.stop().await;
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_stop_right_after_start() {
    let prober = Arc::new(ScriptedProber::default());
    let monitor = monitor(prober, ScriptedCounter::new(&[0]));

    monitor.start(&["10.0.0.7"]).await.unwrap();
    let start = tokio::time::Instant::now();
    monitor.stop().await;

    assert!(start.elapsed() <= PROBE_TIMEOUT);
    assert!(!monitor.is_running().await);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_inflight_probes() {
    let prober = Arc::new(ScriptedProber::default());
    let monitor = monitor(Arc::clone(&prober), ScriptedCounter::new(&[0]));

    monitor.start(&["10.0.0.7", "10.0.0.8"]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(prober.calls().len(), 2);

    let start = tokio::time::Instant::now();
    monitor.stop().await;
    assert!(start.elapsed() <= PROBE_TIMEOUT);
    assert!(!monitor.is_running().await);

    // Nothing keeps probing after stop.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(prober.calls().len(), 2);
    assert_eq!(monitor.snapshot().interval_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_reconfigure_applies_from_next_interval() {
    let prober = Arc::new(ScriptedProber::new(&[("10.0.0.1", 500), ("10.0.0.3", 30)]));
    let monitor = monitor(Arc::clone(&prober), ScriptedCounter::new(&[0]));

    monitor.start(&["10.0.0.1"]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let session = monitor.session_id().await;

    // Mid-interval: the in-flight interval keeps the old list.
    monitor.start(&["10.0.0.3", "10.0.0.3"]).await.unwrap();
    assert!(monitor.is_running().await);
    assert_eq!(monitor.session_id().await, session);
    assert_eq!(monitor.targets().len(), 2);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let snap = monitor.snapshot();
    assert_eq!(snap.interval_count, 1);
    assert_eq!(snap.high_latency_count, 1);

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    let snap = monitor.snapshot();
    assert_eq!(snap.interval_count, 2);
    // Stats carry over: one high from the old list, two lows from the new one.
    assert_eq!(snap.high_latency_count, 1);
    assert_eq!(snap.low_latency_count, 2);

    let calls = prober.calls();
    let hosts: Vec<_> = calls.iter().map(|(h, _)| h.as_str()).collect();
    assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.3", "10.0.0.3"]);
    assert!(calls[1].1 >= Duration::from_millis(2_500));

    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_restart_gives_fresh_session() {
    let prober = Arc::new(ScriptedProber::new(&[("10.0.0.1", 300)]));
    let monitor = monitor(prober, ScriptedCounter::new(&[0, 50, 80, 200]));

    monitor.start(&["10.0.0.1"]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2_700)).await;
    assert_eq!(monitor.snapshot().sample_count, 2);
    monitor.stop().await;
    assert!(!monitor.is_running().await);

    monitor.start(&["10.0.0.1"]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    let snap = monitor.snapshot();
    assert_eq!(snap.sample_count, 1);
    assert_eq!(snap.high_latency_count, 1);
    assert_eq!(snap.throughput_series, vec![0]);
    monitor.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_start_racing_stop_gets_clean_session() {
    let prober = Arc::new(ScriptedProber::new(&[("10.0.0.1", 50), ("10.0.0.2", 250)]));
    let monitor = Arc::new(
        Monitor::new(prober, Arc::new(SlowFirstCounter::default()), &config()).unwrap(),
    );

    monitor.start(&["10.0.0.1"]).await.unwrap();
    // The old loop is now stuck in its counter read.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stopper = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move { monitor.stop().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    monitor.start(&["10.0.0.2"]).await.unwrap();
    stopper.await.unwrap();
    assert!(monitor.is_running().await);

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    let snap = monitor.snapshot();
    // Nothing from the old session leaks into the new one.
    assert_eq!(snap.low_latency_count, 0);
    assert_eq!(snap.high_latency_count, 1);
    assert_eq!(snap.interval_count, 1);
    assert_eq!(snap.throughput_series, vec![0]);
    assert_eq!(snap.last_cumulative_bytes, Some(5_000));

    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_invalid_target_rejected_at_start() {
    let prober = Arc::new(ScriptedProber::default());
    let monitor = monitor(prober, ScriptedCounter::new(&[0]));

    let err = monitor.start(&["10.0.0.1", "bad host name"]).await.unwrap_err();
    assert!(err.to_string().contains("bad host name"));
    assert!(!monitor.is_running().await);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_sample_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/netpulse.yaml");
    let config = MonitorConfig::load(path).expect("sample config is valid");

    assert_eq!(config.targets.len(), 3);
    assert_eq!(config.interval, INTERVAL);
    assert_eq!(config.latency_threshold_ms, 200);
    assert_eq!(config.history_capacity, 300);
}
