//! End-to-end tests for the dispatch loop with stub transports.
//!
//! All tests run on a paused tokio clock, so ticks and latencies are exact
//! and the suite finishes instantly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use loadgen::{
    ConfigError, DispatchLoop, InteractionRequest, LoadConfig, LoopState, MetricsSink, RecordingSink,
    RequestExecutor, ScheduleParameters, SessionFactory, Tick, Transport, TransportError,
};

// ============================================================================
// Stub transports
// ============================================================================

/// Always fails as if the request timed out.
struct TimeoutTransport {
    calls: AtomicU64,
}

#[async_trait]
impl Transport for TimeoutTransport {
    async fn send(&self, _request: InteractionRequest<'_>) -> Result<u16, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Timeout)
    }
}

/// Responds with a fixed status after a fixed delay.
struct FixedTransport {
    status: u16,
    latency: Duration,
    calls: AtomicU64,
}

impl FixedTransport {
    fn new(status: u16, latency: Duration) -> Self {
        Self {
            status,
            latency,
            calls: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Transport for FixedTransport {
    async fn send(&self, _request: InteractionRequest<'_>) -> Result<u16, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        Ok(self.status)
    }
}

/// Cycles through success, error status and connection failure.
struct MixedTransport {
    calls: AtomicU64,
}

#[async_trait]
impl Transport for MixedTransport {
    async fn send(&self, _request: InteractionRequest<'_>) -> Result<u16, TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10 * (n % 7))).await;
        match n % 3 {
            0 => Ok(200),
            1 => Ok(500),
            _ => Err(TransportError::Connect("connection refused".to_string())),
        }
    }
}

/// Panics on every other call, like a misbehaving third-party client.
struct PanickingTransport {
    calls: AtomicU64,
}

#[async_trait]
impl Transport for PanickingTransport {
    async fn send(&self, _request: InteractionRequest<'_>) -> Result<u16, TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n % 2 == 1 {
            panic!("transport blew up on call {}", n);
        }
        Ok(200)
    }
}

fn actions() -> Vec<String> {
    vec![
        "book_ticket".to_string(),
        "cancel_ticket".to_string(),
        "give_feedback".to_string(),
    ]
}

fn params(base_rps: f64, ramp_factor: f64, run_duration_secs: f64) -> ScheduleParameters {
    ScheduleParameters {
        base_rps,
        ramp_factor,
        ramp_interval_secs: 1.0,
        run_duration_secs,
    }
}

fn build(
    params: ScheduleParameters,
    transport: Arc<dyn Transport>,
    sink: Arc<RecordingSink>,
) -> DispatchLoop {
    let executor = RequestExecutor::new("http://target/api/interactions", transport, sink);
    let sessions = SessionFactory::seeded(actions(), Some(2024)).unwrap();
    DispatchLoop::new(params, executor, sessions).unwrap()
}

// ============================================================================
// Outcome accounting
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_always_timeout_counts_every_request_as_error() {
    let transport = Arc::new(TimeoutTransport {
        calls: AtomicU64::new(0),
    });
    let sink = Arc::new(RecordingSink::new());
    // 4 ticks of batch size 3
    let mut dispatch = build(params(3.0, 1.0, 4.0), transport.clone(), sink.clone());

    let summary = dispatch.run().await;

    assert_eq!(summary.ticks, 4);
    assert_eq!(summary.dispatched, 12);
    assert_eq!(summary.errors, 12);
    assert_eq!(summary.total_requests, 0);
    assert_eq!(sink.totals().observations, 0);
    assert!(summary.latency.is_none());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 12);
}

#[tokio::test(start_paused = true)]
async fn test_fixed_latency_success_records_every_observation() {
    let latency = Duration::from_millis(50);
    let transport = Arc::new(FixedTransport::new(200, latency));
    let sink = Arc::new(RecordingSink::new());
    // 3 ticks of batch size 5
    let mut dispatch = build(params(5.0, 1.0, 3.0), transport, sink.clone());

    let summary = dispatch.run().await;

    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.total_requests, 15);
    assert_eq!(summary.errors, 0);

    let totals = sink.totals();
    assert_eq!(totals.observations, 15);

    let counts = sink.latency_counts();
    assert_eq!(counts.iter().map(|(_, c)| c).sum::<u64>(), 15);
    for (micros, _) in counts {
        assert!(
            (49_000..=51_000).contains(&micros),
            "latency {}us outside tolerance",
            micros
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_error_status_counts_errors_with_latency() {
    let transport = Arc::new(FixedTransport::new(404, Duration::from_millis(5)));
    let sink = Arc::new(RecordingSink::new());
    let mut dispatch = build(params(2.0, 1.0, 2.0), transport, sink.clone());

    let summary = dispatch.run().await;

    assert_eq!(summary.errors, 4);
    assert_eq!(summary.total_requests, 0);
    assert_eq!(sink.totals().observations, 4);
}

#[tokio::test(start_paused = true)]
async fn test_mixed_outcomes_each_counted_once() {
    let transport = Arc::new(MixedTransport {
        calls: AtomicU64::new(0),
    });
    let sink = Arc::new(RecordingSink::new());
    let mut dispatch = build(params(10.0, 1.5, 6.0), transport.clone(), sink.clone());

    let summary = dispatch.run().await;

    let calls = transport.calls.load(Ordering::SeqCst);
    assert_eq!(calls, summary.dispatched);
    assert_eq!(summary.total_requests + summary.errors, summary.dispatched);
    assert!(summary.accounts_for_all_dispatched());
    // Only connection failures skip the latency histogram
    let failures = (0..calls).filter(|n| n % 3 == 2).count() as u64;
    assert_eq!(sink.totals().observations, calls - failures);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_task_counted_as_error() {
    let transport = Arc::new(PanickingTransport {
        calls: AtomicU64::new(0),
    });
    let sink = Arc::new(RecordingSink::new());
    let mut dispatch = build(params(4.0, 1.0, 2.0), transport.clone(), sink);

    let summary = dispatch.run().await;

    assert_eq!(summary.dispatched, 8);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 8);
    assert_eq!(summary.total_requests, 4);
    assert_eq!(summary.errors, 4);
    assert!(summary.accounts_for_all_dispatched());
}

// ============================================================================
// Schedule behaviour
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_doubling_ramp_batches() {
    let transport = Arc::new(FixedTransport::new(200, Duration::ZERO));
    let sink = Arc::new(RecordingSink::new());
    let ticks = Arc::new(Mutex::new(Vec::<Tick>::new()));
    let ticks_clone = ticks.clone();

    let mut dispatch = build(params(1.0, 2.0, 3.0), transport, sink.clone())
        .with_tick_observer(move |tick| ticks_clone.lock().unwrap().push(*tick));

    let summary = dispatch.run().await;

    let ticks = ticks.lock().unwrap();
    let batches: Vec<usize> = ticks.iter().map(|t| t.batch_size).collect();
    assert_eq!(batches, vec![1, 2, 4]);
    for (tick, expected) in ticks.iter().zip([1.0, 2.0, 4.0]) {
        assert!((tick.target_rps - expected).abs() < 0.01);
    }
    assert_eq!(summary.total_requests, 7);
    assert!((sink.target_rate() - 4.0).abs() < 0.01);
}

#[tokio::test(start_paused = true)]
async fn test_tiny_rate_still_sends_one_per_tick() {
    let transport = Arc::new(FixedTransport::new(200, Duration::ZERO));
    let sink = Arc::new(RecordingSink::new());
    let mut dispatch = build(params(0.01, 1.0, 5.0), transport, sink);

    let summary = dispatch.run().await;

    assert_eq!(summary.ticks, 5);
    assert_eq!(summary.dispatched, 5);
    assert_eq!(summary.total_requests, 5);
}

#[tokio::test(start_paused = true)]
async fn test_overrunning_batch_is_not_caught_up() {
    // Each batch takes 2.5s of a 1s tick
    let transport = Arc::new(FixedTransport::new(200, Duration::from_millis(2_500)));
    let sink = Arc::new(RecordingSink::new());
    let elapsed = Arc::new(Mutex::new(Vec::new()));
    let elapsed_clone = elapsed.clone();

    let mut dispatch = build(params(1.0, 1.0, 5.0), transport, sink.clone())
        .with_tick_observer(move |tick| elapsed_clone.lock().unwrap().push(tick.elapsed_secs));

    let summary = dispatch.run().await;

    // Ticks at 0s and 2.5s; the run ends when the second batch drains at 5s
    assert_eq!(summary.ticks, 2);
    assert_eq!(summary.dispatched, 2);
    let elapsed = elapsed.lock().unwrap();
    assert!((elapsed[1] - 2.5).abs() < 0.01);
    assert!(summary.runtime_seconds >= 5.0);
    assert!(sink.achieved_rate() < 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_final_batch_drains_past_deadline() {
    let transport = Arc::new(FixedTransport::new(200, Duration::from_millis(1_500)));
    let sink = Arc::new(RecordingSink::new());
    let mut dispatch = build(params(4.0, 1.0, 1.0), transport.clone(), sink);

    let summary = dispatch.run().await;

    // The only tick started before the deadline and was allowed to finish
    assert_eq!(summary.ticks, 1);
    assert_eq!(summary.total_requests, 4);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 4);
    assert!(summary.runtime_seconds >= 1.5);
    assert!(summary.runtime_seconds < 1.6);
}

#[tokio::test(start_paused = true)]
async fn test_batch_requests_run_concurrently() {
    // Ten 800ms requests per tick only fit in a 1s tick when they overlap
    let transport = Arc::new(FixedTransport::new(200, Duration::from_millis(800)));
    let sink = Arc::new(RecordingSink::new());
    let mut dispatch = build(params(10.0, 1.0, 2.0), transport.clone(), sink);

    let summary = dispatch.run().await;

    assert_eq!(summary.ticks, 2);
    assert_eq!(summary.dispatched, 20);
    assert_eq!(summary.total_requests, 20);
    assert!(summary.runtime_seconds < 2.5);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_state_subscriber_sees_draining() {
    let transport = Arc::new(FixedTransport::new(200, Duration::from_millis(100)));
    let sink = Arc::new(RecordingSink::new());
    let mut dispatch = build(params(1.0, 1.0, 2.0), transport, sink);

    let mut states = dispatch.subscribe_state();
    let initial = *states.borrow();
    let watcher = tokio::spawn(async move {
        let mut seen = vec![initial];
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            seen.push(state);
            if state == LoopState::Finished {
                break;
            }
        }
        seen
    });

    let summary = dispatch.run().await;
    let seen = watcher.await.unwrap();

    assert_eq!(summary.ticks, 2);
    assert_eq!(
        seen,
        vec![
            LoopState::Idle,
            LoopState::Running,
            LoopState::Draining,
            LoopState::Finished
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_deadline_during_batch_enters_draining() {
    // First tick is not the last by schedule, but its batch outlives the run
    let transport = Arc::new(FixedTransport::new(200, Duration::from_millis(3_000)));
    let sink = Arc::new(RecordingSink::new());
    let mut dispatch = build(params(1.0, 1.0, 2.0), transport, sink);

    let mut states = dispatch.subscribe_state();
    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            seen.push((state, tokio::time::Instant::now()));
            if state == LoopState::Finished {
                break;
            }
        }
        seen
    });

    let start = tokio::time::Instant::now();
    let summary = dispatch.run().await;
    let seen = watcher.await.unwrap();

    assert_eq!(summary.ticks, 1);
    let draining_at = seen
        .iter()
        .find(|(state, _)| *state == LoopState::Draining)
        .map(|(_, at)| at.duration_since(start))
        .unwrap();
    assert!(draining_at >= Duration::from_secs(2));
    assert!(draining_at < Duration::from_secs(3));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_empty_actions_rejected_before_dispatch() {
    let transport = Arc::new(TimeoutTransport {
        calls: AtomicU64::new(0),
    });

    let mut config = LoadConfig::new("http://target/api/interactions");
    config.actions.clear();
    assert_eq!(config.validate(), Err(ConfigError::EmptyActions));

    let sessions = SessionFactory::seeded(config.actions.clone(), config.seed);
    assert!(matches!(sessions, Err(ConfigError::EmptyActions)));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}
