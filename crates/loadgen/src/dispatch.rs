//! Tick-driven dispatch loop.
//!
//! Once per tick the loop computes the target rate, fans out a batch of
//! concurrent interactions and waits for the whole batch before sleeping
//! out the rest of the interval. A batch that overruns its interval is not
//! caught up: the schedule falls behind instead of queueing work.

use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info};

use crate::config::ScheduleParameters;
use crate::error::{ConfigError, ConfigResult};
use crate::executor::RequestExecutor;
use crate::metrics::MetricsSink;
use crate::schedule::Tick;
use crate::session::SessionFactory;
use crate::summary::RunSummary;

/// Fixed scheduling granularity.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

// Cap for run durations too large to add to an Instant (~30 years)
const FAR_FUTURE_SECS: u64 = 86_400 * 365 * 30;

/// Lifecycle of a [`DispatchLoop`].
///
/// `Draining` covers the final batch: it is entered when a tick is known to
/// be the last one, or when the deadline passes while a batch is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Draining,
    Finished,
}

type TickObserver = Box<dyn FnMut(&Tick) + Send>;

/// Drives the ramp for the configured duration.
pub struct DispatchLoop<R = StdRng> {
    params: ScheduleParameters,
    run_duration: Duration,
    executor: RequestExecutor,
    sessions: SessionFactory<R>,
    state: watch::Sender<LoopState>,
    on_tick: Option<TickObserver>,
    summary: Option<RunSummary>,
}

impl<R: Rng + Send> DispatchLoop<R> {
    /// Create a loop. Fails if the schedule parameters are invalid.
    pub fn new(
        params: ScheduleParameters,
        executor: RequestExecutor,
        sessions: SessionFactory<R>,
    ) -> ConfigResult<Self> {
        params.validate()?;
        let run_duration = Duration::try_from_secs_f64(params.run_duration_secs)
            .map_err(|e| ConfigError::invalid("run_duration_secs", e.to_string()))?;

        Ok(Self {
            params,
            run_duration,
            executor,
            sessions,
            state: watch::Sender::new(LoopState::Idle),
            on_tick: None,
            summary: None,
        })
    }

    /// Call `observer` with every tick before its batch is dispatched.
    pub fn with_tick_observer(mut self, observer: impl FnMut(&Tick) + Send + 'static) -> Self {
        self.on_tick = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    /// Receiver that sees every state transition while `run` is in progress.
    pub fn subscribe_state(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: LoopState) {
        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    pub fn params(&self) -> &ScheduleParameters {
        &self.params
    }

    /// Run until the configured duration has elapsed.
    ///
    /// Expiry is only checked at tick boundaries; the final batch always
    /// completes. A loop runs once: later calls return the same summary.
    pub async fn run(&mut self) -> RunSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }

        let sink = self.executor.sink().clone();
        let started_at = Utc::now();
        let start = Instant::now();
        let end = start
            .checked_add(self.run_duration)
            .unwrap_or_else(|| start + Duration::from_secs(FAR_FUTURE_SECS));
        self.set_state(LoopState::Running);

        info!(
            target_url = %self.executor.target(),
            base_rps = self.params.base_rps,
            ramp_factor = self.params.ramp_factor,
            ramp_interval_secs = self.params.ramp_interval_secs,
            run_duration_secs = self.params.run_duration_secs,
            "Starting dispatch loop"
        );

        let mut ticks = 0u64;
        let mut dispatched = 0u64;

        loop {
            let tick_start = Instant::now();
            if tick_start >= end {
                break;
            }

            let elapsed = tick_start.duration_since(start).as_secs_f64();
            let tick = Tick::compute(ticks, elapsed, &self.params, TICK_INTERVAL);
            sink.set_target_rate(tick.target_rps);
            if let Some(observer) = self.on_tick.as_mut() {
                observer(&tick);
            }

            // The next tick would start at or after the deadline
            if tick_start + TICK_INTERVAL >= end {
                self.set_state(LoopState::Draining);
            }

            let completed = self.dispatch_batch(tick.batch_size, end).await;
            ticks += 1;
            dispatched += tick.batch_size as u64;

            let batch_time = tick_start.elapsed();
            let achieved_rps = completed as f64 / batch_time.max(TICK_INTERVAL).as_secs_f64();
            sink.set_achieved_rate(achieved_rps);

            debug!(
                tick = tick.index,
                elapsed_secs = elapsed,
                target_rps = tick.target_rps,
                batch_size = tick.batch_size,
                achieved_rps,
                batch_ms = batch_time.as_millis() as u64,
                "Tick complete"
            );

            let next_tick = tick_start + TICK_INTERVAL;
            if Instant::now() < next_tick {
                sleep_until(next_tick).await;
            } else {
                debug!(tick = tick.index, "Batch overran tick interval");
            }
        }

        self.set_state(LoopState::Draining);
        let summary = self.summarize(sink.as_ref(), ticks, dispatched, start.elapsed(), started_at);
        self.set_state(LoopState::Finished);

        info!(
            total_requests = summary.total_requests,
            errors = summary.errors,
            ticks = summary.ticks,
            runtime_secs = summary.runtime_seconds,
            "Dispatch loop finished"
        );

        self.summary = Some(summary.clone());
        summary
    }

    /// Dispatch `size` concurrent interactions and wait for all of them.
    ///
    /// Switches to `Draining` if `end` passes before the batch completes. A
    /// task that dies without producing an outcome is counted as an error.
    async fn dispatch_batch(&mut self, size: usize, end: Instant) -> usize {
        let mut batch = JoinSet::new();
        for _ in 0..size {
            let session = self.sessions.new_session();
            let executor = self.executor.clone();
            batch.spawn(async move { executor.execute(session).await });
        }

        let mut deadline_passed = Instant::now() >= end;
        let mut completed = 0;
        loop {
            tokio::select! {
                joined = batch.join_next() => match joined {
                    Some(Ok(_)) => completed += 1,
                    Some(Err(e)) => {
                        error!(error = %e, panicked = e.is_panic(), "Interaction task failed");
                        self.executor.sink().record_error();
                    }
                    None => break,
                },
                _ = sleep_until(end), if !deadline_passed => {
                    deadline_passed = true;
                    self.set_state(LoopState::Draining);
                }
            }
        }
        completed
    }

    fn summarize(
        &self,
        sink: &dyn MetricsSink,
        ticks: u64,
        dispatched: u64,
        runtime: Duration,
        started_at: chrono::DateTime<Utc>,
    ) -> RunSummary {
        RunSummary::new(
            self.executor.target(),
            sink.totals(),
            sink.latency_summary(),
            ticks,
            dispatched,
            runtime,
            started_at,
        )
    }
}
