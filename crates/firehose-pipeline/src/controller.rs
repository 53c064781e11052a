//! Rate search: warm-up, doubling, bisection.
//!
//! [`search`] is the state machine and only talks to a [`TrialRunner`].
//! [`QueueTrialRunner`] is the production runner that actually paces
//! publishes into the ring. [`RateController`] owns the worker thread and the
//! start/stop lifecycle.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use firehose_core::config::ControllerConfig;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    error::{PipelineError, Result},
    queue::{EventPublisher, QueueGauge},
    types::{seeded_payload, Payload, Phase},
};

/// Shared rate state. Written by the run loop; `target_rate` may also be
/// overwritten by an operator at any time (last write wins).
pub struct RateState {
    target_rate: AtomicU64,
    error_count: AtomicU64,
    phase: AtomicU8,
    lower_bound: AtomicU64,
    upper_bound: AtomicU64,
    stable_rate: AtomicU64,
    trials: AtomicU64,
    running: AtomicBool,
}

impl RateState {
    pub fn new(initial_rate: u64) -> Self {
        Self {
            target_rate: AtomicU64::new(initial_rate),
            error_count: AtomicU64::new(0),
            phase: AtomicU8::new(Phase::Idle.as_u8()),
            lower_bound: AtomicU64::new(0),
            upper_bound: AtomicU64::new(0),
            stable_rate: AtomicU64::new(0),
            trials: AtomicU64::new(0),
            running: AtomicBool::new(false),
        }
    }

    pub fn target_rate(&self) -> u64 {
        self.target_rate.load(Ordering::Relaxed)
    }

    /// Operator override, last write wins.
    ///
    /// A search warms up at the value held when it starts. A write made
    /// during a doubling trial is doubled at the end of that trial and tested
    /// next. Bisection picks its own midpoints and overwrites the field.
    pub fn set_target_rate(&self, rate: u64) {
        self.target_rate.store(rate, Ordering::Relaxed);
    }

    /// Double whatever the field holds now, including an override made
    /// while the last trial ran.
    fn double_target_rate(&self) -> u64 {
        let previous = self
            .target_rate
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |r| {
                Some(r.saturating_mul(2))
            })
            .unwrap_or_else(|r| r);
        previous.saturating_mul(2)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn bounds(&self) -> (u64, u64) {
        (
            self.lower_bound.load(Ordering::Relaxed),
            self.upper_bound.load(Ordering::Relaxed),
        )
    }

    /// Converged rate, 0 until a search reaches `Stable`.
    pub fn stable_rate(&self) -> u64 {
        self.stable_rate.load(Ordering::Relaxed)
    }

    pub fn trials(&self) -> u64 {
        self.trials.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.store(phase.as_u8(), Ordering::Release);
    }

    fn set_bounds(&self, lower: u64, upper: u64) {
        self.lower_bound.store(lower, Ordering::Relaxed);
        self.upper_bound.store(upper, Ordering::Relaxed);
    }

    fn begin_run(&self) {
        self.set_bounds(0, 0);
        self.stable_rate.store(0, Ordering::Relaxed);
        self.trials.store(0, Ordering::Relaxed);
        self.set_phase(Phase::Warmup);
    }
}

/// Outcome of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialResult {
    Passed,
    Failed,
    Cancelled,
}

/// Runs one timed attempt to sustain a rate.
pub trait TrialRunner {
    fn run_trial(&mut self, rate: u64, window: Duration, cancel: &CancellationToken)
        -> TrialResult;
}

/// How a finished search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Stable { rate: u64 },
    Cancelled,
}

/// Timing and convergence settings for [`search`].
#[derive(Debug, Clone, Copy)]
pub struct SearchPlan {
    pub warmup: Duration,
    pub trial: Duration,
    pub min_rate_delta: u64,
}

impl From<&ControllerConfig> for SearchPlan {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            warmup: Duration::from_secs(config.warmup_secs),
            trial: Duration::from_secs(config.trial_secs),
            min_rate_delta: config.min_rate_delta,
        }
    }
}

fn run_counted<R: TrialRunner>(
    runner: &mut R,
    state: &RateState,
    rate: u64,
    window: Duration,
    cancel: &CancellationToken,
) -> TrialResult {
    if cancel.is_cancelled() {
        return TrialResult::Cancelled;
    }
    let result = runner.run_trial(rate, window, cancel);
    if result != TrialResult::Cancelled {
        state.trials.fetch_add(1, Ordering::Relaxed);
    }
    result
}

/// Full search: warm-up, then doubling, then bisection.
///
/// Warm-up runs at whatever `target_rate` holds when the search starts.
/// A failed warm-up is fatal and returns [`PipelineError::WarmupFailed`].
pub fn search<R: TrialRunner>(
    runner: &mut R,
    state: &RateState,
    plan: &SearchPlan,
    cancel: &CancellationToken,
) -> Result<SearchOutcome> {
    state.begin_run();

    let rate = state.target_rate();
    match run_counted(runner, state, rate, plan.warmup, cancel) {
        TrialResult::Passed => {}
        TrialResult::Failed => {
            warn!(rate, "failed during warmup");
            state.set_phase(Phase::Aborted);
            return Err(PipelineError::WarmupFailed { rate });
        }
        TrialResult::Cancelled => return Ok(SearchOutcome::Cancelled),
    }

    state.set_phase(Phase::Doubling);
    let mut previous = 0;
    let failed_rate = loop {
        let rate = state.target_rate();
        match run_counted(runner, state, rate, plan.trial, cancel) {
            TrialResult::Passed => {
                previous = rate;
                let next = state.double_target_rate();
                info!(rate, next, "passed at rate");
            }
            TrialResult::Failed => {
                info!(rate, "failed at rate");
                break rate;
            }
            TrialResult::Cancelled => return Ok(SearchOutcome::Cancelled),
        }
    };

    bisect(runner, state, plan, cancel, previous, failed_rate)
}

/// Bisection between a passing rate and the failing rate tested last.
///
/// The bracket is ordered before use: an operator override can leave the
/// failing rate below the passing one. The first midpoint is compared against
/// `failed`. Stops once the next midpoint is closer than `min_rate_delta` to
/// the rate tested before it and reports that last tested rate.
pub fn bisect<R: TrialRunner>(
    runner: &mut R,
    state: &RateState,
    plan: &SearchPlan,
    cancel: &CancellationToken,
    passed: u64,
    failed: u64,
) -> Result<SearchOutcome> {
    let (mut lower, mut upper) = (passed.min(failed), passed.max(failed));
    state.set_bounds(lower, upper);
    state.set_phase(Phase::Bisecting);

    let mut rate = failed;
    loop {
        let next = lower + (upper - lower) / 2;
        if next.abs_diff(rate) < plan.min_rate_delta {
            info!(rate, "stable at rate");
            state.stable_rate.store(rate, Ordering::Relaxed);
            state.set_target_rate(rate);
            state.set_phase(Phase::Stable);
            return Ok(SearchOutcome::Stable { rate });
        }

        rate = next;
        state.set_target_rate(rate);
        match run_counted(runner, state, rate, plan.trial, cancel) {
            TrialResult::Passed => lower = rate,
            TrialResult::Failed => upper = rate,
            TrialResult::Cancelled => return Ok(SearchOutcome::Cancelled),
        }
        state.set_bounds(lower, upper);
    }
}

/// Paces publishes into the ring and checks the backlog afterwards.
pub struct QueueTrialRunner {
    publisher: EventPublisher,
    state: Arc<RateState>,
    payload: Payload,
    pace: Duration,
    drain_poll: Duration,
    max_drain_polls: u32,
}

impl QueueTrialRunner {
    pub fn new(publisher: EventPublisher, state: Arc<RateState>, config: &ControllerConfig) -> Self {
        Self {
            publisher,
            state,
            payload: seeded_payload(config.payload_seed),
            pace: Duration::from_micros(config.pace_interval_us),
            drain_poll: Duration::from_millis(config.drain_poll_ms),
            max_drain_polls: config.max_drain_polls,
        }
    }

    pub fn into_publisher(self) -> EventPublisher {
        self.publisher
    }

    /// Poll until the backlog is gone. Returns the number of polls taken,
    /// or `None` when cancelled or the poll limit ran out first.
    fn await_drain(&self, cancel: &CancellationToken) -> Option<u32> {
        let mut polls = 0;
        loop {
            thread::sleep(self.drain_poll);
            polls += 1;
            if cancel.is_cancelled() {
                return None;
            }
            if self.publisher.backlog() == 0 {
                return Some(polls);
            }
            if polls >= self.max_drain_polls {
                warn!(polls, backlog = self.publisher.backlog(), "backlog did not clear");
                return None;
            }
        }
    }
}

impl TrialRunner for QueueTrialRunner {
    fn run_trial(&mut self, rate: u64, window: Duration, cancel: &CancellationToken) -> TrialResult {
        // leftovers from an overflowed trial must clear before timing starts
        if self.publisher.backlog() > 0 {
            if cancel.is_cancelled() {
                return TrialResult::Cancelled;
            }
            if self.await_drain(cancel).is_none() {
                return if cancel.is_cancelled() {
                    TrialResult::Cancelled
                } else {
                    TrialResult::Failed
                };
            }
        }
        info!(rate, secs = window.as_secs(), "trial started");

        let window_nanos = window.as_nanos();
        let started = Instant::now();
        let mut sent: u128 = 0;

        loop {
            let elapsed = started.elapsed().as_nanos();
            let due = u128::from(rate) * elapsed / 1_000_000_000;

            while sent < due {
                if cancel.is_cancelled() {
                    return TrialResult::Cancelled;
                }
                if !self.publisher.try_publish(&self.payload) {
                    self.state.record_error();
                    info!(rate, sent = sent as u64, "queue full");
                    return TrialResult::Failed;
                }
                sent += 1;
            }

            if elapsed > window_nanos {
                break;
            }
            if cancel.is_cancelled() {
                return TrialResult::Cancelled;
            }
            thread::sleep(self.pace);
        }

        match self.await_drain(cancel) {
            Some(1) => TrialResult::Passed,
            Some(polls) => {
                info!(rate, polls, "consumer fell behind");
                TrialResult::Failed
            }
            None if cancel.is_cancelled() => TrialResult::Cancelled,
            None => TrialResult::Failed,
        }
    }
}

/// Point-in-time view for the monitoring surface.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub rate: u64,
    pub error_count: u64,
    pub cursor: i64,
    pub phase: Phase,
    pub lower_bound: u64,
    pub upper_bound: u64,
    pub stable_rate: u64,
    pub trials: u64,
    pub running: bool,
    pub backlog: usize,
}

enum Worker {
    Idle(EventPublisher),
    Running {
        cancel: CancellationToken,
        handle: JoinHandle<EventPublisher>,
    },
    /// The publisher was lost to a panicked or unspawnable worker.
    Lost,
}

/// Drives the producer on a dedicated thread. One run at a time.
pub struct RateController {
    state: Arc<RateState>,
    config: ControllerConfig,
    gauge: QueueGauge,
    worker: Mutex<Worker>,
}

impl RateController {
    pub fn new(publisher: EventPublisher, config: ControllerConfig) -> Self {
        Self {
            state: Arc::new(RateState::new(config.initial_rate)),
            gauge: publisher.gauge(),
            config,
            worker: Mutex::new(Worker::Idle(publisher)),
        }
    }

    pub fn state(&self) -> &Arc<RateState> {
        &self.state
    }

    pub fn gauge(&self) -> &QueueGauge {
        &self.gauge
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        let (lower_bound, upper_bound) = self.state.bounds();
        ControllerSnapshot {
            rate: self.state.target_rate(),
            error_count: self.state.error_count(),
            cursor: self.gauge.cursor(),
            phase: self.state.phase(),
            lower_bound,
            upper_bound,
            stable_rate: self.state.stable_rate(),
            trials: self.state.trials(),
            running: self.state.is_running(),
            backlog: self.gauge.backlog(),
        }
    }

    /// Begin a search on a new `rate-controller` thread.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);

        let publisher = match std::mem::replace(&mut *worker, Worker::Lost) {
            Worker::Idle(publisher) => publisher,
            Worker::Running { handle, .. } if handle.is_finished() => {
                handle.join().map_err(|_| PipelineError::WorkerLost)?
            }
            running @ Worker::Running { .. } => {
                *worker = running;
                return Err(PipelineError::AlreadyRunning);
            }
            Worker::Lost => return Err(PipelineError::WorkerLost),
        };

        let cancel = CancellationToken::new();
        let state = Arc::clone(&self.state);
        let config = self.config.clone();
        let token = cancel.clone();

        state.running.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name("rate-controller".to_string())
            .spawn(move || run_search(publisher, state, config, token));

        match spawned {
            Ok(handle) => {
                *worker = Worker::Running { cancel, handle };
                info!(rate = self.state.target_rate(), "rate controller started");
                Ok(())
            }
            Err(e) => {
                self.state.running.store(false, Ordering::Release);
                Err(PipelineError::Spawn(e))
            }
        }
    }

    /// Ask the running search to stop at its next check point.
    pub fn stop(&self) -> Result<()> {
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        match &*worker {
            Worker::Running { cancel, handle } if !handle.is_finished() => {
                cancel.cancel();
                info!("rate controller stop requested");
                Ok(())
            }
            _ => Err(PipelineError::NotRunning),
        }
    }

    /// Block until the current run (if any) has finished.
    pub fn join(&self) -> Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *worker, Worker::Lost) {
            Worker::Running { handle, .. } => {
                let publisher = handle.join().map_err(|_| PipelineError::WorkerLost)?;
                *worker = Worker::Idle(publisher);
                Ok(())
            }
            other => {
                *worker = other;
                Ok(())
            }
        }
    }
}

fn run_search(
    publisher: EventPublisher,
    state: Arc<RateState>,
    config: ControllerConfig,
    cancel: CancellationToken,
) -> EventPublisher {
    let plan = SearchPlan::from(&config);
    let mut runner = QueueTrialRunner::new(publisher, Arc::clone(&state), &config);

    match search(&mut runner, &state, &plan, &cancel) {
        Ok(SearchOutcome::Stable { rate }) => {
            info!(rate, trials = state.trials(), "rate search converged");
        }
        Ok(SearchOutcome::Cancelled) => {
            state.set_phase(Phase::Idle);
            info!("rate search cancelled, exiting");
        }
        Err(e) => warn!("rate search aborted: {e}"),
    }

    state.running.store(false, Ordering::Release);
    runner.into_publisher()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::event_queue;

    /// Passes every rate up to and including `threshold`.
    struct ThresholdModel {
        threshold: u64,
        tested: Vec<u64>,
    }

    impl ThresholdModel {
        fn new(threshold: u64) -> Self {
            Self {
                threshold,
                tested: Vec::new(),
            }
        }
    }

    impl TrialRunner for ThresholdModel {
        fn run_trial(&mut self, rate: u64, _window: Duration, _cancel: &CancellationToken) -> TrialResult {
            self.tested.push(rate);
            if rate <= self.threshold {
                TrialResult::Passed
            } else {
                TrialResult::Failed
            }
        }
    }

    fn plan() -> SearchPlan {
        SearchPlan {
            warmup: Duration::from_secs(30),
            trial: Duration::from_secs(10),
            min_rate_delta: 16,
        }
    }

    #[test]
    fn bisection_converges_within_log_bound() {
        for threshold in [300u64, 400, 450, 511] {
            let state = RateState::new(512);
            let mut model = ThresholdModel::new(threshold);
            let outcome = bisect(&mut model, &state, &plan(), &CancellationToken::new(), 256, 512)
                .unwrap();

            let SearchOutcome::Stable { rate } = outcome else {
                panic!("expected stable outcome");
            };
            // ceil(log2((512 - 256) / 16)) = 4
            assert!(model.tested.len() <= 4, "threshold {threshold}: {:?}", model.tested);
            assert!(rate.abs_diff(threshold) < 16, "threshold {threshold}: rate {rate}");
            assert_eq!(state.phase(), Phase::Stable);
            assert_eq!(state.stable_rate(), rate);
        }
    }

    #[test]
    fn bisection_with_exact_trace() {
        let state = RateState::new(512);
        let mut model = ThresholdModel::new(300);
        let outcome =
            bisect(&mut model, &state, &plan(), &CancellationToken::new(), 256, 512).unwrap();
        assert_eq!(model.tested, vec![384, 320, 288, 304]);
        assert_eq!(outcome, SearchOutcome::Stable { rate: 304 });
        assert_eq!(state.bounds(), (288, 304));
    }

    #[test]
    fn warmup_failure_is_fatal() {
        let state = RateState::new(128);
        let mut model = ThresholdModel::new(100);
        let err = search(&mut model, &state, &plan(), &CancellationToken::new()).unwrap_err();

        assert!(matches!(err, PipelineError::WarmupFailed { rate: 128 }));
        assert_eq!(state.phase(), Phase::Aborted);
        assert_eq!(model.tested, vec![128]);
    }

    #[test]
    fn first_doubling_failure_bisects_from_zero() {
        // Warm-up at 128 passes, the first 10 s trial at 128 does not.
        struct FlakyAfterWarmup(u32);
        impl TrialRunner for FlakyAfterWarmup {
            fn run_trial(&mut self, _rate: u64, _w: Duration, _c: &CancellationToken) -> TrialResult {
                self.0 += 1;
                if self.0 == 1 {
                    TrialResult::Passed
                } else {
                    TrialResult::Failed
                }
            }
        }

        let state = RateState::new(128);
        let mut runner = FlakyAfterWarmup(0);
        let outcome = search(&mut runner, &state, &plan(), &CancellationToken::new()).unwrap();
        // 64, 32, 16 all fail; the next midpoint (8) is within 16 of 16
        assert_eq!(outcome, SearchOutcome::Stable { rate: 16 });
        assert_eq!(state.bounds(), (0, 16));
    }

    #[test]
    fn cancellation_between_trials() {
        struct CancelOnThird {
            calls: u32,
            token: CancellationToken,
        }
        impl TrialRunner for CancelOnThird {
            fn run_trial(&mut self, _rate: u64, _w: Duration, _c: &CancellationToken) -> TrialResult {
                self.calls += 1;
                if self.calls == 3 {
                    self.token.cancel();
                }
                TrialResult::Passed
            }
        }

        let token = CancellationToken::new();
        let state = RateState::new(64);
        let mut runner = CancelOnThird {
            calls: 0,
            token: token.clone(),
        };
        let outcome = search(&mut runner, &state, &plan(), &token).unwrap();
        assert_eq!(outcome, SearchOutcome::Cancelled);
        assert_eq!(runner.calls, 3);
        assert_eq!(state.trials(), 3);
    }

    #[test]
    fn full_queue_fails_trial_and_counts_one_error() {
        let (publisher, _consumer) = event_queue(4).unwrap();
        let state = Arc::new(RateState::new(1000));
        // default drain settings: up to 30 polls of 1 s each
        let mut runner =
            QueueTrialRunner::new(publisher, Arc::clone(&state), &ControllerConfig::default());

        // consumer never runs: the fifth publish overflows
        let started = Instant::now();
        let result = runner.run_trial(1000, Duration::from_secs(10), &CancellationToken::new());
        assert_eq!(result, TrialResult::Failed);
        assert!(started.elapsed() < Duration::from_secs(1), "{:?}", started.elapsed());
        assert_eq!(state.error_count(), 1);
        assert_eq!(runner.into_publisher().cursor(), 3);
    }

    #[test]
    fn next_trial_waits_for_leftover_backlog() {
        let (publisher, mut consumer) = event_queue(4).unwrap();
        let state = Arc::new(RateState::new(1000));
        let config = ControllerConfig {
            drain_poll_ms: 5,
            max_drain_polls: 2,
            ..ControllerConfig::default()
        };
        let mut runner = QueueTrialRunner::new(publisher, Arc::clone(&state), &config);
        let token = CancellationToken::new();
        assert_eq!(runner.run_trial(1000, Duration::from_secs(10), &token), TrialResult::Failed);

        // backlog never clears: fail without publishing anything new
        assert_eq!(runner.run_trial(1000, Duration::from_millis(50), &token), TrialResult::Failed);
        assert_eq!(state.error_count(), 1);

        // once drained, the next trial runs normally
        while consumer.try_consume().is_some() {}
        let drainer = std::thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_millis(500);
            while Instant::now() < deadline {
                if consumer.try_consume().is_none() {
                    std::thread::sleep(Duration::from_micros(50));
                }
            }
        });
        assert_eq!(runner.run_trial(100, Duration::from_millis(50), &token), TrialResult::Passed);
        drainer.join().unwrap();
        assert!(runner.into_publisher().cursor() > 3);
    }

    #[test]
    fn bisect_orders_an_inverted_bracket() {
        let state = RateState::new(100);
        let mut model = ThresholdModel::new(300);
        let outcome =
            bisect(&mut model, &state, &plan(), &CancellationToken::new(), 512, 100).unwrap();

        let SearchOutcome::Stable { rate } = outcome else {
            panic!("expected stable outcome");
        };
        assert!(model.tested.iter().all(|r| (100..=512).contains(r)), "{:?}", model.tested);
        assert!(rate.abs_diff(300) < 16, "rate {rate}");
        let (lower, upper) = state.bounds();
        assert!(lower <= upper);
    }

    #[test]
    fn operator_lowering_rate_mid_doubling_still_converges() {
        // Passes up to 300; during the trial at 256 the operator drops the
        // rate to 40, so the next trial (80) fails below the last pass.
        struct LowerDuringTrial<'a> {
            state: &'a RateState,
            tested: Vec<u64>,
        }
        impl TrialRunner for LowerDuringTrial<'_> {
            fn run_trial(&mut self, rate: u64, _w: Duration, _c: &CancellationToken) -> TrialResult {
                self.tested.push(rate);
                if rate == 256 {
                    self.state.set_target_rate(40);
                    return TrialResult::Passed;
                }
                if rate == 80 || rate > 300 {
                    TrialResult::Failed
                } else {
                    TrialResult::Passed
                }
            }
        }

        let state = RateState::new(128);
        let mut runner = LowerDuringTrial {
            state: &state,
            tested: Vec::new(),
        };
        let outcome = search(&mut runner, &state, &plan(), &CancellationToken::new()).unwrap();

        assert_eq!(&runner.tested[..4], &[128, 128, 256, 80]);
        assert!(matches!(outcome, SearchOutcome::Stable { .. }));
        assert_eq!(state.phase(), Phase::Stable);
        assert!(runner.tested[4..].iter().all(|r| (80..=256).contains(r)));
    }

    #[test]
    fn cancelled_token_stops_trial_immediately() {
        let (publisher, _consumer) = event_queue(1024).unwrap();
        let state = Arc::new(RateState::new(100));
        let mut runner = QueueTrialRunner::new(publisher, state, &ControllerConfig::default());
        let token = CancellationToken::new();
        token.cancel();

        let started = Instant::now();
        let result = runner.run_trial(100, Duration::from_secs(10), &token);
        assert_eq!(result, TrialResult::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn stop_without_run_is_rejected() {
        let (publisher, _consumer) = event_queue(4).unwrap();
        let controller = RateController::new(publisher, ControllerConfig::default());
        assert!(matches!(controller.stop(), Err(PipelineError::NotRunning)));
        assert_eq!(controller.snapshot().phase, Phase::Idle);
        assert_eq!(controller.snapshot().cursor, -1);
        assert!(controller.join().is_ok());
    }
}
