//! The background poll cycle.
//!
//! One task walks the registry in round-robin order. Each pass works on a
//! snapshot of the order taken at the start of the pass, so devices enabled or
//! disabled meanwhile cannot disturb the iteration. Every visit re-checks the
//! live registry before polling, and the pause after each visit is computed
//! from the live registry size.
//!
//! The registry and interval configuration share one lock. It is held for
//! bookkeeping only, never across the poll call or the pause.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::device::{FaultSink, PollTransport};
use crate::interval::IntervalController;
use crate::registry::{PollRegistry, Visit};
use crate::stats::CycleCounters;
use crate::types::DeviceKey;

/// Pause used when nothing is registered and the base interval is zero.
const MIN_IDLE_WAIT: Duration = Duration::from_millis(10);

/// Lifecycle of the poll cycle.
///
/// `Idle -> Running` on start, `Running -> Stopping` on stop,
/// `Stopping -> Stopped` once the in-flight poll has returned. A later start
/// goes back through `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl RunnerState {
    /// Whether a cycle task exists for this state
    pub fn is_active(&self) -> bool {
        matches!(self, RunnerState::Running | RunnerState::Stopping)
    }
}

/// Everything the facade and the runner share.
#[derive(Debug, Default)]
pub(crate) struct PollState {
    pub registry: PollRegistry,
    pub interval: IntervalController,
    pub counters: CycleCounters,
}

impl PollState {
    pub fn new(interval: IntervalController) -> Self {
        Self {
            registry: PollRegistry::new(),
            interval,
            counters: CycleCounters::default(),
        }
    }

    /// Delay after one visit at the current registry size
    pub fn effective_delay(&self) -> Duration {
        self.interval.effective_delay(self.registry.len())
    }
}

pub(crate) type SharedState = Arc<Mutex<PollState>>;

/// The task body driving round-robin polling.
pub(crate) struct PollCycleRunner {
    state: SharedState,
    runner_state: Arc<Mutex<RunnerState>>,
    transport: Arc<dyn PollTransport>,
    fault_sink: Arc<dyn FaultSink>,
    shutdown_rx: watch::Receiver<bool>,
}

impl PollCycleRunner {
    pub fn new(
        state: SharedState,
        runner_state: Arc<Mutex<RunnerState>>,
        transport: Arc<dyn PollTransport>,
        fault_sink: Arc<dyn FaultSink>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            state,
            runner_state,
            transport,
            fault_sink,
            shutdown_rx,
        }
    }

    /// Run passes until shutdown is signalled or the scheduler is dropped.
    pub async fn run(mut self) {
        info!("Poll cycle started");

        'passes: while !self.stop_requested() {
            let snapshot = self.state.lock().registry.snapshot();

            if snapshot.is_empty() {
                let delay = self.state.lock().interval.effective_delay(0);
                if !self.pause(delay.max(MIN_IDLE_WAIT)).await {
                    break;
                }
                continue;
            }

            trace!(devices = snapshot.len(), "Starting poll pass");

            for key in snapshot {
                if self.stop_requested() {
                    break 'passes;
                }

                self.visit(key).await;

                // Owed after every slot in the snapshot, including devices
                // disabled since it was taken
                let delay = self.state.lock().effective_delay();
                if !self.pause(delay).await {
                    break 'passes;
                }
            }

            self.state.lock().counters.passes += 1;
        }

        *self.runner_state.lock() = RunnerState::Stopped;
        info!("Poll cycle stopped");
    }

    /// Visit one device from the snapshot.
    async fn visit(&self, key: DeviceKey) {
        let visit = {
            let mut state = self.state.lock();
            let visit = state.registry.visit(&key);
            match visit {
                Visit::NotPolled => {}
                Visit::Skipped { .. } => {
                    state.counters.visits += 1;
                    state.counters.skips += 1;
                }
                Visit::Poll { .. } => state.counters.visits += 1,
            }
            visit
        };

        match visit {
            Visit::NotPolled => {
                trace!(key = %key, "Device no longer polled, skipping");
            }
            Visit::Skipped {
                visit_counter,
                intensity,
            } => {
                trace!(key = %key, visit_counter, intensity, "Skipping visit");
            }
            Visit::Poll { intensity } => {
                debug!(key = %key, intensity, "Polling device");

                let result = self.transport.poll(key).await;

                {
                    let mut state = self.state.lock();
                    state
                        .registry
                        .record_poll(&key, result.is_ok(), Instant::now());
                    state.counters.polls += 1;
                    if result.is_err() {
                        state.counters.failures += 1;
                    }
                }

                if let Err(e) = result {
                    self.fault_sink.report_poll_failure(key, &e);
                }
            }
        }
    }

    /// Sleep for `delay` unless shutdown arrives first.
    ///
    /// Returns false when the cycle should stop.
    async fn pause(&mut self, delay: Duration) -> bool {
        if delay.is_zero() {
            tokio::task::yield_now().await;
            return !self.stop_requested();
        }

        trace!(?delay, "Pausing");

        let interrupted = tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = self.shutdown_rx.changed() => true,
        };

        !interrupted && !self.stop_requested()
    }

    fn stop_requested(&self) -> bool {
        // A closed channel means the scheduler is gone
        *self.shutdown_rx.borrow() || self.shutdown_rx.has_changed().is_err()
    }
}
