//! Public polling operations and scheduler lifecycle
//!
//! [`PollScheduler`] is the only type callers need. Its polling operations are
//! synchronous, take the shared state lock briefly, and can be called from any
//! thread at any time, including while a pass is in progress. Bad input is
//! answered with `false` or a no-op rather than an error.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::device::{
    AllowAllDevices, DeviceDirectory, FaultSink, PollTransport, TracingFaultSink,
};
use crate::error::{Result, SchedulerError};
use crate::interval::IntervalController;
use crate::runner::{PollCycleRunner, PollState, RunnerState, SharedState};
use crate::stats::{DeviceStats, SchedulerStats};
use crate::types::DeviceKey;

/// Handles for a spawned cycle task
struct ActiveCycle {
    task_handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Round-robin poll scheduler.
///
/// # Example
///
/// ```rust,ignore
/// use poll_scheduler::{DeviceKey, PollSchedulerBuilder, SchedulerConfig};
///
/// let scheduler = PollSchedulerBuilder::new(transport)
///     .with_config(SchedulerConfig::new().with_base_interval(4000, true))
///     .build()?;
///
/// scheduler.start()?;
/// scheduler.enable_poll(DeviceKey::new(0x0184a2c1, 0x01), 1);
/// scheduler.enable_poll(DeviceKey::new(0x0184a2c1, 0x02), 2);
///
/// // ...
/// scheduler.stop().await?;
/// ```
pub struct PollScheduler {
    state: SharedState,
    runner_state: Arc<Mutex<RunnerState>>,
    active: Mutex<Option<ActiveCycle>>,
    transport: Arc<dyn PollTransport>,
    directory: Arc<dyn DeviceDirectory>,
    fault_sink: Arc<dyn FaultSink>,
    validate_devices: bool,
}

impl PollScheduler {
    fn new(
        config: SchedulerConfig,
        transport: Arc<dyn PollTransport>,
        directory: Arc<dyn DeviceDirectory>,
        fault_sink: Arc<dyn FaultSink>,
    ) -> Self {
        let interval = IntervalController::new(config.interval());
        Self {
            state: Arc::new(Mutex::new(PollState::new(interval))),
            runner_state: Arc::new(Mutex::new(RunnerState::Idle)),
            active: Mutex::new(None),
            transport,
            directory,
            fault_sink,
            validate_devices: config.validate_devices,
        }
    }

    // ----------------------------------------------------------------------
    // Lifecycle
    // ----------------------------------------------------------------------

    /// Spawn the poll cycle on the current tokio runtime.
    ///
    /// Fails with [`SchedulerError::AlreadyRunning`] while a cycle is running or
    /// still stopping, and with [`SchedulerError::NoRuntime`] outside a runtime.
    pub fn start(&self) -> Result<()> {
        let mut active = self.active.lock();
        let mut runner_state = self.runner_state.lock();

        if runner_state.is_active() {
            return Err(SchedulerError::AlreadyRunning(*runner_state));
        }

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

        *runner_state = RunnerState::Idle;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = PollCycleRunner::new(
            Arc::clone(&self.state),
            Arc::clone(&self.runner_state),
            Arc::clone(&self.transport),
            Arc::clone(&self.fault_sink),
            shutdown_rx,
        );

        *runner_state = RunnerState::Running;
        drop(runner_state);

        let task_handle = runtime.spawn(runner.run());
        *active = Some(ActiveCycle {
            task_handle,
            shutdown_tx,
        });

        info!("Poll scheduler started");
        Ok(())
    }

    /// Stop the poll cycle and wait for it to finish.
    ///
    /// A poll already in flight is allowed to complete. Calling this when no
    /// cycle is running does nothing.
    pub async fn stop(&self) -> Result<()> {
        let cycle = self.active.lock().take();
        let Some(cycle) = cycle else {
            debug!("Stop requested but poll cycle is not running");
            return Ok(());
        };

        *self.runner_state.lock() = RunnerState::Stopping;
        // The runner may already be gone; the join below settles it either way
        let _ = cycle.shutdown_tx.send(true);

        let joined = cycle.task_handle.await;
        *self.runner_state.lock() = RunnerState::Stopped;
        joined?;

        info!("Poll scheduler stopped");
        Ok(())
    }

    pub fn state(&self) -> RunnerState {
        *self.runner_state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunnerState::Running
    }

    // ----------------------------------------------------------------------
    // Interval
    // ----------------------------------------------------------------------

    /// Time budget for one full pass, in milliseconds.
    pub fn get_base_interval(&self) -> i32 {
        self.state.lock().interval.base_interval()
    }

    /// Set the time budget for one full pass.
    ///
    /// With `divide_between_polls` the budget is split evenly between the polled
    /// devices; otherwise each device waits the whole interval. The new value
    /// applies from the next pause on. Negative values are treated as zero.
    pub fn set_base_interval(&self, milliseconds: i32, divide_between_polls: bool) {
        let mut state = self.state.lock();
        state
            .interval
            .set_base_interval(milliseconds, divide_between_polls);

        let polled = state.registry.len();
        if divide_between_polls && polled > 0 && i64::from(milliseconds) < polled as i64 * 1000 {
            debug!(
                milliseconds,
                polled,
                "Poll interval gives devices less than one second each"
            );
        }
    }

    /// Delay between visits at the current registry size.
    pub fn effective_delay(&self) -> Duration {
        self.state.lock().effective_delay()
    }

    // ----------------------------------------------------------------------
    // Per-device polling
    // ----------------------------------------------------------------------

    /// Start polling `key` every `intensity` visits.
    ///
    /// Returns true if the device was newly added to the cycle. Returns false
    /// when it was already polled (its intensity is updated), when `intensity`
    /// is 0, or when the device directory does not know the key.
    pub fn enable_poll(&self, key: DeviceKey, intensity: u8) -> bool {
        if intensity == 0 {
            debug!(key = %key, "Refusing to enable polling with intensity 0");
            return false;
        }

        if self.validate_devices && !self.directory.contains(&key) {
            debug!(key = %key, "Refusing to enable polling for unknown device");
            return false;
        }

        let added = self.state.lock().registry.enable(key, intensity);
        debug!(key = %key, intensity, added, "Polling enabled");
        added
    }

    /// Stop polling `key`. Returns whether it was being polled.
    pub fn disable_poll(&self, key: DeviceKey) -> bool {
        let removed = self.state.lock().registry.disable(&key);
        if removed {
            debug!(key = %key, "Polling disabled");
        }
        removed
    }

    pub fn is_polled(&self, key: DeviceKey) -> bool {
        self.state.lock().registry.is_polled(&key)
    }

    /// Set how often `key` is polled: 1 every visit, 2 every other visit, and
    /// so on. 0 disables polling. Does nothing for a key that is not polled.
    pub fn set_poll_intensity(&self, key: DeviceKey, intensity: u8) {
        let updated = self.state.lock().registry.set_intensity(&key, intensity);
        if updated {
            debug!(key = %key, intensity, "Poll intensity changed");
        }
    }

    /// Intensity of `key`, or 0 when it is not polled.
    pub fn get_poll_intensity(&self, key: DeviceKey) -> u8 {
        self.state.lock().registry.intensity(&key)
    }

    /// Polled devices in visitation order.
    pub fn polled_devices(&self) -> Vec<DeviceKey> {
        self.state.lock().registry.snapshot()
    }

    /// Number of polled devices.
    pub fn poll_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    pub fn stats(&self) -> SchedulerStats {
        let runner_state = self.state();
        let state = self.state.lock();
        SchedulerStats::new(
            runner_state,
            state.interval.config(),
            state.effective_delay(),
            state.counters,
            state.registry.iter().map(DeviceStats::from).collect(),
        )
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(cycle) = self.active.get_mut().take() {
            debug!("PollScheduler dropping, signalling poll cycle to stop");
            let _ = cycle.shutdown_tx.send(true);
        }
    }
}

/// Builder for creating and configuring a PollScheduler.
pub struct PollSchedulerBuilder {
    transport: Arc<dyn PollTransport>,
    directory: Arc<dyn DeviceDirectory>,
    fault_sink: Arc<dyn FaultSink>,
    config: SchedulerConfig,
}

impl PollSchedulerBuilder {
    /// Create a builder around the transport that sends poll queries.
    ///
    /// Defaults: [`SchedulerConfig::default`], every key accepted, failures
    /// logged through `tracing`.
    pub fn new(transport: impl PollTransport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            directory: Arc::new(AllowAllDevices),
            fault_sink: Arc::new(TracingFaultSink),
            config: SchedulerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the directory consulted by `enable_poll`.
    pub fn with_directory(mut self, directory: impl DeviceDirectory + 'static) -> Self {
        self.directory = Arc::new(directory);
        self
    }

    pub fn with_fault_sink(mut self, fault_sink: impl FaultSink + 'static) -> Self {
        self.fault_sink = Arc::new(fault_sink);
        self
    }

    /// Validate the configuration and create the scheduler. The cycle is not
    /// started.
    pub fn build(self) -> Result<PollScheduler> {
        self.config.validate()?;
        Ok(PollScheduler::new(
            self.config,
            self.transport,
            self.directory,
            self.fault_sink,
        ))
    }
}
