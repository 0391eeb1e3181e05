//! Counters describing what the poll cycle has done so far.

use std::time::Duration;

use tokio::time::Instant;

use crate::interval::IntervalConfig;
use crate::registry::PolledDevice;
use crate::runner::RunnerState;
use crate::types::DeviceKey;

/// Scheduler-wide counters, updated by the cycle runner under the state lock.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CycleCounters {
    pub passes: u64,
    pub visits: u64,
    pub polls: u64,
    pub skips: u64,
    pub failures: u64,
}

/// Statistics for one polled device
#[derive(Debug, Clone)]
pub struct DeviceStats {
    pub key: DeviceKey,
    pub intensity: u8,
    pub polls: u64,
    pub failures: u64,
    pub skips: u64,
    pub last_polled: Option<Instant>,
}

impl From<&PolledDevice> for DeviceStats {
    fn from(device: &PolledDevice) -> Self {
        Self {
            key: device.key(),
            intensity: device.intensity(),
            polls: device.polls(),
            failures: device.failures(),
            skips: device.skips(),
            last_polled: device.last_polled(),
        }
    }
}

/// Statistics for the poll scheduler
#[derive(Debug, Clone)]
pub struct SchedulerStats {
    pub state: RunnerState,
    pub interval: IntervalConfig,
    /// Delay between visits at the current registry size
    pub effective_delay: Duration,
    /// Full passes over the registry completed
    pub passes: u64,
    pub visits: u64,
    pub polls: u64,
    pub skips: u64,
    pub failures: u64,
    /// Devices in round-robin order
    pub devices: Vec<DeviceStats>,
}

impl SchedulerStats {
    pub(crate) fn new(
        state: RunnerState,
        interval: IntervalConfig,
        effective_delay: Duration,
        counters: CycleCounters,
        devices: Vec<DeviceStats>,
    ) -> Self {
        Self {
            state,
            interval,
            effective_delay,
            passes: counters.passes,
            visits: counters.visits,
            polls: counters.polls,
            skips: counters.skips,
            failures: counters.failures,
            devices,
        }
    }

    pub fn device(&self, key: &DeviceKey) -> Option<&DeviceStats> {
        self.devices.iter().find(|d| d.key == *key)
    }
}

impl std::fmt::Display for SchedulerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Poll Scheduler Stats:")?;
        writeln!(f, "  State: {:?}", self.state)?;
        writeln!(
            f,
            "  Base interval: {} ms (divided: {})",
            self.interval.base_milliseconds, self.interval.divide_between_polls
        )?;
        writeln!(f, "  Effective delay: {:?}", self.effective_delay)?;
        writeln!(
            f,
            "  Passes: {}, visits: {}, polls: {}, skipped: {}, failed: {}",
            self.passes, self.visits, self.polls, self.skips, self.failures
        )?;

        if !self.devices.is_empty() {
            writeln!(f, "  Devices:")?;
            for device in &self.devices {
                writeln!(
                    f,
                    "    {} (intensity: {}, polls: {}, skipped: {}, errors: {})",
                    device.key, device.intensity, device.polls, device.skips, device.failures
                )?;
            }
        }

        Ok(())
    }
}
