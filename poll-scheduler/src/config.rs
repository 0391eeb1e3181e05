//! Configuration types for the poll-scheduler crate
//!
//! This module defines the settings a [`PollScheduler`](crate::PollScheduler)
//! starts with. The interval settings can be changed later at runtime through
//! `set_base_interval`; the rest is fixed for the scheduler's lifetime.

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;
use crate::interval::IntervalConfig;

/// Default time budget for one full pass (30 seconds)
pub const DEFAULT_BASE_INTERVAL_MS: i32 = 30_000;

/// Configuration for the PollScheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Time budget for one full pass over the polled devices, in milliseconds
    /// Default: 30000
    pub base_interval_ms: i32,

    /// Share the budget evenly across devices instead of waiting the full
    /// interval after each one
    /// Default: true
    pub divide_between_polls: bool,

    /// Consult the device directory before enabling polling for a key
    /// Default: true
    pub validate_devices: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: DEFAULT_BASE_INTERVAL_MS,
            divide_between_polls: true,
            validate_devices: true,
        }
    }
}

impl SchedulerConfig {
    /// Create a new SchedulerConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// One second per pass, for small networks that need fresh state
    pub fn fast() -> Self {
        Self {
            base_interval_ms: 1_000,
            ..Default::default()
        }
    }

    /// A full minute between polls of each device, regardless of device count
    pub fn conservative() -> Self {
        Self {
            base_interval_ms: 60_000,
            divide_between_polls: false,
            ..Default::default()
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.base_interval_ms < 0 {
            return Err(SchedulerError::Configuration(format!(
                "Base interval must not be negative, got {} ms",
                self.base_interval_ms
            )));
        }

        Ok(())
    }

    /// The interval part of this configuration
    pub fn interval(&self) -> IntervalConfig {
        IntervalConfig::new(self.base_interval_ms, self.divide_between_polls)
    }

    pub fn with_base_interval(mut self, milliseconds: i32, divide_between_polls: bool) -> Self {
        self.base_interval_ms = milliseconds;
        self.divide_between_polls = divide_between_polls;
        self
    }

    pub fn with_device_validation(mut self, enabled: bool) -> Self {
        self.validate_devices = enabled;
        self
    }
}
