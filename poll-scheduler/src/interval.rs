//! Base interval configuration and per-device delay computation.
//!
//! The base interval is the time budget for one full pass over the polled
//! devices. With `divide_between_polls` set, that budget is shared out evenly so
//! total poll traffic stays roughly constant no matter how many devices are
//! enabled. Without it, every device waits the full base interval.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Interval settings shared by every polled device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalConfig {
    /// Total budget for one full pass, in milliseconds
    pub base_milliseconds: i32,
    /// Spread the budget across the polled devices
    pub divide_between_polls: bool,
}

impl IntervalConfig {
    pub const fn new(base_milliseconds: i32, divide_between_polls: bool) -> Self {
        Self {
            base_milliseconds,
            divide_between_polls,
        }
    }
}

/// Owns the interval configuration and turns it into sleep durations.
#[derive(Debug, Clone)]
pub struct IntervalController {
    config: IntervalConfig,
}

impl IntervalController {
    /// Create a controller from an initial configuration.
    ///
    /// A negative base interval is clamped to zero.
    pub fn new(config: IntervalConfig) -> Self {
        let mut controller = Self {
            config: IntervalConfig::new(0, config.divide_between_polls),
        };
        controller.set_base_interval(config.base_milliseconds, config.divide_between_polls);
        controller
    }

    /// Replace the configuration.
    ///
    /// Takes effect for the next delay computed; a sleep already in progress
    /// keeps its original length.
    pub fn set_base_interval(&mut self, milliseconds: i32, divide_between_polls: bool) {
        if milliseconds < 0 {
            tracing::debug!(
                milliseconds,
                "Negative poll interval requested, clamping to zero"
            );
        }
        self.config = IntervalConfig::new(milliseconds.max(0), divide_between_polls);
    }

    /// Get the base interval in milliseconds.
    pub fn base_interval(&self) -> i32 {
        self.config.base_milliseconds
    }

    /// Get the current configuration.
    pub fn config(&self) -> IntervalConfig {
        self.config
    }

    /// Delay to wait after visiting one device, given the current registry size.
    ///
    /// A size of zero yields the undivided base interval.
    pub fn effective_delay(&self, registry_size: usize) -> Duration {
        effective_delay(self.config, registry_size)
    }
}

impl Default for IntervalController {
    fn default() -> Self {
        Self::new(IntervalConfig::new(
            crate::config::DEFAULT_BASE_INTERVAL_MS,
            true,
        ))
    }
}

/// Pure delay computation: `base / max(size, 1)` when dividing, `base` otherwise.
///
/// Division is integer floor division in milliseconds.
pub fn effective_delay(config: IntervalConfig, registry_size: usize) -> Duration {
    let base = u64::try_from(config.base_milliseconds).unwrap_or(0);
    let divisor = if config.divide_between_polls {
        u64::try_from(registry_size.max(1)).unwrap_or(u64::MAX)
    } else {
        1
    };
    Duration::from_millis(base / divisor)
}
