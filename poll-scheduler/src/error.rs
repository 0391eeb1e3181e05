//! Error types for the poll-scheduler crate.

use crate::runner::RunnerState;
use crate::types::DeviceKey;

/// Errors returned by a [`PollTransport`](crate::PollTransport) when a state query fails.
///
/// A failed poll says nothing about whether the device key is still valid. The
/// cycle runner reports it and moves on to the next device.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    /// The device did not answer in time
    #[error("Poll timed out")]
    Timeout,

    /// The device could not be reached
    #[error("Device unreachable: {0}")]
    DeviceUnreachable(DeviceKey),

    /// A network error occurred while sending the query
    #[error("Network error: {0}")]
    Network(String),

    /// The device or controller refused the query
    #[error("Query rejected: {0}")]
    Rejected(String),
}

/// Errors from scheduler lifecycle and configuration.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The cycle runner is already active
    #[error("Scheduler is already running (state: {0:?})")]
    AlreadyRunning(RunnerState),

    /// `start` was called outside a tokio runtime
    #[error("No tokio runtime available to spawn the poll cycle")]
    NoRuntime,

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The background task panicked or was cancelled
    #[error("Poll cycle task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for SchedulerError {
    fn from(err: tokio::task::JoinError) -> Self {
        SchedulerError::TaskJoin(err.to_string())
    }
}

/// Convenience type alias for Results using SchedulerError.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Result of a single poll query.
pub type PollResult = std::result::Result<(), PollError>;
