//! # poll-scheduler
//!
//! Periodic state polling for network devices that cannot report changes on
//! their own.
//!
//! Devices are polled one after another in the order polling was enabled. A
//! base interval sets the time budget for one full pass; by default it is
//! divided by the number of polled devices so network traffic stays roughly
//! constant as devices come and go. Each device also carries an intensity:
//! 1 polls on every pass, 2 on every other pass, and so on.
//!
//! The scheduler does not talk to devices itself. It calls a [`PollTransport`]
//! to send the query, checks keys against a [`DeviceDirectory`], and reports
//! failed polls to a [`FaultSink`].

pub mod config;
pub mod device;
mod error;
pub mod interval;
pub mod logging;
pub mod registry;
mod runner;
mod scheduler;
mod stats;
mod types;

pub use config::SchedulerConfig;
pub use device::{
    AllowAllDevices, DeviceDirectory, FaultSink, KnownDevices, PollTransport, TracingFaultSink,
};
pub use error::*;
pub use interval::{IntervalConfig, IntervalController};
pub use registry::{PollRegistry, PolledDevice, Visit};
pub use runner::RunnerState;
pub use scheduler::{PollScheduler, PollSchedulerBuilder};
pub use stats::{DeviceStats, SchedulerStats};
pub use types::*;
