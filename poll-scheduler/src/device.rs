//! Collaborators the scheduler calls out to.
//!
//! The scheduler does not know how to talk to a device. It is handed a
//! [`PollTransport`] that sends the state query, an optional
//! [`DeviceDirectory`] that says which keys exist, and a [`FaultSink`] that
//! hears about failed polls.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{PollError, PollResult};
use crate::types::DeviceKey;

/// Sends a state query to a device.
///
/// The call may take as long as the device needs; the cycle runner waits for it
/// before visiting the next device. Bounding that time is up to the
/// implementation.
#[async_trait]
pub trait PollTransport: Send + Sync {
    /// Ask the device behind `key` to report its current state.
    async fn poll(&self, key: DeviceKey) -> PollResult;
}

#[async_trait]
impl<T: PollTransport + ?Sized> PollTransport for Arc<T> {
    async fn poll(&self, key: DeviceKey) -> PollResult {
        (**self).poll(key).await
    }
}

/// Answers whether a device key refers to a known device.
pub trait DeviceDirectory: Send + Sync {
    fn contains(&self, key: &DeviceKey) -> bool;
}

impl<T: DeviceDirectory + ?Sized> DeviceDirectory for Arc<T> {
    fn contains(&self, key: &DeviceKey) -> bool {
        (**self).contains(key)
    }
}

/// Directory that accepts every key.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllDevices;

impl DeviceDirectory for AllowAllDevices {
    fn contains(&self, _key: &DeviceKey) -> bool {
        true
    }
}

/// In-memory directory fed by whatever discovers devices.
#[derive(Debug, Default)]
pub struct KnownDevices {
    keys: RwLock<HashSet<DeviceKey>>,
}

impl KnownDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the key was newly added.
    pub fn insert(&self, key: DeviceKey) -> bool {
        self.keys.write().insert(key)
    }

    /// Returns true if the key was present.
    pub fn remove(&self, key: &DeviceKey) -> bool {
        self.keys.write().remove(key)
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

impl FromIterator<DeviceKey> for KnownDevices {
    fn from_iter<I: IntoIterator<Item = DeviceKey>>(iter: I) -> Self {
        Self {
            keys: RwLock::new(iter.into_iter().collect()),
        }
    }
}

impl DeviceDirectory for KnownDevices {
    fn contains(&self, key: &DeviceKey) -> bool {
        self.keys.read().contains(key)
    }
}

/// Receives failed poll notifications. Must not block.
pub trait FaultSink: Send + Sync {
    fn report_poll_failure(&self, key: DeviceKey, error: &PollError);
}

impl<T: FaultSink + ?Sized> FaultSink for Arc<T> {
    fn report_poll_failure(&self, key: DeviceKey, error: &PollError) {
        (**self).report_poll_failure(key, error)
    }
}

/// Logs poll failures as warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFaultSink;

impl FaultSink for TracingFaultSink {
    fn report_poll_failure(&self, key: DeviceKey, error: &PollError) {
        tracing::warn!(key = %key, error = %error, "Poll failed");
    }
}
