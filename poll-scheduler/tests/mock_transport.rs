//! Mock collaborators for testing.
//!
//! `MockTransport` records every poll with the (virtual) time it was issued
//! and can be told to fail or stall for particular keys, so cycle order,
//! pacing and failure handling can be checked without a device network.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use poll_scheduler::{DeviceKey, FaultSink, PollError, PollResult, PollTransport};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// One recorded poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRecord {
    pub key: DeviceKey,
    pub started: Instant,
}

/// Transport that records polls instead of sending them.
#[derive(Clone, Default)]
pub struct MockTransport {
    polls: Arc<Mutex<Vec<PollRecord>>>,
    failing: Arc<Mutex<HashSet<DeviceKey>>>,
    latency: Arc<Mutex<HashMap<DeviceKey, Duration>>>,
    completed: Arc<AtomicU32>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make polls of `key` fail with a timeout.
    pub fn fail_for(&self, key: DeviceKey) {
        self.failing.lock().insert(key);
    }

    /// Make polls of `key` take `latency` before returning.
    pub fn delay_for(&self, key: DeviceKey, latency: Duration) {
        self.latency.lock().insert(key, latency);
    }

    pub fn polls(&self) -> Vec<PollRecord> {
        self.polls.lock().clone()
    }

    /// Keys in the order they were polled.
    pub fn polled_keys(&self) -> Vec<DeviceKey> {
        self.polls.lock().iter().map(|r| r.key).collect()
    }

    pub fn poll_count_for(&self, key: DeviceKey) -> usize {
        self.polls.lock().iter().filter(|r| r.key == key).count()
    }

    /// Polls that have returned.
    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PollTransport for MockTransport {
    async fn poll(&self, key: DeviceKey) -> PollResult {
        self.polls.lock().push(PollRecord {
            key,
            started: Instant::now(),
        });

        let latency = self.latency.lock().get(&key).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().contains(&key) {
            Err(PollError::Timeout)
        } else {
            Ok(())
        }
    }
}

/// Fault sink that keeps every report.
#[derive(Clone, Default)]
pub struct RecordingFaultSink {
    reports: Arc<Mutex<Vec<(DeviceKey, PollError)>>>,
}

impl RecordingFaultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(DeviceKey, PollError)> {
        self.reports.lock().clone()
    }
}

impl FaultSink for RecordingFaultSink {
    fn report_poll_failure(&self, key: DeviceKey, error: &PollError) {
        self.reports.lock().push((key, error.clone()));
    }
}

/// Key on a fixed test network.
pub fn key(value_id: u64) -> DeviceKey {
    DeviceKey::new(0x0184_a2c1, value_id)
}
