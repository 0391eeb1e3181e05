//! Core types for the poll-scheduler crate.

use serde::{Deserialize, Serialize};

/// Identifies one pollable value on one device network.
///
/// A Z-Wave network is addressed by its home ID and every value a node exposes
/// has a 64-bit value ID. Together they name the thing being polled. The key is
/// plain data: two keys are the same key when both fields are equal.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DeviceKey {
    /// Network (home) identifier
    pub network_id: u32,
    /// Value identifier within the network
    pub value_id: u64,
}

impl DeviceKey {
    /// Create a new device key.
    pub const fn new(network_id: u32, value_id: u64) -> Self {
        Self {
            network_id,
            value_id,
        }
    }
}

impl From<(u32, u64)> for DeviceKey {
    fn from((network_id, value_id): (u32, u64)) -> Self {
        Self::new(network_id, value_id)
    }
}

impl std::fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08x}:{:016x}", self.network_id, self.value_id)
    }
}
