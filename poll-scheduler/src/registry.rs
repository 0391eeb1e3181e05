//! Ordered set of polled devices with per-device intensity.
//!
//! Insertion order is visitation order: a newly enabled device joins the end of
//! the round-robin so devices already in the list keep their turn. A key
//! appears at most once and removal leaves no gap.
//!
//! The registry itself is not synchronized. The scheduler keeps it behind the
//! same lock as the interval configuration.

use std::collections::HashMap;

use tokio::time::Instant;

use crate::types::DeviceKey;

/// One entry in the poll registry.
#[derive(Debug, Clone)]
pub struct PolledDevice {
    key: DeviceKey,
    intensity: u8,
    /// Visits since the last actual poll
    visit_counter: u32,
    polls: u64,
    failures: u64,
    skips: u64,
    last_polled: Option<Instant>,
}

impl PolledDevice {
    fn new(key: DeviceKey, intensity: u8) -> Self {
        Self {
            key,
            intensity,
            visit_counter: 0,
            polls: 0,
            failures: 0,
            skips: 0,
            last_polled: None,
        }
    }

    pub fn key(&self) -> DeviceKey {
        self.key
    }

    /// Poll once every `intensity` visits.
    pub fn intensity(&self) -> u8 {
        self.intensity
    }

    pub fn visit_counter(&self) -> u32 {
        self.visit_counter
    }

    /// Poll queries issued for this device
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Poll queries that came back with an error
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Visits that did not poll because of intensity
    pub fn skips(&self) -> u64 {
        self.skips
    }

    pub fn last_polled(&self) -> Option<Instant> {
        self.last_polled
    }
}

/// What the cycle runner should do for one visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// The device left the registry after the snapshot was taken
    NotPolled,
    /// Counted, but intensity says wait for a later visit
    Skipped { visit_counter: u32, intensity: u8 },
    /// Send the poll query now
    Poll { intensity: u8 },
}

/// Ordered mapping from [`DeviceKey`] to [`PolledDevice`].
#[derive(Debug, Clone, Default)]
pub struct PollRegistry {
    devices: Vec<PolledDevice>,
    /// Position of each key in `devices`
    index: HashMap<DeviceKey, usize>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_mut(&mut self, key: &DeviceKey) -> Option<&mut PolledDevice> {
        let position = *self.index.get(key)?;
        self.devices.get_mut(position)
    }

    /// Enable polling for `key`.
    ///
    /// Returns true when the key was not yet registered and has been appended.
    /// An existing entry keeps its place, takes the new intensity and restarts
    /// its visit counter; that returns false. An intensity of zero is refused
    /// and leaves the registry untouched.
    pub fn enable(&mut self, key: DeviceKey, intensity: u8) -> bool {
        if intensity == 0 {
            return false;
        }

        if let Some(device) = self.entry_mut(&key) {
            device.intensity = intensity;
            device.visit_counter = 0;
            return false;
        }

        self.index.insert(key, self.devices.len());
        self.devices.push(PolledDevice::new(key, intensity));
        true
    }

    /// Remove `key`, returning whether it was present.
    pub fn disable(&mut self, key: &DeviceKey) -> bool {
        let Some(position) = self.index.remove(key) else {
            return false;
        };

        // `remove`, not `swap_remove`: the others keep their order
        self.devices.remove(position);
        for (offset, device) in self.devices[position..].iter().enumerate() {
            self.index.insert(device.key, position + offset);
        }
        true
    }

    /// Change the intensity of an existing entry. Zero disables it.
    ///
    /// Returns whether the key was present. The visit counter is kept.
    pub fn set_intensity(&mut self, key: &DeviceKey, intensity: u8) -> bool {
        if intensity == 0 {
            return self.disable(key);
        }

        match self.entry_mut(key) {
            Some(device) => {
                device.intensity = intensity;
                true
            }
            None => false,
        }
    }

    /// Intensity of `key`, or 0 when it is not polled.
    pub fn intensity(&self, key: &DeviceKey) -> u8 {
        self.get(key).map_or(0, |d| d.intensity)
    }

    pub fn is_polled(&self, key: &DeviceKey) -> bool {
        self.intensity(key) > 0
    }

    pub fn get(&self, key: &DeviceKey) -> Option<&PolledDevice> {
        self.index.get(key).and_then(|&position| self.devices.get(position))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Copy of the current visitation order.
    pub fn snapshot(&self) -> Vec<DeviceKey> {
        self.devices.iter().map(|d| d.key).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PolledDevice> {
        self.devices.iter()
    }

    /// Count one visit to `key` and decide whether it polls.
    ///
    /// The counter advances on every visit and a poll fires once it reaches
    /// the intensity, after which it starts over. Intensity 2 therefore skips
    /// the first visit and polls on the second. A key that is no longer
    /// registered is left alone.
    pub fn visit(&mut self, key: &DeviceKey) -> Visit {
        let Some(device) = self.entry_mut(key) else {
            return Visit::NotPolled;
        };

        device.visit_counter = device.visit_counter.saturating_add(1);
        if device.visit_counter >= u32::from(device.intensity) {
            device.visit_counter = 0;
            Visit::Poll {
                intensity: device.intensity,
            }
        } else {
            device.skips += 1;
            Visit::Skipped {
                visit_counter: device.visit_counter,
                intensity: device.intensity,
            }
        }
    }

    /// Record the outcome of a poll issued for `key`.
    ///
    /// No-op if the key was disabled while the poll was in flight.
    pub fn record_poll(&mut self, key: &DeviceKey, succeeded: bool, at: Instant) {
        if let Some(device) = self.entry_mut(key) {
            device.polls += 1;
            device.last_polled = Some(at);
            if !succeeded {
                device.failures += 1;
            }
        }
    }
}
