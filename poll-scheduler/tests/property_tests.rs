//! Property-based tests for the registry, interval division and the
//! scheduler's polling operations.

use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;

use poll_scheduler::{
    DeviceKey, IntervalConfig, IntervalController, PollRegistry, PollSchedulerBuilder,
    PollTransport, PollResult, Visit,
};

struct NoopTransport;

#[async_trait::async_trait]
impl PollTransport for NoopTransport {
    async fn poll(&self, _key: DeviceKey) -> PollResult {
        Ok(())
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// A small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = DeviceKey> {
    (0u32..2, 0u64..8).prop_map(|(network, value)| DeviceKey::new(network, value))
}

#[derive(Debug, Clone)]
enum Op {
    Enable(DeviceKey, u8),
    Disable(DeviceKey),
    SetIntensity(DeviceKey, u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (key_strategy(), any::<u8>()).prop_map(|(k, i)| Op::Enable(k, i)),
        key_strategy().prop_map(Op::Disable),
        (key_strategy(), any::<u8>()).prop_map(|(k, i)| Op::SetIntensity(k, i)),
    ]
}

// ============================================================================
// Polling operations agree with a simple ordered model
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* sequence of enable/disable/set-intensity calls, `is_polled`
    /// and `get_poll_intensity` reflect the last applicable intensity, and the
    /// visitation order is the order keys were first enabled.
    #[test]
    fn prop_operations_match_model(ops in proptest::collection::vec(op_strategy(), 0..60)) {
        let scheduler = PollSchedulerBuilder::new(NoopTransport).build().unwrap();
        let mut model: Vec<(DeviceKey, u8)> = Vec::new();

        for op in ops {
            match op {
                Op::Enable(k, i) => {
                    let existing = model.iter().position(|(key, _)| *key == k);
                    let expected = i > 0 && existing.is_none();
                    prop_assert_eq!(scheduler.enable_poll(k, i), expected);
                    if i > 0 {
                        match existing {
                            Some(index) => model[index].1 = i,
                            None => model.push((k, i)),
                        }
                    }
                }
                Op::Disable(k) => {
                    let existing = model.iter().position(|(key, _)| *key == k);
                    prop_assert_eq!(scheduler.disable_poll(k), existing.is_some());
                    if let Some(index) = existing {
                        model.remove(index);
                    }
                }
                Op::SetIntensity(k, i) => {
                    scheduler.set_poll_intensity(k, i);
                    if let Some(index) = model.iter().position(|(key, _)| *key == k) {
                        if i == 0 {
                            model.remove(index);
                        } else {
                            model[index].1 = i;
                        }
                    }
                }
            }
        }

        for network in 0u32..2 {
            for value in 0u64..8 {
                let k = DeviceKey::new(network, value);
                let expected = model.iter().find(|(key, _)| *key == k).map_or(0, |(_, i)| *i);
                prop_assert_eq!(scheduler.get_poll_intensity(k), expected);
                prop_assert_eq!(scheduler.is_polled(k), expected > 0);
            }
        }

        let order: Vec<DeviceKey> = model.iter().map(|(k, _)| *k).collect();
        prop_assert_eq!(scheduler.polled_devices(), order);
    }

    /// *For any* M distinct enabled keys of which D are disabled again, the
    /// registry holds exactly M - D entries and no duplicates.
    #[test]
    fn prop_size_is_enables_minus_disables(
        keys in proptest::collection::hash_set(any::<(u32, u64)>(), 0..40),
        disable_mask in proptest::collection::vec(any::<bool>(), 40),
    ) {
        let mut registry = PollRegistry::new();
        let keys: Vec<DeviceKey> = keys.into_iter().map(DeviceKey::from).collect();

        for k in &keys {
            prop_assert!(registry.enable(*k, 1));
            // Re-enabling never duplicates
            prop_assert!(!registry.enable(*k, 2));
        }

        let mut disabled = 0;
        for (k, disable) in keys.iter().zip(&disable_mask) {
            if *disable {
                prop_assert!(registry.disable(k));
                disabled += 1;
            }
        }

        prop_assert_eq!(registry.len(), keys.len() - disabled);
        let unique: HashSet<DeviceKey> = registry.snapshot().into_iter().collect();
        prop_assert_eq!(unique.len(), registry.len());
    }
}

// ============================================================================
// Intensity: one poll per window of K visits
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* intensity K and any number of earlier visits, every window of
    /// K consecutive visits contains exactly one poll.
    #[test]
    fn prop_one_poll_per_intensity_window(
        intensity in 1u8..=255,
        warmup in 0usize..600,
    ) {
        let k = DeviceKey::new(1, 1);
        let mut registry = PollRegistry::new();
        registry.enable(k, intensity);

        for _ in 0..warmup {
            registry.visit(&k);
        }

        let window: Vec<Visit> = (0..intensity).map(|_| registry.visit(&k)).collect();
        let polls = window.iter().filter(|v| matches!(v, Visit::Poll { .. })).count();
        prop_assert_eq!(polls, 1);
    }
}

// ============================================================================
// Interval division
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// With division on, the delay is base / N for N > 0 and base for N = 0.
    #[test]
    fn prop_divided_delay(base in 0i32..=i32::MAX, size in 0usize..10_000) {
        let controller = IntervalController::new(IntervalConfig::new(base, true));
        let expected = if size == 0 { base as u64 } else { base as u64 / size as u64 };
        prop_assert_eq!(controller.effective_delay(size), Duration::from_millis(expected));
    }

    /// With division off, the delay does not depend on the registry size.
    #[test]
    fn prop_undivided_delay_constant(base in 0i32..=i32::MAX, a in 0usize..10_000, b in 0usize..10_000) {
        let controller = IntervalController::new(IntervalConfig::new(base, false));
        prop_assert_eq!(controller.effective_delay(a), controller.effective_delay(b));
        prop_assert_eq!(controller.effective_delay(a), Duration::from_millis(base as u64));
    }
}
