//! Polls a handful of simulated devices and prints scheduler stats.
//!
//! Run with `POLL_LOG_MODE=development` (or `debug`) to see each visit.

use std::time::Duration;

use async_trait::async_trait;
use poll_scheduler::logging::{init_logging_from_env, is_initialized};
use poll_scheduler::{
    DeviceKey, KnownDevices, PollError, PollResult, PollSchedulerBuilder, PollTransport,
    SchedulerConfig,
};

const HOME_ID: u32 = 0x0184_a2c1;

/// Pretends to query a Z-Wave node. Node 3 never answers.
struct SimulatedController;

#[async_trait]
impl PollTransport for SimulatedController {
    async fn poll(&self, key: DeviceKey) -> PollResult {
        tokio::time::sleep(Duration::from_millis(40)).await;
        if key.value_id == 3 {
            return Err(PollError::DeviceUnreachable(key));
        }
        println!("  polled {}", key);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;
    if !is_initialized() {
        println!("(set POLL_LOG_MODE=development for log output)");
    }

    let known: KnownDevices = (1..=4).map(|n| DeviceKey::new(HOME_ID, n)).collect();

    let scheduler = PollSchedulerBuilder::new(SimulatedController)
        .with_config(SchedulerConfig::new().with_base_interval(2_000, true))
        .with_directory(known)
        .build()?;

    scheduler.enable_poll(DeviceKey::new(HOME_ID, 1), 1);
    scheduler.enable_poll(DeviceKey::new(HOME_ID, 2), 2);
    scheduler.enable_poll(DeviceKey::new(HOME_ID, 3), 1);
    if !scheduler.enable_poll(DeviceKey::new(HOME_ID, 9), 1) {
        println!("device 9 is not on the network, not polled");
    }

    println!(
        "Polling {} devices, {:?} between visits",
        scheduler.poll_count(),
        scheduler.effective_delay()
    );

    scheduler.start()?;
    tokio::time::sleep(Duration::from_secs(5)).await;

    println!("Slowing device 1 down to every third pass");
    scheduler.set_poll_intensity(DeviceKey::new(HOME_ID, 1), 3);
    scheduler.disable_poll(DeviceKey::new(HOME_ID, 3));
    tokio::time::sleep(Duration::from_secs(5)).await;

    scheduler.stop().await?;
    println!("{}", scheduler.stats());

    Ok(())
}
