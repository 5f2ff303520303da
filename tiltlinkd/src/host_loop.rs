//! Fixed-rate host loop
//!
//! Connects, then ticks the bridge at the configured rate until `shutdown`
//! resolves. Every await that can run a full discovery pass is raced against
//! `shutdown`, so a stop request never waits for discovery to finish.

use std::future::Future;
use tiltlink_hardware::PortOpener;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::bridge::SerialBridge;
use crate::speed_sender::SpeedPublisher;

/// Constant speed fed to the device display on every tick
#[derive(Debug, Clone)]
pub struct FixedSpeed {
    pub publisher: SpeedPublisher,
    pub speed_mps: f32,
}

/// Drive `bridge` until `shutdown` resolves.
///
/// The bridge is left running; callers stop it afterwards.
pub async fn run_host_loop<O, S>(
    bridge: &mut SerialBridge<O>,
    mut speed: Option<FixedSpeed>,
    shutdown: S,
) where
    O: PortOpener,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let reconnect_enabled = bridge.config().reconnect.enabled;
    let connected = tokio::select! {
        result = bridge.connect() => Some(result),
        _ = &mut shutdown => None,
    };

    match connected {
        None => return,
        Some(Err(e)) => {
            warn!("Initial connection failed: {}", e);
            if !reconnect_enabled {
                warn!("Auto-reconnect is disabled; restart the daemon to retry");
            }
        }
        Some(Ok(())) => {}
    }

    info!("Running at {} Hz", bridge.config().host.tick_hz);

    let sender = bridge.sender();
    let mut ticker = tokio::time::interval(bridge.config().host.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        // A due reconnect runs discovery inside this tick
        let ticked = tokio::select! {
            _ = bridge.tick() => true,
            _ = &mut shutdown => false,
        };
        if !ticked {
            break;
        }

        let now = Instant::now();
        let dt = now - last_tick;
        last_tick = now;

        if let Some(fixed) = speed.as_mut() {
            fixed.publisher.update(&sender, fixed.speed_mps, dt).await;
        }
    }
}
