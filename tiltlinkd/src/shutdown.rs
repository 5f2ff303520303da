//! Shutdown handling for graceful daemon termination

use tiltlink_hardware::PortOpener;
use tokio::signal;
use tracing::{error, info, warn};

use crate::bridge::{SerialBridge, ShutdownOutcome};

/// Resolve once Ctrl+C or SIGTERM is received.
///
/// If a handler cannot be installed that signal is simply never observed.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

/// Stop the bridge, telling the device the vehicle is at rest first.
pub async fn stop_bridge<O: PortOpener>(bridge: &mut SerialBridge<O>) -> ShutdownOutcome {
    if bridge.is_connection_open() && !bridge.set_speed(0).await {
        warn!("Could not reset device speed display");
    }

    let outcome = bridge.shutdown().await;
    match outcome {
        ShutdownOutcome::Idle => info!("Bridge stopped (no device connected)"),
        ShutdownOutcome::Joined => info!("Bridge stopped"),
        ShutdownOutcome::Aborted => warn!("Bridge stopped, reader task aborted"),
    }
    outcome
}
