//! TiltLink bridge daemon
//!
//! Connects to a TiltLink controller over serial and runs the consumer loop
//! at the configured tick rate, logging every input change.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tiltlink_core::InputEvent;
use tiltlinkd::config::{
    load_config, resolve_config_path, resolve_port_override, CONFIG_ENV, PORT_ENV,
};
use tiltlinkd::host_loop::{run_host_loop, FixedSpeed};
use tiltlinkd::shutdown::{shutdown_signal, stop_bridge};
use tiltlinkd::{SerialBridge, SpeedPublisher};
use tracing::{debug, info};

/// TiltLink serial bridge daemon
#[derive(Parser, Debug)]
#[command(name = "tiltlinkd")]
#[command(version, about = "TiltLink serial bridge daemon", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fixed serial port (e.g., COM5, /dev/ttyUSB0); skips discovery
    #[arg(short, long)]
    port: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the ports that would be probed, in order, and exit
    #[arg(long)]
    list_ports: bool,

    /// Send a constant speed to the device display, in m/s
    #[arg(long)]
    speed_mps: Option<f32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    info!("TiltLink bridge starting...");

    let config_path = resolve_config_path(args.config, std::env::var(CONFIG_ENV).ok());
    info!("Configuration file: {}", config_path.display());

    let mut config = load_config(&config_path).await?;
    if let Some(port) = resolve_port_override(args.port, std::env::var(PORT_ENV).ok()) {
        config.serial.port = port;
    }

    let speed_config = config.speed.clone();
    let mut bridge = SerialBridge::with_serial_ports(config);

    if args.list_ports {
        let candidates = bridge.candidates();
        if candidates.is_empty() {
            println!("No candidate ports");
        }
        for (idx, candidate) in candidates.iter().enumerate() {
            println!("{:>2}. {}", idx + 1, candidate.name);
        }
        return Ok(());
    }

    bridge.on_event(log_event);

    let speed = args.speed_mps.map(|speed_mps| FixedSpeed {
        publisher: SpeedPublisher::new(speed_config),
        speed_mps,
    });
    run_host_loop(&mut bridge, speed, shutdown_signal()).await;

    stop_bridge(&mut bridge).await;
    info!("TiltLink bridge stopped");

    Ok(())
}

fn log_event(event: &InputEvent) {
    match *event {
        InputEvent::SteerChanged(steer) => debug!("Steer: {:+.3}", steer),
        InputEvent::ButtonChanged(pressed) => info!("Button A {}", press_word(pressed)),
        InputEvent::AuxButtonChanged(pressed) => info!("Button B {}", press_word(pressed)),
        InputEvent::ThrottleChanged(throttle) => debug!("Throttle: {:.2}", throttle),
    }
}

fn press_word(pressed: bool) -> &'static str {
    if pressed {
        "pressed"
    } else {
        "released"
    }
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
