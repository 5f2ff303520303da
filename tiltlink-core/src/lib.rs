//! TiltLink Core Library
//!
//! Shared types, wire protocol and steering math for the TiltLink serial
//! bridge. This crate is used by both the hardware and daemon components.

pub mod actuation;
pub mod config;
pub mod error;
pub mod protocol;
pub mod steering;

// Re-export commonly used types
pub use config::{
    default_config_path, BridgeConfig, DebugConfig, HostConfig, ReconnectConfig, SerialConfig,
    SpeedConfig, SteeringConfig,
};
pub use error::*;
pub use protocol::{TelemetryLine, MAX_SPEED_KMH};
pub use steering::{InputEvent, SteeringFilter, SteeringOutputs, TelemetrySample};
