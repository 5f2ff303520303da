//! Configuration types for TiltLink
//!
//! [`BridgeConfig`] is loaded once at startup and stays immutable while the
//! bridge runs. It is split into one section per concern:
//! - [`SerialConfig`] - port selection and link timing
//! - [`ReconnectConfig`] - automatic reconnection
//! - [`SteeringConfig`] - angle to steer mapping
//! - [`DebugConfig`] - per-line debug logging toggles
//! - [`SpeedConfig`] - outbound speed publisher
//! - [`HostConfig`] - host tick loop

mod bridge_config;
mod paths;

pub use bridge_config::{
    BridgeConfig, DebugConfig, HostConfig, ReconnectConfig, SerialConfig, SpeedConfig,
    SteeringConfig,
};
pub use paths::default_config_path;
