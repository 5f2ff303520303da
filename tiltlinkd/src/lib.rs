//! TiltLink daemon library
//!
//! The serial bridge and its collaborators. The `tiltlinkd` binary wires
//! these into a fixed-rate tick loop; other hosts can embed them directly.

pub mod bridge;
pub mod config;
pub mod host_loop;
pub mod shutdown;
pub mod speed_sender;

pub use bridge::{
    ConnectionState, LineSender, LineSink, SerialBridge, ShutdownOutcome, TelemetryFields,
};
pub use speed_sender::{speed_kmh, SpeedPublisher};
