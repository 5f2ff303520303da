//! Error types for the TiltLink system

use thiserror::Error;

/// Core error type for TiltLink operations
#[derive(Error, Debug)]
pub enum TiltLinkError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// No candidate port answered with a recognizable line
    #[error("Device not found")]
    DeviceNotFound,

    /// Device disconnected (USB unplugged, Bluetooth link dropped)
    #[error("Device disconnected: {0}")]
    DeviceDisconnected(String),

    /// Operation requires an open connection
    #[error("Not connected")]
    NotConnected,
}

/// Result type alias for TiltLink operations
pub type Result<T> = std::result::Result<T, TiltLinkError>;

impl From<toml::de::Error> for TiltLinkError {
    fn from(err: toml::de::Error) -> Self {
        TiltLinkError::Config(err.to_string())
    }
}
