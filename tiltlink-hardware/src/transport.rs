//! Transport abstraction for line-oriented serial links
//!
//! The prober and the bridge only talk to these traits, so they can be
//! exercised against in-memory transports without real hardware.

use async_trait::async_trait;
use std::time::Duration;
use tiltlink_core::{Result, SerialConfig};

/// DTR/RTS control line levels applied when a port is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HandshakeCombo {
    pub dtr: bool,
    pub rts: bool,
}

impl HandshakeCombo {
    pub const OFF: HandshakeCombo = HandshakeCombo {
        dtr: false,
        rts: false,
    };
    pub const ON: HandshakeCombo = HandshakeCombo {
        dtr: true,
        rts: true,
    };
}

/// Control line combinations tried for every candidate, in order.
///
/// Some Bluetooth SPP bridges only stream once DTR/RTS are asserted, while
/// USB boards with auto-reset circuits reboot when they are.
pub const HANDSHAKE_COMBOS: [HandshakeCombo; 2] = [HandshakeCombo::OFF, HandshakeCombo::ON];

/// Settings used to open a link (always 8N1, no flow control, ASCII)
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSettings {
    pub baud_rate: u32,
    /// Appended to every outbound line
    pub newline: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub handshake: HandshakeCombo,
}

impl LinkSettings {
    pub fn from_config(config: &SerialConfig) -> Self {
        Self {
            baud_rate: config.baud_rate,
            newline: "\n".to_string(),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
            handshake: HandshakeCombo::OFF,
        }
    }

    pub fn with_handshake(&self, handshake: HandshakeCombo) -> Self {
        Self {
            handshake,
            ..self.clone()
        }
    }
}

/// Result of a single bounded line read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, without its terminator
    Line(String),
    /// Nothing arrived within the read timeout
    Timeout,
}

/// Read side of a link
#[async_trait]
pub trait LineReader: Send {
    /// Read one line, waiting at most the link's read timeout.
    ///
    /// A timeout is reported as [`ReadOutcome::Timeout`]; every `Err` is a
    /// fault that ends the connection.
    async fn read_line(&mut self) -> Result<ReadOutcome>;
}

/// Write side of a link
#[async_trait]
pub trait LineWriter: Send {
    /// Write `line` followed by the link's newline.
    async fn write_line(&mut self, line: &str) -> Result<()>;
}

/// An open link split into independently owned halves.
///
/// Dropping both halves closes the port.
pub struct SerialLink {
    pub port_name: String,
    pub reader: Box<dyn LineReader>,
    pub writer: Box<dyn LineWriter>,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port_name", &self.port_name)
            .finish_non_exhaustive()
    }
}

/// Opens links and lists the ports the OS currently exposes
pub trait PortOpener: Send + Sync {
    /// Names of the serial ports currently present
    fn available_ports(&self) -> Result<Vec<String>>;

    /// Open `port` with the given settings
    fn open(&self, port: &str, settings: &LinkSettings) -> Result<SerialLink>;
}

/// Decode received bytes as ASCII; anything outside 7-bit ASCII becomes `?`.
pub fn decode_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect()
}

/// Encode text as ASCII; anything outside 7-bit ASCII becomes `?`.
pub fn encode_ascii(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}
