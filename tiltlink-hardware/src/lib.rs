//! tiltlink-hardware
//!
//! Hardware crate containing the serial transport used by the bridge:
//! port discovery, connection probing and the line-oriented serial driver.
//!
//! Public API:
//! - `serial_driver::SerialDriver` - opens OS serial ports as line links
//! - `ports::resolve_candidates` - ordered list of ports to probe
//! - `prober::Prober` - finds the port a device is actually talking on
//! - `transport` - traits the bridge is written against

pub mod ports;
pub mod prober;
pub mod serial_driver;
pub mod transport;

pub use ports::{enumerate_ports, resolve_candidates, PortCandidate, PortNaming};
pub use prober::Prober;
pub use serial_driver::SerialDriver;
pub use transport::{
    HandshakeCombo, LineReader, LineWriter, LinkSettings, PortOpener, ReadOutcome, SerialLink,
    HANDSHAKE_COMBOS,
};
