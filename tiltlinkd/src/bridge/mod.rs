//! Serial bridge
//!
//! Connection lifecycle, background reader, telemetry handoff and the
//! per-tick consumer step.

mod connection_manager;
mod link;
mod mailbox;
mod reader;
mod sender;
mod supervisor;
mod telemetry;

pub use connection_manager::{EventHandler, SerialBridge, ShutdownOutcome};
pub use link::ConnectionState;
pub use mailbox::{Mailbox, PendingAction};
pub use reader::ReaderExit;
pub use sender::{LineSender, LineSink};
pub use telemetry::TelemetryFields;
