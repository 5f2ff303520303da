//! State shared between the tick loop, the reader task and line senders

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tiltlink_core::DebugConfig;
use tiltlink_hardware::LineWriter;

use super::mailbox::Mailbox;
use super::telemetry::TelemetryFields;

/// Connection state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No port is open
    Closed,
    /// Candidates are being probed
    Probing,
    /// A device was recognized and the reader owns the port
    Open,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Probing => "probing",
            ConnectionState::Open => "open",
        }
    }
}

#[derive(Debug)]
pub(crate) struct LinkStatus {
    pub state: ConnectionState,
    /// Bumped on every promotion; readers compare against it before closing
    pub generation: u64,
    pub port_name: String,
}

pub(crate) struct LinkShared {
    pub fields: TelemetryFields,
    pub mailbox: Mailbox,
    pub debug: DebugConfig,
    /// Serializes probing, promotion and closing
    pub lifecycle: tokio::sync::Mutex<()>,
    /// Write side of the open link, held for one write at a time
    pub writer: tokio::sync::Mutex<Option<Box<dyn LineWriter>>>,
    /// At most one reconnect may be pending
    pub reconnect_armed: AtomicBool,
    /// Set once the bridge shuts down; nothing is rescheduled afterwards
    pub stopped: AtomicBool,
    status: Mutex<LinkStatus>,
}

impl LinkShared {
    pub fn new(debug: DebugConfig) -> Self {
        Self {
            fields: TelemetryFields::default(),
            mailbox: Mailbox::default(),
            debug,
            lifecycle: tokio::sync::Mutex::new(()),
            writer: tokio::sync::Mutex::new(None),
            reconnect_armed: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            status: Mutex::new(LinkStatus {
                state: ConnectionState::Closed,
                generation: 0,
                port_name: String::new(),
            }),
        }
    }

    pub fn status(&self) -> MutexGuard<'_, LinkStatus> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> ConnectionState {
        self.status().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Close the link identified by `generation` if it is still current.
    ///
    /// Caller must hold the lifecycle lock. Returns `true` when this call
    /// performed the close.
    pub async fn release_locked(&self, generation: u64) -> bool {
        let mut writer = self.writer.lock().await;
        {
            let mut status = self.status();
            if status.generation != generation || status.state != ConnectionState::Open {
                return false;
            }
            status.state = ConnectionState::Closed;
            status.port_name.clear();
        }
        // Dropping the write half; the port closes once the reader exits too
        writer.take();
        true
    }
}
