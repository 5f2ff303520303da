//! Outbound line path
//!
//! Writes go through the shared write lock and never touch the connection
//! state; a failed write is reported to the caller only.

use async_trait::async_trait;
use std::sync::Arc;
use tiltlink_core::protocol::format_speed;
use tracing::{info, warn};

use super::link::LinkShared;

/// Anything that can push a line to the device
#[async_trait]
pub trait LineSink: Send + Sync {
    fn is_connection_open(&self) -> bool;

    /// Send one line; `false` when closed or the write failed
    async fn send_line(&self, text: &str) -> bool;
}

/// Cloneable handle for sending lines to the connected device
#[derive(Clone)]
pub struct LineSender {
    shared: Arc<LinkShared>,
}

impl LineSender {
    pub(crate) fn new(shared: Arc<LinkShared>) -> Self {
        Self { shared }
    }

    /// Name of the open port, empty when closed
    pub fn current_port(&self) -> String {
        self.shared.status().port_name.clone()
    }

    /// Send `SPD:<kmh>`, clamped to the display range.
    pub async fn set_speed(&self, kmh: i32) -> bool {
        self.send_line(&format_speed(kmh)).await
    }
}

#[async_trait]
impl LineSink for LineSender {
    fn is_connection_open(&self) -> bool {
        self.shared.is_open()
    }

    async fn send_line(&self, text: &str) -> bool {
        if !self.shared.is_open() {
            return false;
        }

        let mut guard = self.shared.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return false;
        };

        match writer.write_line(text).await {
            Ok(()) => {
                if self.shared.debug.outbound {
                    info!("TX: {}", text);
                }
                true
            }
            Err(e) => {
                warn!("Send failed: {}", e);
                false
            }
        }
    }
}
