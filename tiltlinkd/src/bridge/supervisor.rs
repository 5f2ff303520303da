//! Reconnect scheduling
//!
//! The delay runs on its own task so neither the tick loop nor the reader
//! ever sleeps for it. When it elapses the request lands in the mailbox and
//! the tick loop performs the actual re-probe.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use super::link::LinkShared;
use super::mailbox::PendingAction;

#[derive(Clone)]
pub struct ReconnectSupervisor {
    shared: Arc<LinkShared>,
    delay: Duration,
}

impl ReconnectSupervisor {
    pub(crate) fn new(shared: Arc<LinkShared>, delay: Duration) -> Self {
        Self { shared, delay }
    }

    /// Schedule a reconnect after the configured delay.
    ///
    /// Returns `false` if one is already pending or the bridge has stopped.
    pub fn schedule(&self) -> bool {
        if self.shared.is_stopped() {
            return false;
        }
        if self
            .shared
            .reconnect_armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Reconnect already pending");
            return false;
        }

        info!("Reconnecting in {:?}", self.delay);
        let shared = self.shared.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            sleep(delay).await;
            if !shared.is_stopped() {
                shared.mailbox.post(PendingAction::Reconnect);
            }
        });
        true
    }

    /// Whether a reconnect is scheduled or waiting in the mailbox
    pub fn is_pending(&self) -> bool {
        self.shared.reconnect_armed.load(Ordering::Acquire)
    }

    /// Called by the tick loop when it picks the request up, so a failed
    /// attempt can schedule the next one.
    pub(crate) fn disarm(&self) {
        self.shared.reconnect_armed.store(false, Ordering::Release);
    }
}
