//! Single-slot mailbox for work handed back to the tick loop

use std::sync::Mutex;

/// Deferred action executed on the tick loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Re-run port resolution and probing
    Reconnect,
}

/// Holds at most one pending action; a newer post replaces an undrained one.
#[derive(Debug, Default)]
pub struct Mailbox {
    slot: Mutex<Option<PendingAction>>,
}

impl Mailbox {
    pub fn post(&self, action: PendingAction) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(action);
    }

    pub fn take(&self) -> Option<PendingAction> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub fn clear(&self) {
        self.take();
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_drains_slot() {
        let mailbox = Mailbox::default();
        assert_eq!(mailbox.take(), None);

        mailbox.post(PendingAction::Reconnect);
        assert!(mailbox.is_pending());
        assert_eq!(mailbox.take(), Some(PendingAction::Reconnect));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_repeated_posts_collapse() {
        let mailbox = Mailbox::default();
        mailbox.post(PendingAction::Reconnect);
        mailbox.post(PendingAction::Reconnect);

        assert_eq!(mailbox.take(), Some(PendingAction::Reconnect));
        assert!(!mailbox.is_pending());
    }
}
