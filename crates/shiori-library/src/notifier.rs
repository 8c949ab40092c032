//! Bounded notification channel between the watcher and the auto-scanner.
//!
//! The channel holds at most one pending notification; notifying while one is
//! already pending coalesces into it.

use tokio::sync::mpsc::{self, error::TrySendError};

/// Sending half handed to the library watcher.
#[derive(Debug, Clone)]
pub struct ScanNotifier {
    sender: mpsc::Sender<()>,
}

/// Receiving half owned by the auto-scanner loop.
#[derive(Debug)]
pub struct ScanRequests {
    receiver: mpsc::Receiver<()>,
}

/// Create a connected notifier/requests pair.
#[must_use]
pub fn scan_channel() -> (ScanNotifier, ScanRequests) {
    let (sender, receiver) = mpsc::channel(1);
    (ScanNotifier { sender }, ScanRequests { receiver })
}

impl ScanNotifier {
    /// Signal that something changed. Never blocks.
    ///
    /// Returns `true` when a new notification was queued, `false` when it was
    /// coalesced into a pending one or the receiver is gone.
    pub fn notify(&self) -> bool {
        match self.sender.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(()) | TrySendError::Closed(())) => false,
        }
    }

    /// Whether the receiving side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl ScanRequests {
    /// Wait for the next notification; `None` once every notifier is dropped.
    pub async fn recv(&mut self) -> Option<()> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pending_notifications_coalesce() {
        let (notifier, mut requests) = scan_channel();
        assert!(notifier.notify());
        assert!(!notifier.notify());
        assert!(!notifier.clone().notify());

        assert_eq!(requests.recv().await, Some(()));
        assert!(notifier.notify());
    }

    #[tokio::test]
    async fn closed_receiver_drops_notifications() {
        let (notifier, requests) = scan_channel();
        drop(requests);
        assert!(notifier.is_closed());
        assert!(!notifier.notify());
    }
}
