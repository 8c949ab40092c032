//! Single-fire event primitive.
//!
//! A [`OneShotSignal`] fires at most once for its whole lifetime and has exactly
//! one waiter, obtained through [`OneShotSignal::take_waiter`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

/// Fire-once signal with a single waiter.
#[derive(Debug)]
pub struct OneShotSignal {
    fired: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<()>>>,
    waiter: Mutex<Option<SignalWaiter>>,
}

/// The one waiting side of a [`OneShotSignal`].
#[derive(Debug)]
pub struct SignalWaiter {
    receiver: oneshot::Receiver<()>,
}

impl OneShotSignal {
    /// Unfired signal with its waiter available.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self {
            fired: AtomicBool::new(false),
            sender: Mutex::new(Some(sender)),
            waiter: Mutex::new(Some(SignalWaiter { receiver })),
        }
    }

    /// Fire the signal. Returns `true` only for the call that actually fired it.
    pub fn fire(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(sender) = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            // The waiter may already be gone; firing still counts.
            let _ = sender.send(());
        }
        true
    }

    /// Whether the signal has fired.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Hand out the waiter. Returns `None` after the first call.
    #[must_use]
    pub fn take_waiter(&self) -> Option<SignalWaiter> {
        self.waiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Default for OneShotSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalWaiter {
    /// Block until the signal fires. Returns `false` if the signal was dropped
    /// without firing.
    pub async fn wait(self) -> bool {
        self.receiver.await.is_ok()
    }
}
