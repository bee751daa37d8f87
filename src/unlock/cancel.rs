//! Cancellation of an in-flight unlock attempt.

use tokio::sync::watch;

/// Cloneable handle the host uses to abandon the current attempt (e.g. on navigation away).
///
/// Cancelling interrupts the signing wait or the confirmation poll. It never
/// re-signs or resubmits. The flag is sticky until the next attempt starts.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Trigger cancellation of the attempt in flight.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Clear the flag at the start of a new attempt and subscribe to it.
    pub(crate) fn arm(&self) -> watch::Receiver<bool> {
        self.tx.send_replace(false);
        self.tx.subscribe()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the handle has been cancelled.
pub(crate) async fn cancelled(rx: &mut watch::Receiver<bool>) {
    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
    if closed {
        // Sender gone: nobody can cancel any more.
        std::future::pending::<()>().await;
    }
}
