//! Call context: cancellation and deadlines for outbound calls.
//!
//! Every signed request, retry back-off and operation poll observes a
//! [`Context`]. A context is cheap to clone; all clones share the same
//! cancellation signal and deadline.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::ContextError;

/// Cancellation signal plus optional deadline, passed to every call.
#[derive(Debug, Clone)]
pub struct Context {
    cancelled: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

/// Cancels every clone of the [`Context`] it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel the associated context. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self {
            cancelled: rx,
            deadline: None,
        }
    }

    /// A context that can be cancelled through the returned handle.
    #[must_use]
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            cancelled: rx,
            deadline: None,
        };
        (ctx, CancelHandle { tx })
    }

    /// Attach a deadline. An earlier existing deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Attach a deadline `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the context is done, or `None` while it is still live.
    #[must_use]
    pub fn err(&self) -> Option<ContextError> {
        if *self.cancelled.borrow() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a background context.
    pub async fn done(&self) -> ContextError {
        let cancelled = wait_cancelled(self.cancelled.clone());
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = cancelled => ContextError::Cancelled,
                () = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
            },
            None => {
                cancelled.await;
                ContextError::Cancelled
            }
        }
    }

    /// Sleep for `duration` unless the context finishes first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), ContextError> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            () = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

async fn wait_cancelled(mut rx: watch::Receiver<bool>) {
    // A dropped sender that never cancelled means the signal can no longer fire.
    let signalled = rx.wait_for(|cancelled| *cancelled).await.map(|_| ());
    if signalled.is_err() {
        std::future::pending::<()>().await;
    }
}
