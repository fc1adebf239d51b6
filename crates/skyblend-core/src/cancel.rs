//! Cancellation and deadline plumbing for outbound calls.
//!
//! A [`CancelToken`] is a cloneable shutdown flag; a [`CallContext`] pairs one
//! with an absolute deadline. Every suspension point in the fetch path (the
//! adapter's network call and the retry backoff) goes through
//! [`CallContext::run`] or [`CallContext::sleep`], so both return promptly
//! once either fires. Shutdown surfaces as
//! [`FetchErrorKind::Cancelled`](crate::FetchErrorKind::Cancelled); an
//! expired deadline is a
//! [`FetchErrorKind::RemoteTransient`](crate::FetchErrorKind::RemoteTransient)
//! failure, the same as any other upstream timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::source::FetchError;

/// Cloneable cancellation flag. Cancelling any clone cancels all of them.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as `self`, so `wait_for` cannot observe a
        // closed channel here.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

/// Cancellation token plus absolute deadline for one logical fetch.
#[derive(Debug, Clone)]
pub struct CallContext {
    cancel: CancelToken,
    deadline: Instant,
}

impl CallContext {
    pub fn new(cancel: CancelToken, deadline: Instant) -> Self {
        Self { cancel, deadline }
    }

    pub fn with_timeout(cancel: CancelToken, timeout: Duration) -> Self {
        Self::new(cancel, Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Returns the shutdown or deadline failure if the context is already spent.
    pub fn check(&self) -> Result<(), FetchError> {
        if self.cancel.is_cancelled() {
            return Err(FetchError::cancelled("call cancelled"));
        }
        if self.is_expired() {
            return Err(deadline_exceeded());
        }
        Ok(())
    }

    /// Drives `future` to completion unless cancellation or the deadline wins.
    pub async fn run<F>(&self, future: F) -> Result<F::Output, FetchError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FetchError::cancelled("call cancelled")),
            _ = tokio::time::sleep_until(self.deadline) => Err(deadline_exceeded()),
            output = future => Ok(output),
        }
    }

    /// Interruptible sleep used between retry attempts.
    pub async fn sleep(&self, delay: Duration) -> Result<(), FetchError> {
        self.run(tokio::time::sleep(delay)).await
    }
}

fn deadline_exceeded() -> FetchError {
    FetchError::transient("deadline exceeded")
}
