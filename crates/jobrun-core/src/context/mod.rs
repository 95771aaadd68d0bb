//! Cancellation and deadline propagation for one task invocation.

use std::{future::Future, time::Duration};

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Carries cancellation and an optional deadline through a task's stages.
///
/// Derived contexts ([`with_timeout`](Self::with_timeout)) share cancellation
/// with their parent and never extend its deadline.
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl TaskContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context canceled together with `cancel`.
    pub fn from_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Child context whose deadline is at most `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(current) if current <= candidate => current,
            _ => candidate,
        };
        Self {
            cancel: self.cancel.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Like [`with_timeout`](Self::with_timeout), but a zero timeout adds no bound.
    pub fn bounded(&self, timeout: Duration) -> Self {
        if timeout.is_zero() {
            self.clone()
        } else {
            self.with_timeout(timeout)
        }
    }

    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Reason this context is finished, if it is.
    pub fn err(&self) -> Option<ContextError> {
        if self.cancel.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drive `fut` until it completes, the context is canceled, or the deadline passes.
    ///
    /// On cancellation or deadline `fut` is dropped, which aborts its I/O.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ContextError::Canceled),
            _ = sleep_until(self.deadline) => Err(ContextError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
