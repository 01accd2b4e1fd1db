//! Cancellable execution context threaded through long-running operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Why a context stopped admitting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation flag plus optional deadline. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Request cancellation for this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail fast if the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
