//! Cooperative cancellation shared between the caller and pipeline workers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{DigestError, Outcome};

/// Cloneable flag. Cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once tripped.
    pub fn check(&self) -> Outcome<()> {
        if self.is_cancelled() {
            Err(DigestError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// The underlying flag, for handlers that only take an `AtomicBool` (e.g. Ctrl+C).
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Check an optional token; no token means never cancelled.
pub fn check_cancelled(token: Option<&CancellationToken>) -> Outcome<()> {
    token.map_or(Ok(()), CancellationToken::check)
}
