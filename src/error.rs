//! Run-level error type. Per-file failures never surface here; they are folded into
//! `statistics.errors` of the returned digest.

use thiserror::Error;

/// Fatal outcome of a digest run.
///
/// [`DigestError::Cancelled`] is kept distinct so callers can tell a user abort from a failure.
#[derive(Debug, Error)]
pub enum DigestError {
    /// The cancellation token was tripped. Partial results are discarded.
    #[error("digest generation cancelled")]
    Cancelled,
    /// Loading or validating configuration, or resolving the run context, failed.
    #[error("configuration error: {0:#}")]
    Config(anyhow::Error),
    /// The scan of the workspace root failed.
    #[error("scan failed: {0:#}")]
    Scan(anyhow::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DigestError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DigestError::Cancelled)
    }
}

/// Result of a cancellable pipeline step.
pub type Outcome<T> = std::result::Result<T, DigestError>;
