//! Per-file error side channel: classify, report best-effort, never propagate.

use log::warn;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;

/// Coarse category of a per-file failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Encoding,
    Notebook,
    TokenAnalysis,
    Unknown,
}

/// Where a per-file failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    Content,
    Analyze,
}

/// Details passed along with a reported error.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub stage: ErrorStage,
    pub relative_path: String,
    pub kind: ErrorKind,
}

/// Receives per-file failures. Implementations may fail; the pipeline ignores that.
pub trait ErrorReporter: Send + Sync {
    fn report_error(&self, error: &anyhow::Error, context: &ErrorContext) -> anyhow::Result<()>;
}

/// Logs at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report_error(&self, error: &anyhow::Error, context: &ErrorContext) -> anyhow::Result<()> {
        warn!(
            "{} ({:?}, {:?}): {:#}",
            context.relative_path, context.stage, context.kind, error
        );
        Ok(())
    }
}

/// Classify by the root cause.
pub fn classify_error(error: &anyhow::Error, stage: ErrorStage) -> ErrorKind {
    if stage == ErrorStage::Analyze {
        return ErrorKind::TokenAnalysis;
    }
    for cause in error.chain() {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return match io.kind() {
                std::io::ErrorKind::InvalidData => ErrorKind::Encoding,
                _ => ErrorKind::Io,
            };
        }
        if cause.downcast_ref::<std::string::FromUtf8Error>().is_some()
            || cause.downcast_ref::<std::str::Utf8Error>().is_some()
        {
            return ErrorKind::Encoding;
        }
        if cause.downcast_ref::<serde_json::Error>().is_some() {
            return ErrorKind::Notebook;
        }
    }
    let text = format!("{:#}", error).to_ascii_lowercase();
    if text.contains("notebook") {
        ErrorKind::Notebook
    } else {
        ErrorKind::Unknown
    }
}

/// Hand the error to `reporter`; its errors and panics are swallowed.
pub fn report_best_effort(reporter: &dyn ErrorReporter, error: &anyhow::Error, context: &ErrorContext) {
    match catch_unwind(AssertUnwindSafe(|| reporter.report_error(error, context))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::debug!("Error reporter failed: {:#}", e),
        Err(_) => log::debug!("Error reporter panicked"),
    }
}

/// Log paths the scanner could not read. Listed individually when `verbose`.
pub fn log_skipped_paths(skipped: &[(PathBuf, String)], verbose: bool) {
    if skipped.is_empty() {
        return;
    }
    warn!(
        "Skipped {} paths due to permission errors or access issues",
        skipped.len()
    );
    if verbose {
        for (p, msg) in skipped {
            warn!("  skipped: {} ({})", p.display(), msg);
        }
    }
}
