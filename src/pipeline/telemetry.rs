//! Timing/outcome hook points around a run. The sink is up to the caller.

use log::debug;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    DigestStarted,
    DigestCompleted {
        duration: Duration,
        files: usize,
        tokens: usize,
        truncated: bool,
    },
    DigestFailed {
        duration: Duration,
        cancelled: bool,
        message: String,
    },
}

pub trait Telemetry: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

/// Logs events at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn record(&self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::DigestStarted => debug!("digest started"),
            TelemetryEvent::DigestCompleted {
                duration,
                files,
                tokens,
                truncated,
            } => debug!(
                "digest completed in {:?}: {} files, {} tokens, truncated={}",
                duration, files, tokens, truncated
            ),
            TelemetryEvent::DigestFailed {
                duration,
                cancelled,
                message,
            } => debug!(
                "digest failed after {:?} (cancelled={}): {}",
                duration, cancelled, message
            ),
        }
    }
}
