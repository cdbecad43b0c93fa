//! Progress reporting to the caller's callback: elapsed time, ETA, memory, throttling.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::types::{Phase, Progress, ProgressCallback};
use crate::utils::config::DigestDefaults;

/// Resident set size of this process, in bytes.
pub fn memory_usage() -> Option<u64> {
    use sysinfo::{ProcessesToUpdate, System};
    let pid = sysinfo::get_current_pid().ok()?;
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid).map(|p| p.memory())
}

/// Allows one event per `interval`.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// True when enough time has passed since the last allowed event.
    pub fn ready(&self) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        match *last {
            Some(prev) if now.duration_since(prev) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

/// Builds [`Progress`] snapshots for one run and forwards them to the callback.
pub struct ProgressEmitter {
    callback: Option<ProgressCallback>,
    started: Instant,
    memory_throttle: Throttle,
    memory: Mutex<Option<u64>>,
}

impl ProgressEmitter {
    pub fn new(callback: Option<ProgressCallback>, started: Instant) -> Self {
        Self::with_memory_interval(callback, started, DigestDefaults::MEMORY_SAMPLE_INTERVAL)
    }

    /// Like [`ProgressEmitter::new`], resampling memory at most once per `interval`.
    pub fn with_memory_interval(
        callback: Option<ProgressCallback>,
        started: Instant,
        interval: Duration,
    ) -> Self {
        Self {
            callback,
            started,
            memory_throttle: Throttle::new(interval),
            memory: Mutex::new(None),
        }
    }

    pub fn is_active(&self) -> bool {
        self.callback.is_some()
    }

    /// Emit one snapshot. A panicking callback is swallowed.
    pub fn emit(
        &self,
        phase: Phase,
        files_processed: usize,
        total_files: usize,
        tokens_processed: usize,
        current_file: Option<&str>,
    ) {
        let Some(callback) = &self.callback else {
            return;
        };
        let elapsed = self.started.elapsed();
        let progress = Progress {
            phase,
            files_processed,
            total_files,
            tokens_processed,
            current_file: current_file.map(str::to_string),
            time_elapsed_ms: elapsed.as_millis() as u64,
            estimated_time_remaining_ms: estimate_remaining(elapsed, files_processed, total_files),
            memory_usage: self.sample_memory(),
        };
        if catch_unwind(AssertUnwindSafe(|| callback(&progress))).is_err() {
            log::debug!("Progress callback panicked during {:?}", phase);
        }
    }

    /// Time-throttled: per-file events reuse the last sample.
    fn sample_memory(&self) -> Option<u64> {
        let mut memory = self.memory.lock().unwrap_or_else(|e| e.into_inner());
        if self.memory_throttle.ready() {
            *memory = memory_usage();
        }
        *memory
    }
}

/// Linear ETA from the average time per finished file.
fn estimate_remaining(elapsed: Duration, done: usize, total: usize) -> Option<u64> {
    if done == 0 || total <= done {
        return None;
    }
    let per_file = elapsed.as_millis() as f64 / done as f64;
    Some((per_file * (total - done) as f64).round() as u64)
}
