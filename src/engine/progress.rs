//! Terminal progress bar driven by pipeline progress events.

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

use crate::types::{Phase, Progress, ProgressCallback};

pub type ProgressBar = Arc<Mutex<Bar>>;

/// Update the bar's total (e.g. once the candidate count is known). Refreshes the display.
pub fn set_bar_total(pb: &ProgressBar, total: usize) {
    if let Ok(mut bar) = pb.try_lock() {
        bar.total = total;
        let _ = bar.refresh();
    }
}

/// Create a counter for unknown total (shows count without percentage)
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " files"
    )))
}

/// Move the bar to an absolute position. Uses try_lock so pipeline workers never block on it.
pub fn set_bar_position(pb: &ProgressBar, n: usize) {
    if let Ok(mut bar) = pb.try_lock()
        && n > bar.counter
    {
        let _ = bar.update_to(n);
    }
}

fn set_bar_desc(pb: &ProgressBar, desc: &str) {
    if let Ok(mut bar) = pb.try_lock() {
        bar.set_description(desc);
        let _ = bar.refresh();
    }
}

/// Progress callback that drives `pb`: entries while scanning, files while processing.
pub fn bar_callback(pb: &ProgressBar) -> ProgressCallback {
    let pb = Arc::clone(pb);
    let last_phase: Mutex<Option<Phase>> = Mutex::new(None);
    Arc::new(move |p: &Progress| {
        let changed = {
            let mut last = last_phase.lock().unwrap_or_else(|e| e.into_inner());
            let changed = *last != Some(p.phase) && p.phase != Phase::Analyzing;
            if changed {
                *last = Some(p.phase);
            }
            changed
        };
        match p.phase {
            Phase::Scanning => {
                if changed {
                    set_bar_desc(&pb, "Scanning");
                }
                set_bar_position(&pb, p.files_processed);
            }
            Phase::Processing | Phase::Analyzing => {
                if changed && let Ok(mut bar) = pb.try_lock() {
                    bar.reset(Some(p.total_files));
                    bar.set_description("Digesting");
                }
                set_bar_position(&pb, p.files_processed);
            }
            Phase::Generating | Phase::Formatting | Phase::Complete => {
                if changed {
                    set_bar_total(&pb, p.total_files);
                    set_bar_position(&pb, p.total_files);
                }
            }
        }
    })
}

/// Final refresh and newline so following output starts on a clean line.
pub fn finish_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.lock() {
        let _ = bar.refresh();
    }
    eprintln!();
}
