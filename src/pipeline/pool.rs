//! Bounded worker pool: at most `limit` tasks run at once, results keep input order.
//!
//! Tasks are handed to workers over a crossbeam channel. The first task error stops
//! further tasks from starting and is returned at once; workers still running are
//! detached and their results dropped.

use anyhow::anyhow;
use crossbeam_channel::{bounded, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// A unit of work for [`run_bounded`].
pub type Task<T, E> = Box<dyn FnOnce() -> Result<T, E> + Send + 'static>;

/// Run `tasks` with at most `limit` in flight. `limit == 1` runs inline on the caller's thread.
///
/// Returns results in input order, or the first error (by completion) and drops the rest.
/// A panicking task is reported as an error rather than unwinding into the caller.
pub fn run_bounded<T, E>(tasks: Vec<Task<T, E>>, limit: usize) -> Result<Vec<T>, E>
where
    T: Send + 'static,
    E: From<anyhow::Error> + Send + 'static,
{
    let total = tasks.len();
    if total == 0 {
        return Ok(Vec::new());
    }
    let limit = limit.clamp(1, total);
    if limit == 1 {
        return tasks
            .into_iter()
            .enumerate()
            .map(|(idx, task)| {
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(task))
                    .unwrap_or_else(|_| Err(E::from(anyhow!("worker task {} panicked", idx))))
            })
            .collect();
    }

    let (task_tx, task_rx) = bounded::<(usize, Task<T, E>)>(total);
    let (result_tx, result_rx) = unbounded::<(usize, thread::Result<Result<T, E>>)>();
    for item in tasks.into_iter().enumerate() {
        // Capacity is `total`, so this never blocks; the receiver is alive.
        let _ = task_tx.send(item);
    }
    drop(task_tx);

    let failed = Arc::new(AtomicBool::new(false));
    let handles: Vec<_> = (0..limit)
        .map(|_| {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let failed = Arc::clone(&failed);
            thread::spawn(move || {
                while let Ok((idx, task)) = task_rx.recv() {
                    if failed.load(Ordering::SeqCst) {
                        break;
                    }
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task));
                    if !matches!(outcome, Ok(Ok(_))) {
                        failed.store(true, Ordering::SeqCst);
                    }
                    if result_tx.send((idx, outcome)).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    drop(result_tx);

    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    while let Ok((idx, outcome)) = result_rx.recv() {
        match outcome {
            Ok(Ok(value)) => slots[idx] = Some(value),
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(E::from(anyhow!("worker task {} panicked", idx))),
        }
    }
    for h in handles {
        let _ = h.join();
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| slot.ok_or_else(|| E::from(anyhow!("worker task {} produced no result", idx))))
        .collect()
}
