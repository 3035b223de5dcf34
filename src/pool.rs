//! Worker Pool
//!
//! Fixed-size pool for the short-lived parallel tasks of one pass: placement
//! tasks (one per queued file) and load tasks (one per partition group).
//! Tasks are fed through a crossbeam channel to scoped worker threads; the
//! call returns only after every in-flight task has finished, which gives the
//! synchronization barrier between the placement and load phases.

use crossbeam::channel;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Result;

/// Fixed-size worker pool
///
/// The pool itself is stateless between calls; `run` spawns `size` scoped
/// threads for the duration of one task batch.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    /// Create a pool with the given number of workers (at least 1)
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    /// Get the worker count
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run one task per item and collect the results.
    ///
    /// A task returning `Err` poisons the batch: workers stop picking up new
    /// tasks, in-flight tasks run to completion, and the error is returned
    /// among the collected results. Result order is unspecified.
    pub fn run<T, R, F>(&self, items: Vec<T>, task: F) -> Vec<Result<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Result<R> + Sync,
    {
        if items.is_empty() {
            return Vec::new();
        }

        let (task_tx, task_rx) = channel::unbounded::<T>();
        let (result_tx, result_rx) = channel::unbounded::<Result<R>>();
        for item in items {
            // Receiver is alive until workers finish, send cannot fail here
            let _ = task_tx.send(item);
        }
        drop(task_tx);

        let poisoned = AtomicBool::new(false);
        let task = &task;
        let poisoned_ref = &poisoned;

        std::thread::scope(|scope| {
            for _ in 0..self.size {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    while let Ok(item) = task_rx.recv() {
                        // Stop dispatching after a fatal task error; whatever
                        // tasks are already running elsewhere finish normally.
                        if poisoned_ref.load(Ordering::Relaxed) {
                            break;
                        }
                        let result = task(item);
                        if result.is_err() {
                            poisoned_ref.store(true, Ordering::Relaxed);
                        }
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                });
            }
        });

        drop(result_tx);
        result_rx.into_iter().collect()
    }
}
