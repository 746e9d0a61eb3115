use std::sync::{Mutex, PoisonError};
use std::thread::JoinHandle;

use crate::pipeline::dispatch_executor::{DispatchExecutor, DispatchJob};

/// Runs every dispatch job on its own named worker thread.
///
/// The sampler thread returns immediately after submitting, so its timer
/// keeps firing while a request is in flight. The busy flag carried by the
/// job is what keeps workers from overlapping.
pub struct ThreadedDispatchExecutor {
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadedDispatchExecutor {
    pub fn new() -> Self {
        Self {
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Blocks until every submitted job has finished.
    pub fn join_all(&self) {
        let workers: Vec<_> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in workers {
            if handle.join().is_err() {
                log::error!("Dispatch worker panicked");
            }
        }
    }
}

impl Default for ThreadedDispatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchExecutor for ThreadedDispatchExecutor {
    fn submit(&self, job: DispatchJob) {
        let spawned = std::thread::Builder::new()
            .name("dispatch".to_string())
            .spawn(job);
        match spawned {
            Ok(handle) => {
                let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
                workers.retain(|h| !h.is_finished());
                workers.push(handle);
            }
            // The job (and the busy guard it owns) is dropped with the
            // error, so the next tick can try again.
            Err(e) => log::error!("Failed to spawn dispatch worker: {e}"),
        }
    }
}
