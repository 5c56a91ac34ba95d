//! Background requests whose results are handed back to the main loop.
//!
//! Each job runs on its own worker thread and reports through a channel that
//! only the main loop drains. Jobs are tagged with a generation number; a result
//! is accepted only if no newer job was started (or `cancel` called) meanwhile.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

pub struct Inflight<T> {
    generation: u64,
    pending: bool,
    tx: Sender<(u64, T)>,
    rx: Receiver<(u64, T)>,
}

impl<T: Send + 'static> Inflight<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            generation: 0,
            pending: false,
            tx,
            rx,
        }
    }

    /// Start `job` on a worker thread, superseding any earlier job.
    pub fn spawn<F>(&mut self, job: F) -> u64
    where
        F: FnOnce() -> T + Send + 'static,
    {
        self.generation += 1;
        self.pending = true;
        let generation = self.generation;
        let tx = self.tx.clone();
        thread::spawn(move || {
            // The receiver may be gone if the owner was dropped.
            let _ = tx.send((generation, job()));
        });
        generation
    }

    /// Forget outstanding jobs; their results will be discarded.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = false;
    }

    /// Whether the newest job has not reported yet.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drain finished jobs without blocking and return the newest job's
    /// result, if it has arrived.
    pub fn poll(&mut self) -> Option<T> {
        let mut latest = None;
        while let Ok((generation, value)) = self.rx.try_recv() {
            if generation == self.generation {
                self.pending = false;
                latest = Some(value);
            } else {
                log::debug!(
                    "discarding stale result (generation {generation}, current {})",
                    self.generation
                );
            }
        }
        latest
    }
}

impl<T: Send + 'static> Default for Inflight<T> {
    fn default() -> Self {
        Self::new()
    }
}
