// Copyright 2026 The avs2-decoder Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Worker thread pool executing submitted reconstruction jobs.
//!
//! Grounded on `c2_wrapper.rs`'s worker-thread pattern: a shared job queue, a
//! `Mutex`-guarded run state checked by each worker between jobs, and a
//! `Drop` impl that performs the same shutdown dance C2's explicit
//! `release()` call would, via RAII instead.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::queue::NodeQueue;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(PartialEq, Eq, Clone, Copy)]
enum PoolState {
    Running,
    ShuttingDown,
}

/// A pool of worker threads pulling `Job`s from a shared queue.
pub struct WorkerPool {
    queue: Arc<NodeQueue<Job>>,
    state: Arc<Mutex<PoolState>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(num_workers: usize) -> Self {
        let queue = Arc::new(NodeQueue::new());
        let state = Arc::new(Mutex::new(PoolState::Running));
        let mut workers = Vec::with_capacity(num_workers);
        for idx in 0..num_workers {
            let queue = queue.clone();
            let state = state.clone();
            workers.push(
                std::thread::Builder::new()
                    .name(format!("avs2-worker-{idx}"))
                    .spawn(move || Self::run(queue, state))
                    .expect("failed to spawn worker thread"),
            );
        }
        Self {
            queue,
            state,
            workers,
        }
    }

    fn run(queue: Arc<NodeQueue<Job>>, state: Arc<Mutex<PoolState>>) {
        loop {
            match queue.remove_head(true) {
                Some(job) => job(),
                None => {
                    // Queue was shut down; only exit once told to, so any
                    // job submitted just before shutdown still runs.
                    if *state.lock().unwrap() == PoolState::ShuttingDown {
                        return;
                    }
                }
            }
        }
    }

    /// Submits a reconstruction job. Submission is always non-blocking: the
    /// job queue is unbounded, so there is no `wait_policy` to honor.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        self.queue.append(Box::new(job));
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        *self.state.lock().unwrap() = PoolState::ShuttingDown;
        self.queue.shutdown();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_submitted_jobs() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..50 {
            let counter = counter.clone();
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(pool);
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }
}
