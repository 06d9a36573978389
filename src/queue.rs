// Copyright 2026 The avs2-decoder Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! A small mutex-and-condvar FIFO, the building block the ES-unit lists and
//! the worker pool's job queue are both built from. Mirrors the
//! `Arc<Mutex<VecDeque<J>>>` plus condvar-gated wait loop pattern used to hand
//! work to a worker thread, generalized to a standalone, reusable queue.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Thread-safe FIFO of `T`, supporting blocking and non-blocking removal.
///
/// Once [`NodeQueue::shutdown`] has been called, all current and future
/// blocking waiters are released and receive `None` instead of waiting
/// forever; this is how `close()` unsticks any thread parked in
/// `remove_head(true)`.
pub struct NodeQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    shutdown: Mutex<bool>,
}

impl<T> NodeQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            shutdown: Mutex::new(false),
        }
    }

    /// Appends `item` to the tail and wakes one waiter, if any.
    pub fn append(&self, item: T) {
        let mut items = self.items.lock().unwrap();
        items.push_back(item);
        drop(items);
        self.not_empty.notify_one();
    }

    /// Removes the head element. If `blocking` and the queue is empty, waits
    /// until an element is appended or [`Self::shutdown`] is called.
    pub fn remove_head(&self, blocking: bool) -> Option<T> {
        let mut items = self.items.lock().unwrap();
        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            if !blocking || *self.shutdown.lock().unwrap() {
                return None;
            }
            items = self.not_empty.wait(items).unwrap();
        }
    }

    /// Non-blocking removal; returns `None` immediately if the queue is empty.
    pub fn remove_head_nonblocking(&self) -> Option<T> {
        self.remove_head(false)
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wakes every blocked waiter; subsequent `remove_head(true)` calls on an
    /// empty queue return `None` instead of blocking.
    pub fn shutdown(&self) {
        *self.shutdown.lock().unwrap() = true;
        self.not_empty.notify_all();
    }

    /// Drains all remaining elements, e.g. to free pool nodes at close.
    pub fn drain(&self) -> Vec<T> {
        self.items.lock().unwrap().drain(..).collect()
    }
}

impl<T> Default for NodeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn fifo_order_is_preserved() {
        let q = NodeQueue::new();
        q.append(1);
        q.append(2);
        q.append(3);
        assert_eq!(q.remove_head(false), Some(1));
        assert_eq!(q.remove_head(false), Some(2));
        assert_eq!(q.remove_head(false), Some(3));
        assert_eq!(q.remove_head(false), None);
    }

    #[test]
    fn blocking_remove_wakes_on_append() {
        let q = Arc::new(NodeQueue::new());
        let q2 = q.clone();
        let handle = thread::spawn(move || q2.remove_head(true));
        thread::sleep(Duration::from_millis(20));
        q.append(42);
        assert_eq!(handle.join().unwrap(), Some(42));
    }

    #[test]
    fn shutdown_releases_blocked_waiter() {
        let q = Arc::new(NodeQueue::<i32>::new());
        let q2 = q.clone();
        let handle = thread::spawn(move || q2.remove_head(true));
        thread::sleep(Duration::from_millis(20));
        q.shutdown();
        assert_eq!(handle.join().unwrap(), None);
    }
}
