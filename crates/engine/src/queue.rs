// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded concurrency for pipeline executions.
//!
//! N slots; waiters are served strictly first-come first-served with no
//! timeout. Queue position lives only in memory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Clone)]
pub struct JobQueue {
    slots: Arc<Semaphore>,
    capacity: usize,
    running: Arc<AtomicUsize>,
    queued: Arc<AtomicUsize>,
}

/// Counts of running and waiting executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub running: usize,
    pub queued: usize,
}

/// A held execution slot. Released on drop.
pub struct Slot {
    _permit: OwnedSemaphorePermit,
    _running: Gauge,
}

/// Increments a counter for as long as it lives.
struct Gauge(Arc<AtomicUsize>);

impl Gauge {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for Gauge {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl JobQueue {
    pub fn new(slots: usize) -> Self {
        let capacity = slots.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            running: Arc::new(AtomicUsize::new(0)),
            queued: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait for a free slot. Dropping the future leaves the queue.
    ///
    /// Returns `None` once the queue is closed.
    pub async fn acquire(&self) -> Option<Slot> {
        let waiting = Gauge::enter(&self.queued);
        let permit = Arc::clone(&self.slots).acquire_owned().await.ok()?;
        drop(waiting);
        Some(Slot { _permit: permit, _running: Gauge::enter(&self.running) })
    }

    /// Stop handing out slots; current and future waiters get `None`.
    pub fn close(&self) {
        self.slots.close();
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            running: self.running.load(Ordering::SeqCst),
            queued: self.queued.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
