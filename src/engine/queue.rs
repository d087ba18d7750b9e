//! # Time-ordered pending-event queue.
//!
//! [`EventQueue`] is the one shared mutable structure in the engine: a
//! min-heap of [`PendingEvent`]s keyed by `(due time, sequence)` behind a
//! single mutex, plus a [`Notify`] that wakes the dispatch loop when a new
//! event lands. Any task may push concurrently; only the dispatch loop pops.
//!
//! Critical sections are short and no lock is ever held across a handler
//! invocation, so a handler re-entering `fire` cannot deadlock.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::engine::{ContextRef, PendingEvent};
use crate::rules::Args;

/// Mutex-guarded min-heap of pending events with a dispatcher wake-up.
pub struct EventQueue {
    heap: Mutex<BinaryHeap<Reverse<PendingEvent>>>,
    notify: Notify,
    seq: AtomicU64,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            seq: AtomicU64::new(0),
        }
    }

    /// Enqueues a new pending event and wakes the dispatcher.
    ///
    /// Called from any task; the critical section is a single heap push.
    pub fn push(&self, key: String, args: Args, delay: Option<Duration>, context: ContextRef) {
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        let event = PendingEvent::new(key, args, delay, context, seq);
        self.heap
            .lock()
            .expect("queue lock poisoned")
            .push(Reverse(event));
        self.notify.notify_one();
    }

    /// Pops the earliest event if its due time has passed.
    pub fn pop_due(&self) -> Option<PendingEvent> {
        let mut heap = self.heap.lock().expect("queue lock poisoned");
        if heap.peek().is_some_and(|Reverse(ev)| ev.is_due()) {
            heap.pop().map(|Reverse(ev)| ev)
        } else {
            None
        }
    }

    /// Due time of the earliest pending event, if any.
    pub fn next_due(&self) -> Option<Instant> {
        let heap = self.heap.lock().expect("queue lock poisoned");
        heap.peek().map(|Reverse(ev)| ev.due_at())
    }

    /// Completes when a new event has been pushed.
    ///
    /// `notify_one` stores a permit, so a push racing this call is not lost.
    pub async fn changed(&self) {
        self.notify.notified().await;
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.lock().expect("queue lock poisoned").len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
