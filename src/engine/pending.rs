//! # Pending event: an immutable scheduling record.
//!
//! A [`PendingEvent`] captures one firing awaiting dispatch: the event key,
//! the validated arguments, when it was created, the requested delay, and the
//! owning context. Due time = creation instant + delay. The record is
//! immutable once created and leaves the queue exactly once, at dispatch.
//!
//! Ordering is by `(due time, sequence number)`, so events with equal due
//! times dispatch in insertion order.

use std::cmp::Ordering;
use std::time::Duration;

use tokio::time::Instant;

use crate::engine::ContextRef;
use crate::rules::Args;

/// A scheduled, not-yet-dispatched event.
#[derive(Clone)]
pub struct PendingEvent {
    key: String,
    args: Args,
    created_at: Instant,
    delay: Option<Duration>,
    context: ContextRef,
    seq: u64,
}

impl PendingEvent {
    pub(crate) fn new(
        key: String,
        args: Args,
        delay: Option<Duration>,
        context: ContextRef,
        seq: u64,
    ) -> Self {
        Self {
            key,
            args,
            created_at: Instant::now(),
            delay,
            context,
            seq,
        }
    }

    /// The event key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The validated arguments.
    pub fn args(&self) -> &Args {
        &self.args
    }

    /// When the event was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Requested delay, if any.
    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    /// The context this event fires in.
    pub fn context(&self) -> &ContextRef {
        &self.context
    }

    /// The instant at or after which the event is eligible for dispatch.
    pub fn due_at(&self) -> Instant {
        self.created_at + self.delay.unwrap_or_default()
    }

    /// Whether the event is eligible for dispatch right now.
    pub fn is_due(&self) -> bool {
        self.due_at() <= Instant::now()
    }
}

impl PartialEq for PendingEvent {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for PendingEvent {}

impl PartialOrd for PendingEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due_at()
            .cmp(&other.due_at())
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl std::fmt::Debug for PendingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingEvent")
            .field("key", &self.key)
            .field("delay", &self.delay)
            .field("context", &self.context.name())
            .field("seq", &self.seq)
            .finish()
    }
}
