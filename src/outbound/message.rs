//! # Outbound message: one emitted payload.
//!
//! An [`OutboundMessage`] is what [`Manager::emit`] hands to the transport:
//! an event name, a JSON payload, and an optional target session. Each
//! message carries a globally unique sequence number (`seq`) that increases
//! monotonically; use it to restore order when messages are observed out of
//! order downstream.
//!
//! [`Manager::emit`]: crate::engine::Manager::emit

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use serde::Serialize;
use serde_json::Value;

/// Global sequence counter for outbound ordering.
static OUTBOUND_SEQ: AtomicU64 = AtomicU64::new(0);

/// A payload bound for the outside world (usually a browser).
#[derive(Clone, Debug, Serialize)]
pub struct OutboundMessage {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp (for logs).
    #[serde(skip)]
    pub at: SystemTime,
    /// Name of the emitted event.
    pub event: String,
    /// JSON payload.
    pub data: Value,
    /// Target session; `None` broadcasts to all connected listeners.
    pub target: Option<String>,
}

impl OutboundMessage {
    /// Creates a new message with the current timestamp and next sequence
    /// number.
    pub fn new(event: impl Into<String>, data: Value, target: Option<&str>) -> Self {
        Self {
            seq: OUTBOUND_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            event: event.into(),
            data,
            target: target.map(str::to_string),
        }
    }

    /// Whether this message is scoped to a single session.
    pub fn is_targeted(&self) -> bool {
        self.target.is_some()
    }
}
