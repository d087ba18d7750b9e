//! # Outbound bus: the publish boundary toward remote listeners.
//!
//! [`OutboundBus`] is a thin wrapper around [`tokio::sync::broadcast`] that
//! carries [`OutboundMessage`]s from the engine to whatever transport
//! delivers them (a websocket layer, a TCP writer, a test collector). The
//! transport's own protocol — handshake, framing, reconnection — stays
//! outside the engine.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or awaits.
//! - **Bounded capacity**: one ring buffer stores recent messages for all
//!   receivers; slow receivers observe `RecvError::Lagged(n)` and skip `n`
//!   oldest items.
//! - **No persistence**: messages are dropped if no receiver is subscribed
//!   at publish time.

use tokio::sync::broadcast;

use super::message::OutboundMessage;

/// Broadcast channel for outbound messages.
///
/// Cheap to clone (internally holds an `Arc`-backed sender); multiple
/// publishers can publish concurrently, each receiver gets its own clone of
/// every message.
#[derive(Clone, Debug)]
pub struct OutboundBus {
    tx: broadcast::Sender<OutboundMessage>,
}

impl OutboundBus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<OutboundMessage>(capacity);
        Self { tx }
    }

    /// Publishes a message to all active receivers.
    ///
    /// With no receivers the message is dropped; this still returns
    /// immediately.
    pub fn publish(&self, msg: OutboundMessage) {
        let _ = self.tx.send(msg);
    }

    /// Creates a new independent receiver observing subsequent messages.
    pub fn subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
        self.tx.subscribe()
    }

    /// Number of currently subscribed receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
