//! # LogWriter — simple outbound message printer
//!
//! A minimal writer that prints every [`OutboundMessage`] crossing the bus
//! to stdout. Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [emit] event="update" target=broadcast data={"id":42,"v":1}
//! [emit] event="notice" target="session-1" data="hello"
//! ```

use tokio::task::JoinHandle;

use super::bus::OutboundBus;

/// Outbound message printer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Subscribes to the bus and prints messages until the bus closes.
    pub fn attach(self, bus: &OutboundBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(msg) => match &msg.target {
                        Some(target) => {
                            println!("[emit] event={:?} target={:?} data={}", msg.event, target, msg.data);
                        }
                        None => {
                            println!("[emit] event={:?} target=broadcast data={}", msg.event, msg.data);
                        }
                    },
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        eprintln!("[emit] log writer lagged, skipped {n} messages");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
