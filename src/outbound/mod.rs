//! Outbound publish boundary: message type and broadcast bus.
//!
//! This module groups the **data model** and the **bus** used to hand
//! emitted payloads to an external transport for delivery to one or all
//! connected remote listeners.
//!
//! ## Contents
//! - [`OutboundMessage`] — emitted event name, JSON payload, optional target
//! - [`OutboundBus`] — thin wrapper over `tokio::sync::broadcast`
//! - `LogWriter` — println writer for demos (`logging` feature)

mod bus;
mod message;

pub use bus::OutboundBus;
pub use message::OutboundMessage;

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogWriter;
