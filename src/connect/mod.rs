//! Inbound collaborators: datastream ingestion, HTTP bridge, replay.
//!
//! Everything here is glue at the engine's boundary:
//! - [`connect_datastream`] / [`read_datastream`] — line-delimited JSON over
//!   a stream socket, forwarded through a [`FireSink`];
//! - [`EventBridge`] — framework-agnostic HTTP POST → `fire_global` adapter;
//! - [`replay_file`] / [`replay_records`] — timestamped-dataset playback as
//!   delayed events.

mod bridge;
mod replay;
mod stream;

pub use bridge::{BridgeStatus, EventBridge};
pub use replay::{replay_file, replay_records, ReplayError, ReplayOptions};
pub use stream::{connect_datastream, decode_frame, manager_sink, read_datastream, ConnectError, FireSink};
