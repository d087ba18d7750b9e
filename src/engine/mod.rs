//! Engine core: contexts, the pending-event queue, and the dispatch loop.
//!
//! Internal modules:
//! - [`config`]: centralized engine settings;
//! - [`context`]: scoped state plus validated firing;
//! - [`pending`]: the immutable scheduling record;
//! - [`queue`]: mutex-guarded min-heap with a dispatcher wake-up;
//! - [`manager`]: process-wide scheduler state and the dispatch loop.

mod config;
mod context;
mod manager;
mod pending;
mod queue;

pub use config::EngineConfig;
pub use context::{Context, ContextRef};
pub use manager::Manager;
pub use pending::PendingEvent;
pub use queue::EventQueue;
