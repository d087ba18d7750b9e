//! # rulefire
//!
//! **rulefire** is an Event-Condition-Action engine for Rust.
//!
//! Application code registers handlers ("rules") keyed by event name,
//! optionally guarded by conditions, and triggers execution by firing named
//! events — immediately or after a delay. The engine owns rule indexing,
//! per-key signature consistency, isolated execution contexts, and a
//! time-ordered delivery queue.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  HandlerFn   │   │  HandlerFn   │   │  HandlerFn   │
//!     │ (user rule)  │   │ (user rule)  │   │ (user rule)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Ruleset (registration & validation)                              │
//! │  - functions: handler name → Rule                                 │
//! │  - index: event key → ordered Rules                               │
//! │  - per-key signature consistency (universal shapes exempt)        │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                │ shared by reference
//!        fire(key, args, delay)  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Context (named scoped storage)          Context ...              │
//! │  - validate args against the key's recorded shape                 │
//! │  - enqueue PendingEvent                                           │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Manager (process-wide scheduler)                                 │
//! │  - EventQueue: min-heap by (due time, seq) + dispatcher wake-up   │
//! │  - dispatch loop: pop due → context.fire_immediate(key, args)     │
//! │  - OutboundBus: emit(event, data, id, target) → transports        │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Dispatch lifecycle
//! ```text
//! fire(key, args, delay)
//!   ├─► key unregistered            ─► warn, no-op
//!   ├─► args mismatch the recorded  ─► FireError (synchronous, this call only)
//!   │   shape for the key
//!   └─► PendingEvent enqueued, due = now + delay
//!
//! dispatch loop (one task per process):
//!   warm-up ─► fire "init" ─► loop {
//!     pop due event (due-time order, insertion order on ties)
//!       ├─ per rule: conditions all hold?  no ─► debug log, skip
//!       ├─ handler Ok / Fail / panic       ─► continue (Fail/panic logged)
//!       └─ handler Fatal                   ─► loop stops (EngineError)
//!   }
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                  |
//! |-------------------|---------------------------------------------------------------|-------------------------------------|
//! | **Rules**         | Register handlers per key with typed argument shapes.         | [`Ruleset`], [`Handler`], [`ArgShape`] |
//! | **Conditions**    | Guard rules with predicates checked per firing.               | [`Condition`], [`ConditionFn`]      |
//! | **Contexts**      | Isolated key-value scopes that fire and handle events.        | [`Context`], [`Manager::create_context`] |
//! | **Scheduling**    | Delayed firing with due-time ordering, single dispatch task.  | [`Manager`], [`PendingEvent`]       |
//! | **Outbound**      | Hand JSON payloads to an external transport.                  | [`Manager::emit`], [`OutboundBus`]  |
//! | **Ingestion**     | Line-delimited JSON sockets, HTTP bridge, dataset replay.     | [`connect_datastream`], [`EventBridge`], [`replay_file`] |
//! | **Errors**        | Typed errors for registration, firing, and dispatch.          | [`RegisterError`], [`FireError`]    |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use rulefire::{ArgShape, Args, HandlerError, HandlerFn, HandlerRef, Manager, Param};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mgr = Manager::with_defaults();
//!
//!     // A rule answering to "user_login" with one required data parameter.
//!     let on_login: HandlerRef = HandlerFn::arc(
//!         "on_login",
//!         ArgShape::data([Param::required("event_data")]),
//!         |ctx, args| async move {
//!             ctx.set("last_login", args.first().cloned().unwrap());
//!             Ok::<_, HandlerError>(())
//!         },
//!     );
//!     mgr.event("user_login", &on_login)?;
//!
//!     // Fire and drain deterministically (a long-running app would spawn
//!     // `mgr.run(token)` instead).
//!     mgr.fire_global("user_login", Args::one(json!({"user_id": 123})), None)?;
//!     mgr.run_until_idle().await?;
//!
//!     assert_eq!(
//!         mgr.global_context().get("last_login"),
//!         Some(json!({"user_id": 123})),
//!     );
//!     Ok(())
//! }
//! ```

mod connect;
mod engine;
mod error;
mod outbound;
mod rules;

// ---- Public re-exports ----

pub use connect::{
    connect_datastream, decode_frame, manager_sink, read_datastream, replay_file, replay_records,
    BridgeStatus, ConnectError, EventBridge, FireSink, ReplayError, ReplayOptions,
};
pub use engine::{Context, ContextRef, EngineConfig, Manager, PendingEvent};
pub use error::{
    ConflictScope, EngineError, FireError, HandlerError, RegisterError,
};
pub use outbound::{OutboundBus, OutboundMessage};
pub use rules::{
    ArgShape, Args, Condition, ConditionFn, ConditionRef, EventBinder, Handler, HandlerFn,
    HandlerRef, Param, Rule, Ruleset,
};

// Optional: expose a simple built-in outbound printer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use outbound::LogWriter;
