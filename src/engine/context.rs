//! # Context: scoped state plus validated firing.
//!
//! A [`Context`] is a named, isolated key-value store bound to a [`Ruleset`]
//! and to the engine's shared queue. `fire` validates arguments against the
//! key's recorded signature and enqueues; `fire_immediate` (dispatch loop
//! only) evaluates conditions and invokes matching handlers.
//!
//! Firing an unregistered key is not an error: it logs a warning and no-ops.
//! A rule whose conditions reject a firing is skipped with a debug log.
//!
//! Storage follows "last write wins". It is intended to be touched only by
//! handlers running on the single dispatch task; concurrent direct access
//! from outside a handler is caller responsibility.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;

use crate::engine::EventQueue;
use crate::error::{EngineError, FireError};
use crate::rules::{Args, Ruleset};

/// Counter backing engine-assigned context names.
static CONTEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Shared handle to a context.
pub type ContextRef = Arc<Context>;

/// An isolated data scope plus bound ruleset, used to fire and handle events.
pub struct Context {
    name: String,
    ruleset: Arc<Ruleset>,
    storage: Mutex<HashMap<String, Value>>,
    queue: Arc<EventQueue>,
}

impl Context {
    pub(crate) fn new(
        name: Option<String>,
        ruleset: Arc<Ruleset>,
        queue: Arc<EventQueue>,
    ) -> ContextRef {
        let name = name.unwrap_or_else(|| {
            format!("context-{}", CONTEXT_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
        });
        Arc::new(Self {
            name,
            ruleset,
            storage: Mutex::new(HashMap::new()),
            queue,
        })
    }

    /// Display identity of this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ruleset this context dispatches through.
    pub fn ruleset(&self) -> &Arc<Ruleset> {
        &self.ruleset
    }

    // ---------------------------
    // Scoped storage
    // ---------------------------

    /// Stores a value under `key` (last write wins).
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.storage
            .lock()
            .expect("context storage lock poisoned")
            .insert(key.into(), value.into());
    }

    /// Returns a clone of the value under `key`, if present.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.storage
            .lock()
            .expect("context storage lock poisoned")
            .get(key)
            .cloned()
    }

    /// Returns the value under `key`, or `default` when absent.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Removes and returns the value under `key`.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.storage
            .lock()
            .expect("context storage lock poisoned")
            .remove(key)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.storage
            .lock()
            .expect("context storage lock poisoned")
            .contains_key(key)
    }

    // ---------------------------
    // Firing
    // ---------------------------

    /// Validates `args` against the key's recorded signature and schedules a
    /// pending event (due after `delay`, immediately when `None`).
    ///
    /// Firing a key with no registered rules logs a warning and returns `Ok`.
    pub fn fire(
        self: &Arc<Self>,
        key: &str,
        args: Args,
        delay: Option<Duration>,
    ) -> Result<(), FireError> {
        let Some(shape) = self.ruleset.signature_for(key) else {
            tracing::warn!(key, context = %self.name, "no rules for event");
            return Ok(());
        };
        shape.check_args(key, &args)?;
        self.queue
            .push(key.to_string(), args, delay, Arc::clone(self));
        Ok(())
    }

    /// Dispatches `key` right now, bypassing the queue.
    ///
    /// Invoked by the dispatch loop; arguments are not validated again. For
    /// each rule under the key, all conditions must hold or the rule is
    /// skipped (debug log). Handler panics and [`Fail`] results are isolated
    /// and error-logged; a [`Fatal`] result stops dispatch.
    ///
    /// [`Fail`]: crate::error::HandlerError::Fail
    /// [`Fatal`]: crate::error::HandlerError::Fatal
    pub async fn fire_immediate(
        self: &Arc<Self>,
        key: &str,
        args: &Args,
    ) -> Result<(), EngineError> {
        let rules = self.ruleset.rules_for(key);
        if rules.is_empty() {
            tracing::warn!(key, context = %self.name, "no rules for event");
            return Ok(());
        }

        for rule in rules {
            if let Some(failed) = rule.first_failing_condition(self, args) {
                tracing::debug!(
                    key,
                    handler = rule.name(),
                    condition = failed,
                    "conditions not met, rule skipped"
                );
                continue;
            }

            let fut = rule.handler().call(Arc::clone(self), args.clone());
            match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(err)) if err.is_fatal() => {
                    return Err(EngineError::HandlerFatal {
                        key: key.to_string(),
                        handler: rule.name().to_string(),
                        error: err.to_string(),
                    });
                }
                Ok(Err(err)) => {
                    tracing::error!(
                        key,
                        handler = rule.name(),
                        label = err.as_label(),
                        %err,
                        "handler failed"
                    );
                }
                Err(panic) => {
                    tracing::error!(
                        key,
                        handler = rule.name(),
                        panic = panic_message(panic.as_ref()),
                        "handler panicked"
                    );
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Context({})", self.name)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
