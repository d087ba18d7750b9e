//! # Registered rule.
//!
//! A [`Rule`] bundles one handler with the event keys it answers to and the
//! conditions guarding it. Rules are owned by a [`Ruleset`] (one per distinct
//! handler name) and referenced from every per-key index entry.
//!
//! [`Ruleset`]: crate::rules::Ruleset

use crate::engine::Context;
use crate::rules::{ArgShape, Args, ConditionRef, HandlerRef};

/// A registered handler plus its keys, declared shape, and conditions.
#[derive(Clone)]
pub struct Rule {
    handler: HandlerRef,
    shape: ArgShape,
    keys: Vec<String>,
    conditions: Vec<ConditionRef>,
}

impl Rule {
    pub(crate) fn new(handler: HandlerRef) -> Self {
        let shape = handler.shape();
        Self {
            handler,
            shape,
            keys: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// The handler this rule wraps.
    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// Stable handler name (the rule identity within a ruleset).
    pub fn name(&self) -> &str {
        self.handler.name()
    }

    /// Declared argument shape, recorded at registration.
    pub fn shape(&self) -> &ArgShape {
        &self.shape
    }

    /// Event keys this rule answers to, in registration order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Attached conditions, in attachment order.
    pub fn conditions(&self) -> &[ConditionRef] {
        &self.conditions
    }

    pub(crate) fn add_key(&mut self, key: &str) {
        self.keys.push(key.to_string());
    }

    pub(crate) fn add_condition(&mut self, condition: ConditionRef) {
        self.conditions.push(condition);
    }

    /// Name of the first condition that rejects, for skip diagnostics.
    /// Every condition must hold for the handler to run.
    pub(crate) fn first_failing_condition(&self, ctx: &Context, args: &Args) -> Option<&str> {
        self.conditions
            .iter()
            .find(|c| !c.check(ctx, args))
            .map(|c| c.name())
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("handler", &self.name())
            .field("shape", &self.shape)
            .field("keys", &self.keys)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}
