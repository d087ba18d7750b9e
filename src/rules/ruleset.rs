//! # Ruleset: rule registration, indexing, and validation.
//!
//! A [`Ruleset`] maps each handler name to its [`Rule`] and each event key to
//! the ordered list of rules registered under it. All configuration errors
//! are raised here, synchronously, at registration time:
//!
//! - malformed shape or a name clash → [`RegisterError::InvalidHandler`];
//! - incompatible shapes under one key → [`RegisterError::SignatureConflict`]
//!   (universal shapes are exempt, see [`ArgShape::is_universal`]);
//! - same handler twice under one key → [`RegisterError::DuplicateRegistration`].
//!
//! ## Example
//! ```rust
//! use rulefire::{ArgShape, Args, ContextRef, HandlerError, HandlerFn, HandlerRef, Param, Ruleset};
//!
//! let rules = Ruleset::new();
//! let h: HandlerRef = HandlerFn::arc(
//!     "on_login",
//!     ArgShape::data([Param::required("user")]),
//!     |_ctx: ContextRef, _args: Args| async { Ok::<_, HandlerError>(()) },
//! );
//! rules.event("user_login").bind(&h).unwrap();
//! assert!(rules.has_rules("user_login"));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{ConflictScope, RegisterError};
use crate::rules::{ArgShape, ConditionRef, HandlerRef, Rule};

#[derive(Default)]
struct Inner {
    /// Handler name → Rule (unique rule per handler).
    functions: HashMap<String, Rule>,
    /// Event key → handler names, in insertion order.
    index: HashMap<String, Vec<String>>,
}

/// Registry of rules, indexed by event key.
pub struct Ruleset {
    inner: RwLock<Inner>,
}

impl Ruleset {
    /// Creates an empty ruleset behind a shared handle.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(Inner::default()),
        })
    }

    /// Starts a registration for `key`.
    ///
    /// The returned binder registers handlers under the key; the
    /// decorator-style equivalent of `event(key)`.
    pub fn event<'a>(&'a self, key: &'a str) -> EventBinder<'a> {
        EventBinder { ruleset: self, key }
    }

    /// Registers `handler` under `key`.
    pub fn register(&self, key: &str, handler: &HandlerRef) -> Result<(), RegisterError> {
        let shape = handler.shape();
        if let Err(reason) = shape.check_well_formed() {
            return Err(RegisterError::InvalidHandler {
                handler: handler.name().to_string(),
                reason,
            });
        }

        let mut inner = self.inner.write().expect("ruleset lock poisoned");
        Self::check_name_identity(&inner, handler)?;

        if let Some(entries) = inner.index.get(key) {
            // Per-key consistency is anchored on the first data-carrying
            // registrant; universal shapes neither conflict nor relax it.
            let anchor = entries
                .iter()
                .filter_map(|n| inner.functions.get(n))
                .find(|r| !r.shape().is_universal());
            if let Some(first) = anchor {
                if !first.shape().compatible_with(&shape) {
                    return Err(RegisterError::SignatureConflict {
                        scope: ConflictScope::Key(key.to_string()),
                        existing: first.name().to_string(),
                        existing_shape: first.shape().clone(),
                        incoming: handler.name().to_string(),
                        incoming_shape: shape,
                    });
                }
            }
            if entries.iter().any(|n| n == handler.name()) {
                return Err(RegisterError::DuplicateRegistration {
                    key: key.to_string(),
                    handler: handler.name().to_string(),
                });
            }
        }

        let name = handler.name().to_string();
        inner
            .index
            .entry(key.to_string())
            .or_default()
            .push(name.clone());
        inner
            .functions
            .entry(name)
            .or_insert_with(|| Rule::new(Arc::clone(handler)))
            .add_key(key);

        tracing::debug!(key, handler = handler.name(), "rule registered");
        Ok(())
    }

    /// Attaches `condition` to the rule for `handler`, creating a zero-key
    /// rule if the handler is not registered yet.
    ///
    /// The condition's declared shape must be compatible with the handler's
    /// (universal shapes are exempt on either side).
    pub fn condition(
        &self,
        handler: &HandlerRef,
        condition: ConditionRef,
    ) -> Result<(), RegisterError> {
        let cond_shape = condition.shape();
        if let Err(reason) = cond_shape.check_well_formed() {
            return Err(RegisterError::InvalidHandler {
                handler: condition.name().to_string(),
                reason,
            });
        }
        if !handler.shape().compatible_with(&cond_shape) {
            return Err(RegisterError::SignatureConflict {
                scope: ConflictScope::Condition,
                existing: handler.name().to_string(),
                existing_shape: handler.shape(),
                incoming: condition.name().to_string(),
                incoming_shape: cond_shape,
            });
        }

        let mut inner = self.inner.write().expect("ruleset lock poisoned");
        Self::check_name_identity(&inner, handler)?;
        inner
            .functions
            .entry(handler.name().to_string())
            .or_insert_with(|| Rule::new(Arc::clone(handler)))
            .add_condition(condition);
        Ok(())
    }

    /// Rules registered under `key`, in insertion order.
    pub fn rules_for(&self, key: &str) -> Vec<Rule> {
        let inner = self.inner.read().expect("ruleset lock poisoned");
        inner
            .index
            .get(key)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| inner.functions.get(n).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The signature recorded for `key`, used for fire-time argument
    /// validation: the first data-carrying rule's shape, falling back to the
    /// first (universal) rule's shape when no data rule exists under the key.
    pub fn signature_for(&self, key: &str) -> Option<ArgShape> {
        let inner = self.inner.read().expect("ruleset lock poisoned");
        let names = inner.index.get(key)?;
        let mut fallback = None;
        for name in names {
            let Some(rule) = inner.functions.get(name) else {
                continue;
            };
            if !rule.shape().is_universal() {
                return Some(rule.shape().clone());
            }
            if fallback.is_none() {
                fallback = Some(rule.shape().clone());
            }
        }
        fallback
    }

    /// Whether any rule is registered under `key`.
    pub fn has_rules(&self, key: &str) -> bool {
        let inner = self.inner.read().expect("ruleset lock poisoned");
        inner.index.get(key).is_some_and(|v| !v.is_empty())
    }

    /// The rule registered under a handler name, if any.
    pub fn rule(&self, handler_name: &str) -> Option<Rule> {
        let inner = self.inner.read().expect("ruleset lock poisoned");
        inner.functions.get(handler_name).cloned()
    }

    /// Handler names are identities: re-using one from a different instance
    /// is a configuration mistake.
    fn check_name_identity(inner: &Inner, handler: &HandlerRef) -> Result<(), RegisterError> {
        if let Some(existing) = inner.functions.get(handler.name()) {
            if !Arc::ptr_eq(existing.handler(), handler) {
                return Err(RegisterError::InvalidHandler {
                    handler: handler.name().to_string(),
                    reason: "a different handler instance already uses this name".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Decorator-style registration for one event key.
pub struct EventBinder<'a> {
    ruleset: &'a Ruleset,
    key: &'a str,
}

impl EventBinder<'_> {
    /// Registers `handler` under the binder's key.
    pub fn bind(&self, handler: &HandlerRef) -> Result<(), RegisterError> {
        self.ruleset.register(self.key, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegisterError;
    use crate::rules::{ConditionFn, HandlerFn, Param};

    fn handler(name: &'static str, shape: ArgShape) -> HandlerRef {
        HandlerFn::arc(name, shape, |_ctx, _args| async { Ok(()) })
    }

    fn data_shape(names: &[&'static str]) -> ArgShape {
        ArgShape::data(names.iter().map(|n| Param::required(*n)))
    }

    #[test]
    fn registers_and_indexes_by_key() {
        let rules = Ruleset::new();
        let h = handler("h", data_shape(&["data"]));

        rules.event("test").bind(&h).unwrap();
        rules.event("test2").bind(&h).unwrap();

        let rule = rules.rule("h").unwrap();
        assert_eq!(rule.keys(), &["test", "test2"]);
        assert_eq!(rules.rules_for("test").len(), 1);
        assert!(rules.has_rules("test2"));
        assert!(!rules.has_rules("nope"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let rules = Ruleset::new();
        let h = handler("h", ArgShape::ContextOnly);

        rules.event("test").bind(&h).unwrap();
        let err = rules.event("test").bind(&h).unwrap_err();
        assert!(matches!(err, RegisterError::DuplicateRegistration { .. }));
    }

    #[test]
    fn conflicting_signatures_under_one_key() {
        let rules = Ruleset::new();
        let a = handler("a", data_shape(&["x"]));
        let b = handler("b", data_shape(&["x", "y"]));

        rules.event("test").bind(&a).unwrap();
        let err = rules.event("test").bind(&b).unwrap_err();
        match err {
            RegisterError::SignatureConflict {
                existing, incoming, ..
            } => {
                assert_eq!(existing, "a");
                assert_eq!(incoming, "b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn matching_signatures_share_a_key() {
        let rules = Ruleset::new();
        let a = handler("a", data_shape(&["data"]));
        let b = handler("b", data_shape(&["data"]));

        rules.event("test").bind(&a).unwrap();
        rules.event("test").bind(&b).unwrap();
        assert_eq!(rules.rules_for("test").len(), 2);
    }

    #[test]
    fn universal_shapes_join_any_key() {
        let rules = Ruleset::new();
        let wide = handler("wide", data_shape(&["a", "b"]));
        let tick = handler("tick", ArgShape::ContextOnly);
        let bare = handler("bare", ArgShape::NoArgs);

        rules.event("test").bind(&wide).unwrap();
        rules.event("test").bind(&tick).unwrap();
        rules.event("test").bind(&bare).unwrap();
        assert_eq!(rules.rules_for("test").len(), 3);

        // And the other way round: a universal first registrant accepts a
        // data-carrying late-comer.
        rules.event("other").bind(&tick).unwrap();
        rules.event("other").bind(&wide).unwrap();
    }

    #[test]
    fn universal_first_registrant_does_not_relax_the_key_signature() {
        let rules = Ruleset::new();
        let tick = handler("tick", ArgShape::ContextOnly);
        let a = handler("a", data_shape(&["x"]));
        let b = handler("b", data_shape(&["y"]));

        // "a" anchors the key's signature even though "tick" came first.
        rules.event("k").bind(&tick).unwrap();
        rules.event("k").bind(&a).unwrap();
        let err = rules.event("k").bind(&b).unwrap_err();
        match err {
            RegisterError::SignatureConflict {
                existing, incoming, ..
            } => {
                assert_eq!(existing, "a");
                assert_eq!(incoming, "b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn signature_for_prefers_the_data_shape() {
        let rules = Ruleset::new();
        let tick = handler("tick", ArgShape::ContextOnly);
        let h = handler("h", data_shape(&["data"]));

        rules.event("k").bind(&tick).unwrap();
        assert_eq!(rules.signature_for("k"), Some(ArgShape::ContextOnly));

        rules.event("k").bind(&h).unwrap();
        assert_eq!(rules.signature_for("k"), Some(data_shape(&["data"])));
        assert_eq!(rules.signature_for("nope"), None);
    }

    #[test]
    fn malformed_shape_is_invalid_handler() {
        let rules = Ruleset::new();
        let bad = handler(
            "bad",
            ArgShape::Data(vec![Param::optional("a"), Param::required("b")]),
        );
        let err = rules.event("test").bind(&bad).unwrap_err();
        assert!(matches!(err, RegisterError::InvalidHandler { .. }));
    }

    #[test]
    fn name_clash_is_invalid_handler() {
        let rules = Ruleset::new();
        let first = handler("same", ArgShape::ContextOnly);
        let imposter = handler("same", ArgShape::ContextOnly);

        rules.event("test").bind(&first).unwrap();
        let err = rules.event("other").bind(&imposter).unwrap_err();
        assert!(matches!(err, RegisterError::InvalidHandler { .. }));
    }

    #[test]
    fn condition_shape_must_be_compatible() {
        let rules = Ruleset::new();
        let h = handler("h", data_shape(&["data"]));
        rules.event("test").bind(&h).unwrap();

        // Universal condition on a data handler: allowed.
        let tick = ConditionFn::arc("tick", ArgShape::ContextOnly, |_ctx, _args| true);
        rules.condition(&h, tick).unwrap();

        // Same names: allowed.
        let same = ConditionFn::arc("same", data_shape(&["data"]), |_ctx, _args| true);
        rules.condition(&h, same).unwrap();

        // Different data names: conflict.
        let off = ConditionFn::arc("off", data_shape(&["other"]), |_ctx, _args| true);
        let err = rules.condition(&h, off).unwrap_err();
        assert!(matches!(err, RegisterError::SignatureConflict { .. }));

        assert_eq!(rules.rule("h").unwrap().conditions().len(), 2);
    }

    #[test]
    fn condition_before_event_creates_keyless_rule() {
        let rules = Ruleset::new();
        let h = handler("h", data_shape(&["data"]));
        let c = ConditionFn::arc("c", ArgShape::ContextOnly, |_ctx, _args| true);

        rules.condition(&h, c).unwrap();
        let rule = rules.rule("h").unwrap();
        assert!(rule.keys().is_empty());
        assert_eq!(rule.conditions().len(), 1);

        rules.event("test").bind(&h).unwrap();
        assert_eq!(rules.rule("h").unwrap().keys(), &["test"]);
    }
}
