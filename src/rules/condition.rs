//! # Guard predicates for rules.
//!
//! A [`Condition`] is a synchronous predicate evaluated against the firing
//! context and arguments before a rule's handler runs; every condition
//! attached to a rule must hold or the handler is skipped for that firing
//! (skips are debug-logged, never errors).
//!
//! Like handlers, conditions carry a declared [`ArgShape`]; at attachment
//! time it is checked against the handler's shape with the same universal
//! compatibility rule.

use std::borrow::Cow;
use std::sync::Arc;

use crate::engine::Context;
use crate::rules::{ArgShape, Args};

/// Shared handle to a condition.
pub type ConditionRef = Arc<dyn Condition>;

/// Synchronous guard predicate.
pub trait Condition: Send + Sync + 'static {
    /// Short name used in skip diagnostics.
    fn name(&self) -> &str {
        "condition"
    }

    /// Declared argument shape, checked against the handler's at attachment.
    fn shape(&self) -> ArgShape;

    /// Evaluates the predicate for one firing.
    fn check(&self, ctx: &Context, args: &Args) -> bool;
}

/// Function-backed condition implementation.
///
/// ## Example
/// ```rust
/// use serde_json::json;
/// use rulefire::{ArgShape, ConditionFn, ConditionRef, Param};
///
/// let only_xs: ConditionRef = ConditionFn::arc(
///     "only_xs",
///     ArgShape::data([Param::required("data")]),
///     |_ctx, args| args.first() == Some(&json!("x")),
/// );
/// assert_eq!(only_xs.name(), "only_xs");
/// ```
pub struct ConditionFn<F> {
    name: Cow<'static, str>,
    shape: ArgShape,
    f: F,
}

impl<F> ConditionFn<F>
where
    F: Fn(&Context, &Args) -> bool + Send + Sync + 'static,
{
    /// Creates a new function-backed condition.
    pub fn new(name: impl Into<Cow<'static, str>>, shape: ArgShape, f: F) -> Self {
        Self {
            name: name.into(),
            shape,
            f,
        }
    }

    /// Creates the condition and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, shape: ArgShape, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, shape, f))
    }
}

impl<F> Condition for ConditionFn<F>
where
    F: Fn(&Context, &Args) -> bool + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn shape(&self) -> ArgShape {
        self.shape.clone()
    }

    fn check(&self, ctx: &Context, args: &Args) -> bool {
        (self.f)(ctx, args)
    }
}
