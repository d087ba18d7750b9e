//! Rule model: shapes, arguments, handlers, conditions, and the ruleset.
//!
//! This module groups the registration/validation side of the engine:
//! - [`ArgShape`], [`Param`] — typed argument descriptors
//! - [`Args`] — the argument tuple carried by a firing
//! - [`Handler`], [`HandlerFn`], [`HandlerRef`] — async event handlers
//! - [`Condition`], [`ConditionFn`], [`ConditionRef`] — guard predicates
//! - [`Rule`], [`Ruleset`], [`EventBinder`] — the indexed registry

mod args;
mod condition;
mod handler;
mod rule;
mod ruleset;
mod shape;

pub use args::Args;
pub use condition::{Condition, ConditionFn, ConditionRef};
pub use handler::{Handler, HandlerFn, HandlerRef};
pub use rule::Rule;
pub use ruleset::{EventBinder, Ruleset};
pub use shape::{ArgShape, Param};
