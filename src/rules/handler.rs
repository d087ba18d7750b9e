//! # Handler abstraction and function-backed handler implementation.
//!
//! This module defines the [`Handler`] trait (async, named, with a declared
//! [`ArgShape`]) and a convenient function-backed implementation [`HandlerFn`].
//! The common handle type is [`HandlerRef`], an `Arc<dyn Handler>` suitable
//! for sharing across rulesets and contexts.
//!
//! A handler's **name is its identity** within a [`Ruleset`]: one rule per
//! distinct name, and registering a different handler instance under an
//! existing name is rejected.
//!
//! [`Ruleset`]: crate::rules::Ruleset

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::ContextRef;
use crate::error::HandlerError;
use crate::rules::{ArgShape, Args};

/// Shared handle to a handler.
pub type HandlerRef = Arc<dyn Handler>;

/// # Asynchronous event handler.
///
/// A `Handler` has a stable [`name`](Handler::name), a declared
/// [`shape`](Handler::shape), and an async [`call`](Handler::call) invoked by
/// the dispatch loop with the owning context and the fired arguments.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use rulefire::{Args, ArgShape, ContextRef, Handler, HandlerError, Param};
///
/// struct Greeter;
///
/// #[async_trait]
/// impl Handler for Greeter {
///     fn name(&self) -> &str { "greeter" }
///
///     fn shape(&self) -> ArgShape {
///         ArgShape::data([Param::required("who")])
///     }
///
///     async fn call(&self, _ctx: ContextRef, args: Args) -> Result<(), HandlerError> {
///         println!("hello {:?}", args.first());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Returns a stable, human-readable handler name (the rule identity).
    fn name(&self) -> &str;

    /// Returns the declared argument shape.
    fn shape(&self) -> ArgShape;

    /// Handles one firing.
    ///
    /// A returned [`HandlerError::Fail`] is logged and isolated by the
    /// dispatch loop; [`HandlerError::Fatal`] stops the loop.
    async fn call(&self, ctx: ContextRef, args: Args) -> Result<(), HandlerError>;
}

/// Function-backed handler implementation.
///
/// Wraps a closure that *creates* a new future per firing, so there is no
/// shared mutable state between invocations; share state explicitly through
/// the context or an `Arc` captured by the closure.
///
/// ## Example
/// ```rust
/// use rulefire::{Args, ArgShape, ContextRef, HandlerError, HandlerFn, HandlerRef, Param};
///
/// let h: HandlerRef = HandlerFn::arc(
///     "on_point",
///     ArgShape::data([Param::required("x")]),
///     |_ctx: ContextRef, args: Args| async move {
///         let _ = args.first();
///         Ok::<_, HandlerError>(())
///     },
/// );
/// assert_eq!(h.name(), "on_point");
/// ```
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    shape: ArgShape,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, shape: ArgShape, f: F) -> Self {
        Self {
            name: name.into(),
            shape,
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc<Fut>(name: impl Into<Cow<'static, str>>, shape: ArgShape, f: F) -> Arc<Self>
    where
        F: Fn(ContextRef, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Arc::new(Self::new(name, shape, f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(ContextRef, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn shape(&self) -> ArgShape {
        self.shape.clone()
    }

    async fn call(&self, ctx: ContextRef, args: Args) -> Result<(), HandlerError> {
        (self.f)(ctx, args).await
    }
}
