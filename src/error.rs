//! Error types used by the rulefire engine.
//!
//! This module defines four error enums:
//!
//! - [`RegisterError`] — configuration mistakes caught at registration time.
//! - [`FireError`] — argument validation failures caught at `fire` call time.
//! - [`HandlerError`] — errors raised by handler executions during dispatch.
//! - [`EngineError`] — errors that stop the dispatch loop itself.
//!
//! Registration and fire errors are always raised synchronously to the caller,
//! never deferred into the dispatch loop. All types provide `as_label()` for
//! logging/metrics.

use thiserror::Error;

use crate::rules::ArgShape;

/// Where two argument shapes collided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictScope {
    /// Two handlers registered under the same event key disagree.
    Key(String),
    /// A condition's declared shape disagrees with its handler's shape.
    Condition,
}

impl std::fmt::Display for ConflictScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictScope::Key(key) => write!(f, "key {key:?}"),
            ConflictScope::Condition => write!(f, "condition"),
        }
    }
}

/// # Errors raised while registering handlers or conditions.
///
/// These indicate programming mistakes discoverable before the first fire,
/// and are fatal at registration time.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegisterError {
    /// The handler's declared shape is malformed, or its name clashes with a
    /// different handler instance already known to the ruleset.
    #[error("invalid handler {handler:?}: {reason}")]
    InvalidHandler {
        /// Stable handler name.
        handler: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Two shapes that must agree do not.
    ///
    /// Either two data-carrying handlers under the same key declare different
    /// parameter names, or a condition's shape is incompatible with its
    /// handler's shape.
    #[error("signature conflict on {scope}: {existing}{existing_shape} vs {incoming}{incoming_shape}")]
    SignatureConflict {
        /// Key or condition scope of the collision.
        scope: ConflictScope,
        /// Name of the already-registered party.
        existing: String,
        /// Shape of the already-registered party.
        existing_shape: ArgShape,
        /// Name of the incoming party.
        incoming: String,
        /// Shape of the incoming party.
        incoming_shape: ArgShape,
    },

    /// The same handler was registered twice under one key.
    #[error("handler {handler:?} already registered for key {key:?}")]
    DuplicateRegistration {
        /// The event key.
        key: String,
        /// Stable handler name.
        handler: String,
    },
}

impl RegisterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegisterError::InvalidHandler { .. } => "invalid_handler",
            RegisterError::SignatureConflict { .. } => "signature_conflict",
            RegisterError::DuplicateRegistration { .. } => "duplicate_registration",
        }
    }
}

/// # Errors raised by `fire` argument validation.
///
/// Raised synchronously to the caller of `fire`; a queued event never fails
/// validation again.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FireError {
    /// A keyword argument is not among the declared parameter names.
    #[error("unexpected keyword {keyword:?} for key {key:?} (allowed: {allowed:?})")]
    UnexpectedKeyword {
        /// The event key being fired.
        key: String,
        /// The offending keyword.
        keyword: String,
        /// Parameter names recorded for the key.
        allowed: Vec<String>,
    },

    /// Positional arguments were supplied to a key whose first registered
    /// rule takes no data at all.
    #[error("key {key:?} takes no arguments but {got} positional were supplied")]
    UnexpectedArguments {
        /// The event key being fired.
        key: String,
        /// How many positional arguments were supplied.
        got: usize,
    },

    /// Too many or too few positional arguments for the declared shape.
    #[error("argument count mismatch for key {key:?}: expected {min}..={max} positional, got {got}")]
    ArgumentCountMismatch {
        /// The event key being fired.
        key: String,
        /// Required data-parameter count.
        min: usize,
        /// Declared data-parameter count.
        max: usize,
        /// How many positional arguments were supplied.
        got: usize,
    },
}

impl FireError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FireError::UnexpectedKeyword { .. } => "unexpected_keyword",
            FireError::UnexpectedArguments { .. } => "unexpected_arguments",
            FireError::ArgumentCountMismatch { .. } => "argument_count_mismatch",
        }
    }
}

/// # Errors produced by handler executions.
///
/// [`HandlerError::Fail`] is isolated by the dispatch loop (logged, loop
/// continues). [`HandlerError::Fatal`] stops the loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Handler failed; the dispatch loop logs this and moves on.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable handler error; stops the dispatch loop.
    #[error("fatal handler error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl HandlerError {
    /// Builds a recoverable failure from any displayable error.
    pub fn fail(error: impl std::fmt::Display) -> Self {
        HandlerError::Fail {
            error: error.to_string(),
        }
    }

    /// Builds a fatal failure from any displayable error.
    pub fn fatal(error: impl std::fmt::Display) -> Self {
        HandlerError::Fatal {
            error: error.to_string(),
        }
    }

    /// Whether this error stops the dispatch loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HandlerError::Fatal { .. })
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Fatal { .. } => "handler_fatal",
        }
    }
}

/// # Errors that terminate the dispatch loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    /// A handler raised [`HandlerError::Fatal`]; the loop stopped.
    #[error("handler {handler:?} for key {key:?} raised fatal: {error}")]
    HandlerFatal {
        /// The event key being dispatched.
        key: String,
        /// Stable handler name.
        handler: String,
        /// The underlying error message.
        error: String,
    },
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::HandlerFatal { .. } => "engine_handler_fatal",
        }
    }
}
