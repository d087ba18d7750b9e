//! # Declared argument shapes.
//!
//! [`ArgShape`] is the typed descriptor a handler (or condition) declares at
//! construction time, replacing runtime signature reflection. The first
//! conceptual parameter is always the context; data parameters come after it.
//!
//! Shapes with at most one declared parameter — [`ArgShape::NoArgs`] and
//! [`ArgShape::ContextOnly`] — are **universal**: they coexist under any key
//! regardless of what other registrants declare. Two [`ArgShape::Data`]
//! shapes agree only when their parameter-name lists are identical.
//!
//! ## Example
//! ```rust
//! use rulefire::{ArgShape, Param};
//!
//! let tick = ArgShape::ContextOnly;
//! let point = ArgShape::data([Param::required("x"), Param::optional("y")]);
//!
//! assert!(tick.is_universal());
//! assert!(tick.compatible_with(&point));
//! assert_eq!(point.to_string(), "(ctx, x, y?)");
//! ```

use std::borrow::Cow;

use crate::error::FireError;
use crate::rules::Args;

/// One declared data parameter: a name plus whether a value is required.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    name: Cow<'static, str>,
    required: bool,
}

impl Param {
    /// A parameter that must receive a value on every fire.
    pub fn required(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    /// A parameter with a default (may be omitted on fire).
    pub fn optional(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }

    /// The parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the parameter must receive a value.
    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// Declared argument shape of a handler or condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgShape {
    /// Declares `()` — takes nothing, not even the context.
    NoArgs,
    /// Declares `(ctx)` — context only.
    ContextOnly,
    /// Declares `(ctx, a, b, ...)` — context plus named data parameters.
    Data(Vec<Param>),
}

impl ArgShape {
    /// Builds a data shape from parameters.
    ///
    /// An empty list collapses to [`ArgShape::ContextOnly`].
    pub fn data(params: impl IntoIterator<Item = Param>) -> Self {
        let params: Vec<Param> = params.into_iter().collect();
        if params.is_empty() {
            ArgShape::ContextOnly
        } else {
            ArgShape::Data(params)
        }
    }

    /// Whether the first declared parameter is the context.
    pub fn takes_context(&self) -> bool {
        !matches!(self, ArgShape::NoArgs)
    }

    /// Universal shapes (at most one declared parameter) are compatible with
    /// any other shape under the same key.
    pub fn is_universal(&self) -> bool {
        matches!(self, ArgShape::NoArgs | ArgShape::ContextOnly)
    }

    /// Declared data-parameter names, in order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            ArgShape::Data(params) => params.iter().map(Param::name).collect(),
            _ => Vec::new(),
        }
    }

    /// Number of declared data parameters.
    pub fn max_args(&self) -> usize {
        match self {
            ArgShape::Data(params) => params.len(),
            _ => 0,
        }
    }

    /// Number of data parameters without a default.
    pub fn min_required(&self) -> usize {
        match self {
            ArgShape::Data(params) => params.iter().filter(|p| p.is_required()).count(),
            _ => 0,
        }
    }

    /// Checks whether this shape may share an event key with `other`.
    ///
    /// True when either side is universal, or both declare identical
    /// parameter-name lists.
    pub fn compatible_with(&self, other: &ArgShape) -> bool {
        if self.is_universal() || other.is_universal() {
            return true;
        }
        self.names() == other.names()
    }

    /// Validates the shape itself.
    ///
    /// Rejects empty or duplicate parameter names and required parameters
    /// declared after optional ones (defaults must trail).
    pub fn check_well_formed(&self) -> Result<(), String> {
        let ArgShape::Data(params) = self else {
            return Ok(());
        };
        let mut seen_optional = false;
        for (i, p) in params.iter().enumerate() {
            if p.name().is_empty() {
                return Err(format!("parameter #{i} has an empty name"));
            }
            if params[..i].iter().any(|q| q.name() == p.name()) {
                return Err(format!("duplicate parameter name {:?}", p.name()));
            }
            if p.is_required() && seen_optional {
                return Err(format!(
                    "required parameter {:?} declared after an optional one",
                    p.name()
                ));
            }
            seen_optional |= !p.is_required();
        }
        Ok(())
    }

    /// Validates caller-supplied arguments against this shape.
    ///
    /// Applied at `fire` time against the signature recorded for the key
    /// (see `Ruleset::signature_for`). Keyword names must be a subset of the
    /// declared parameter names;
    /// universal shapes accept no positional arguments at all; data shapes
    /// bound the positional count by `min_required()..=max_args()`.
    pub fn check_args(&self, key: &str, args: &Args) -> Result<(), FireError> {
        let names = self.names();
        for keyword in args.keyword_names() {
            if !names.iter().any(|n| *n == keyword) {
                return Err(FireError::UnexpectedKeyword {
                    key: key.to_string(),
                    keyword: keyword.to_string(),
                    allowed: names.iter().map(|n| n.to_string()).collect(),
                });
            }
        }
        let got = args.positional_len();
        if self.is_universal() {
            if got > 0 {
                return Err(FireError::UnexpectedArguments {
                    key: key.to_string(),
                    got,
                });
            }
            return Ok(());
        }
        let (min, max) = (self.min_required(), self.max_args());
        if got > max || got < min {
            return Err(FireError::ArgumentCountMismatch {
                key: key.to_string(),
                min,
                max,
                got,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for ArgShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgShape::NoArgs => write!(f, "()"),
            ArgShape::ContextOnly => write!(f, "(ctx)"),
            ArgShape::Data(params) => {
                write!(f, "(ctx")?;
                for p in params {
                    write!(f, ", {}", p.name())?;
                    if !p.is_required() {
                        write!(f, "?")?;
                    }
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(names: &[(&'static str, bool)]) -> ArgShape {
        ArgShape::data(names.iter().map(|(n, req)| {
            if *req {
                Param::required(*n)
            } else {
                Param::optional(*n)
            }
        }))
    }

    #[test]
    fn universal_shapes_match_anything() {
        let wide = data(&[("a", true), ("b", true)]);
        assert!(ArgShape::NoArgs.compatible_with(&wide));
        assert!(ArgShape::ContextOnly.compatible_with(&wide));
        assert!(wide.compatible_with(&ArgShape::ContextOnly));
    }

    #[test]
    fn data_shapes_match_on_names_only() {
        let a = data(&[("x", true), ("y", false)]);
        let b = data(&[("x", true), ("y", true)]);
        let c = data(&[("x", true), ("z", true)]);
        assert!(a.compatible_with(&b));
        assert!(!a.compatible_with(&c));
    }

    #[test]
    fn empty_data_collapses_to_context_only() {
        assert_eq!(ArgShape::data([]), ArgShape::ContextOnly);
    }

    #[test]
    fn well_formedness() {
        assert!(data(&[("a", true), ("b", false)]).check_well_formed().is_ok());
        assert!(data(&[("a", true), ("a", true)]).check_well_formed().is_err());
        assert!(data(&[("a", false), ("b", true)]).check_well_formed().is_err());
        assert!(ArgShape::Data(vec![Param::required("")])
            .check_well_formed()
            .is_err());
    }

    #[test]
    fn universal_rejects_positional() {
        let args = Args::one(json!("x"));
        let err = ArgShape::ContextOnly.check_args("test", &args).unwrap_err();
        assert_eq!(err.as_label(), "unexpected_arguments");
        assert!(ArgShape::ContextOnly.check_args("test", &Args::none()).is_ok());
    }

    #[test]
    fn data_bounds_positional_count() {
        let shape = data(&[("a", true), ("b", false)]);
        assert!(shape.check_args("test", &Args::one(json!(1))).is_ok());
        assert!(shape
            .check_args("test", &Args::list(vec![json!(1), json!(2)]))
            .is_ok());

        let too_few = shape.check_args("test", &Args::none()).unwrap_err();
        assert_eq!(too_few.as_label(), "argument_count_mismatch");

        let too_many = shape
            .check_args("test", &Args::list(vec![json!(1), json!(2), json!(3)]))
            .unwrap_err();
        assert_eq!(too_many.as_label(), "argument_count_mismatch");
    }

    #[test]
    fn unknown_keyword_is_rejected() {
        let shape = data(&[("a", true), ("b", false)]);
        let args = Args::one(json!(1)).with_keyword("c", json!(2));
        let err = shape.check_args("test", &args).unwrap_err();
        assert_eq!(err.as_label(), "unexpected_keyword");

        let ok = Args::one(json!(1)).with_keyword("b", json!(2));
        assert!(shape.check_args("test", &ok).is_ok());
    }

    #[test]
    fn display_renders_shapes() {
        assert_eq!(ArgShape::NoArgs.to_string(), "()");
        assert_eq!(ArgShape::ContextOnly.to_string(), "(ctx)");
        assert_eq!(data(&[("a", true), ("b", false)]).to_string(), "(ctx, a, b?)");
    }
}
