//! # Argument tuple carried by a firing.
//!
//! [`Args`] bundles the positional values and keyword values a caller passes
//! to `fire`. It is validated once against the key's declared [`ArgShape`]
//! (see [`ArgShape::check_args`]) and is immutable from then on.
//!
//! [`ArgShape`]: crate::rules::ArgShape
//! [`ArgShape::check_args`]: crate::rules::ArgShape::check_args

use std::collections::BTreeMap;

use serde_json::Value;

/// Positional and keyword arguments for one firing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    keywords: BTreeMap<String, Value>,
}

impl Args {
    /// No arguments at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// A single positional argument.
    pub fn one(value: impl Into<Value>) -> Self {
        Self {
            positional: vec![value.into()],
            keywords: BTreeMap::new(),
        }
    }

    /// Positional arguments from a list.
    pub fn list(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            keywords: BTreeMap::new(),
        }
    }

    /// Appends a positional argument.
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Adds a keyword argument.
    pub fn with_keyword(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }

    /// Positional argument at `idx`, if present.
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.positional.get(idx)
    }

    /// First positional argument, if present.
    pub fn first(&self) -> Option<&Value> {
        self.positional.first()
    }

    /// Keyword argument by name, if present.
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords.get(name)
    }

    /// Number of positional arguments.
    pub fn positional_len(&self) -> usize {
        self.positional.len()
    }

    /// Keyword names, sorted.
    pub fn keyword_names(&self) -> impl Iterator<Item = &str> {
        self.keywords.keys().map(String::as_str)
    }

    /// True when neither positional nor keyword arguments were supplied.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    /// Iterates positional arguments in order.
    pub fn positional(&self) -> impl Iterator<Item = &Value> {
        self.positional.iter()
    }
}

impl From<Value> for Args {
    fn from(value: Value) -> Self {
        Args::one(value)
    }
}
