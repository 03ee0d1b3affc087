//! Tuple paths used to route input into command nodes.
//!
//! Example: the command spec `users -> address` yields `TuplePath(["users", "address"])`,
//! which addresses `input["users"]["address"]`.
//!
//! A path is extended by value (`child`) so that every node keeps its own copy
//! and nothing built earlier can observe later appends.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TuplePath(Vec<String>);

impl TuplePath {
    pub fn new(keys: Vec<String>) -> Self {
        Self(keys)
    }

    /// The empty path used for a root node without a caller-supplied prefix.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// A new path with `key` appended. `self` is left untouched.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut keys = self.0.clone();
        keys.push(key.into());
        Self(keys)
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Everything except the last key.
    pub fn prefix(&self) -> &[String] {
        match self.0.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }
}

impl fmt::Display for TuplePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        write!(f, "{}", self.0.join("."))
    }
}

impl<S: Into<String>> FromIterator<S> for TuplePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
