//! Input routing for a single command node.
//!
//! Without an index the resolver walks every key of its path:
//! `input[a][b]`. With an index (one-to-many fan-out) it walks the prefix,
//! takes the `index`-th element and then the last key: `input[a][i][b]`.
//! If the prefix lands on a mapping instead of a collection, the last key is
//! taken first and the collection under it is indexed: `input[a][b][i]`.

use crate::error::PathError;
use crate::path::TuplePath;
use serde_json::Value;

/// Path walk bound to one node. Owns its path; never shares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputResolver {
    path: TuplePath,
}

impl InputResolver {
    pub fn new(path: TuplePath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &TuplePath {
        &self.path
    }

    pub fn resolve<'a>(&self, input: &'a Value, index: Option<usize>) -> Result<&'a Value, PathError> {
        let Some(index) = index else {
            return self.walk(input, self.path.keys());
        };

        let last = self.path.last().ok_or(PathError::EmptyPath { index })?;
        let parent = self.walk(input, self.path.prefix())?;

        match parent {
            Value::Array(items) => {
                let item = items.get(index).ok_or_else(|| PathError::IndexOutOfBounds {
                    path: self.path.clone(),
                    index,
                    len: items.len(),
                })?;
                self.fetch(item, last)
            }
            Value::Object(_) => {
                let nested = self.fetch(parent, last)?;
                self.at(nested, index)
            }
            _ => Err(PathError::NotACollection {
                path: self.path.prefix().iter().collect(),
                index,
            }),
        }
    }

    /// Walk only the keys past `depth`, starting from `base`, the value the
    /// first `depth` keys already led to. Execution uses this to resolve a
    /// child against its parent's slice (or one element of it).
    pub fn resolve_from<'a>(&self, base: &'a Value, depth: usize) -> Result<&'a Value, PathError> {
        let keys = self.path.keys().get(depth..).unwrap_or(&[]);
        self.walk(base, keys)
    }

    fn walk<'a>(&self, input: &'a Value, keys: &[String]) -> Result<&'a Value, PathError> {
        keys.iter().try_fold(input, |value, key| self.fetch(value, key))
    }

    fn fetch<'a>(&self, value: &'a Value, key: &str) -> Result<&'a Value, PathError> {
        value
            .as_object()
            .and_then(|map| map.get(key))
            .ok_or_else(|| PathError::MissingKey {
                path: self.path.clone(),
                key: key.to_string(),
            })
    }

    fn at<'a>(&self, value: &'a Value, index: usize) -> Result<&'a Value, PathError> {
        let items = value.as_array().ok_or_else(|| PathError::NotACollection {
            path: self.path.clone(),
            index,
        })?;
        items.get(index).ok_or_else(|| PathError::IndexOutOfBounds {
            path: self.path.clone(),
            index,
            len: items.len(),
        })
    }
}
