//! Mappers and relation pipelines.
//!
//! The registry is filled during setup and then shared behind an `Arc`; after
//! that it is only read, so lookups need no locking.

use crate::Result;
use crate::error::{LookupError, RelationError};
use crate::relation::LazyRelation;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A unary transformation used as a pipeline stage.
pub trait Mapper: Send + Sync + fmt::Debug {
    fn call(&self, input: Value) -> Result<Value>;
}

/// Adapter turning a closure into a [`Mapper`].
pub struct FnMapper<F> {
    name: String,
    f: F,
}

impl<F> FnMapper<F>
where
    F: Fn(Value) -> Result<Value> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for FnMapper<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMapper")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F> Mapper for FnMapper<F>
where
    F: Fn(Value) -> Result<Value> + Send + Sync,
{
    fn call(&self, input: Value) -> Result<Value> {
        (self.f)(input)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapperRegistry {
    mappers: BTreeMap<String, Arc<dyn Mapper>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, mapper: Arc<dyn Mapper>) -> &mut Self {
        self.mappers.insert(name.into(), mapper);
        self
    }

    pub fn get(&self, name: &str) -> std::result::Result<Arc<dyn Mapper>, LookupError> {
        self.mappers
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::UnknownMapper {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mappers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

/// A lazy relation followed by zero or more mappers. Each stage consumes the
/// previous stage's output.
#[derive(Debug, Clone)]
pub enum Pipeline {
    Source(LazyRelation),
    Composite {
        left: Box<Pipeline>,
        name: String,
        mapper: Arc<dyn Mapper>,
    },
}

impl Pipeline {
    pub fn source(relation: LazyRelation) -> Self {
        Pipeline::Source(relation)
    }

    /// Append a stage.
    pub fn then(self, name: impl Into<String>, mapper: Arc<dyn Mapper>) -> Self {
        Pipeline::Composite {
            left: Box::new(self),
            name: name.into(),
            mapper,
        }
    }

    /// The relation at the head of the pipeline.
    pub fn relation(&self) -> &LazyRelation {
        match self {
            Pipeline::Source(relation) => relation,
            Pipeline::Composite { left, .. } => left.relation(),
        }
    }

    /// Mapper names in application order.
    pub fn stages(&self) -> Vec<&str> {
        match self {
            Pipeline::Source(_) => Vec::new(),
            Pipeline::Composite { left, name, .. } => {
                let mut stages = left.stages();
                stages.push(name);
                stages
            }
        }
    }

    /// Load the relation and run every stage in order.
    pub fn call(&self) -> std::result::Result<Value, RelationError> {
        match self {
            Pipeline::Source(relation) => Ok(relation.call()?.into_value()),
            Pipeline::Composite { left, name, mapper } => {
                let input = left.call()?;
                tracing::trace!(mapper = %name, "applying mapper");
                mapper
                    .call(input)
                    .map_err(|err| RelationError::MapperFailed {
                        mapper: name.clone(),
                        source: err.into(),
                    })
            }
        }
    }
}
