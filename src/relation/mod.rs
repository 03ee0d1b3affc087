//! Relation layer: lazy wrappers over host relations.
//!
//! - [`Relation`]: the host's queryable relation with a fixed set of named
//!   operations and declared arities
//! - [`LazyRelation`] / [`Curried`]: deferred forwarding with auto-currying
//! - [`Pipeline`]: a relation folded together with registered mappers
//! - [`RelationGraph`]: root relation plus eager-loaded dependents

pub mod curried;
pub mod graph;
pub mod lazy;
pub mod mapper;

pub use curried::Curried;
pub use graph::RelationGraph;
pub use lazy::{CallOutcome, LazyRelation, Output, RelationWrapper};
pub use mapper::{FnMapper, Mapper, MapperRegistry, Pipeline};

use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Declared argument count of a relation operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Arity {
    Fixed(usize),
    /// Accepts any number of arguments.
    Variadic,
}

impl Arity {
    /// Whether a call with `given` arguments can run right away.
    pub fn accepts(&self, given: usize) -> bool {
        match self {
            Arity::Fixed(n) => *n == given,
            Arity::Variadic => true,
        }
    }
}

/// A named operation a relation exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub name: String,
    pub arity: Arity,
}

impl Operation {
    pub fn new(name: impl Into<String>, arity: Arity) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

/// What an invoked operation produced.
#[derive(Debug, Clone)]
pub enum Response {
    Relation(Arc<dyn Relation>),
    Value(Value),
}

/// A queryable relation supplied by the host.
pub trait Relation: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Operations that may be forwarded to this relation.
    fn operations(&self) -> Vec<Operation>;

    /// Run a named operation. Only called with a name from `operations()`
    /// and an argument count its arity accepts.
    fn invoke(&self, operation: &str, args: &[Value]) -> Result<Response>;

    /// Read the relation's tuples.
    fn load(&self) -> Result<Vec<Value>>;
}

/// A realized relation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Loaded {
    pub relation: String,
    pub tuples: Vec<Value>,
}

impl Loaded {
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// The tuples as a JSON array, the form mappers receive.
    pub fn into_value(self) -> Value {
        Value::Array(self.tuples)
    }
}
