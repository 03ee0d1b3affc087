//! Lazy relation wrapper.
//!
//! A [`LazyRelation`] captures the operations its base relation exposes once,
//! at construction, as a name -> arity table. Forwarding is a lookup in that
//! table followed by an arity check:
//!
//! - variadic, or exactly enough arguments: invoke now; a relation result is
//!   wrapped again with the same mapper registry
//! - too few arguments: return a [`Curried`] call without invoking
//! - too many arguments: [`RelationError::ArityMismatch`]
//!
//! `combine`, `map_with`/`as` and `call` belong to the wrapper and are never
//! forwarded, even if the base relation declares operations with those names.

use crate::error::RelationError;
use crate::relation::{Arity, Curried, Loaded, MapperRegistry, Pipeline, Relation, RelationGraph, Response};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const WRAPPER_OPERATIONS: [&str; 4] = ["combine", "map_with", "as", "call"];

#[derive(Debug, Clone)]
pub struct LazyRelation {
    relation: Arc<dyn Relation>,
    exposed: Arc<BTreeMap<String, Arity>>,
    mappers: Arc<MapperRegistry>,
}

/// Value returned by an invoked operation.
#[derive(Debug, Clone)]
pub enum Output {
    Relation(LazyRelation),
    Value(Value),
}

impl Output {
    pub fn into_relation(self) -> Option<LazyRelation> {
        match self {
            Output::Relation(relation) => Some(relation),
            Output::Value(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Output::Value(value) => Some(value),
            Output::Relation(_) => None,
        }
    }
}

/// Either the operation ran, or it is waiting for more arguments.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    Invoked(Output),
    Deferred(Curried),
}

impl CallOutcome {
    pub fn is_deferred(&self) -> bool {
        matches!(self, CallOutcome::Deferred(_))
    }

    pub fn into_output(self) -> Option<Output> {
        match self {
            CallOutcome::Invoked(output) => Some(output),
            CallOutcome::Deferred(_) => None,
        }
    }

    pub fn into_curried(self) -> Option<Curried> {
        match self {
            CallOutcome::Deferred(curried) => Some(curried),
            CallOutcome::Invoked(_) => None,
        }
    }
}

impl LazyRelation {
    pub fn new(relation: Arc<dyn Relation>, mappers: Arc<MapperRegistry>) -> Self {
        let exposed = relation
            .operations()
            .into_iter()
            .filter(|op| !WRAPPER_OPERATIONS.contains(&op.name.as_str()))
            .map(|op| (op.name, op.arity))
            .collect();

        Self {
            relation,
            exposed: Arc::new(exposed),
            mappers,
        }
    }

    pub fn relation(&self) -> &Arc<dyn Relation> {
        &self.relation
    }

    pub fn name(&self) -> &str {
        self.relation.name()
    }

    pub fn mappers(&self) -> &Arc<MapperRegistry> {
        &self.mappers
    }

    /// Whether `name` can be forwarded to the base relation.
    pub fn exposes(&self, name: &str) -> bool {
        self.exposed.contains_key(name)
    }

    pub fn exposed_operations(&self) -> impl Iterator<Item = (&str, Arity)> + '_ {
        self.exposed.iter().map(|(name, arity)| (name.as_str(), *arity))
    }

    pub fn is_curried(&self) -> bool {
        false
    }

    /// Eager-load `others` alongside this relation. Nothing is read.
    pub fn combine(&self, others: impl IntoIterator<Item = LazyRelation>) -> RelationGraph {
        RelationGraph::build(self.clone(), others)
    }

    /// Fold this relation and the named mappers into a pipeline, left to
    /// right. Fails on the first unknown mapper name.
    pub fn map_with<I, S>(&self, names: I) -> Result<Pipeline, RelationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(
            Pipeline::source(self.clone()),
            |pipeline, name| -> Result<Pipeline, RelationError> {
                let name = name.as_ref();
                let mapper = self.mappers.get(name)?;
                Ok(pipeline.then(name, mapper))
            },
        )
    }

    /// Alias of [`LazyRelation::map_with`].
    pub fn r#as<I, S>(&self, names: I) -> Result<Pipeline, RelationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_with(names)
    }

    /// Realize the base relation. This is the only wrapper operation that
    /// reads data.
    pub fn call(&self) -> Result<Loaded, RelationError> {
        let tuples = self.relation.load().map_err(|err| RelationError::Failed {
            relation: self.name().to_string(),
            operation: "call".to_string(),
            source: err.into(),
        })?;
        Ok(Loaded {
            relation: self.name().to_string(),
            tuples,
        })
    }

    /// Forward an operation to the base relation, currying if under-supplied.
    pub fn forward(&self, name: &str, args: Vec<Value>) -> Result<CallOutcome, RelationError> {
        let arity = self
            .exposed
            .get(name)
            .copied()
            .ok_or_else(|| RelationError::NoSuchOperation {
                relation: self.name().to_string(),
                name: name.to_string(),
            })?;

        tracing::trace!(relation = %self.name(), operation = name, args = args.len(), "forwarding");
        dispatch(&self.relation, &self.mappers, name, arity, args)
    }
}

/// Shared by direct and curried wrappers once the operation name is known to
/// be allowed.
pub(crate) fn dispatch(
    relation: &Arc<dyn Relation>,
    mappers: &Arc<MapperRegistry>,
    name: &str,
    arity: Arity,
    args: Vec<Value>,
) -> Result<CallOutcome, RelationError> {
    let given = args.len();
    match arity {
        Arity::Variadic => invoke(relation, mappers, name, &args),
        Arity::Fixed(n) if n == given => invoke(relation, mappers, name, &args),
        Arity::Fixed(n) if n > given => Ok(CallOutcome::Deferred(Curried::new(
            Arc::clone(relation),
            Arc::clone(mappers),
            name,
            args,
            n,
        ))),
        Arity::Fixed(n) => Err(RelationError::ArityMismatch {
            relation: relation.name().to_string(),
            name: name.to_string(),
            arity: n,
            given,
        }),
    }
}

fn invoke(
    relation: &Arc<dyn Relation>,
    mappers: &Arc<MapperRegistry>,
    name: &str,
    args: &[Value],
) -> Result<CallOutcome, RelationError> {
    let response = relation
        .invoke(name, args)
        .map_err(|err| RelationError::Failed {
            relation: relation.name().to_string(),
            operation: name.to_string(),
            source: err.into(),
        })?;

    let output = match response {
        Response::Relation(next) => Output::Relation(LazyRelation::new(next, Arc::clone(mappers))),
        Response::Value(value) => Output::Value(value),
    };
    Ok(CallOutcome::Invoked(output))
}

/// The two wrapper states behind one forwarding entry point.
#[derive(Debug, Clone)]
pub enum RelationWrapper {
    Direct(LazyRelation),
    Curried(Curried),
}

impl RelationWrapper {
    pub fn is_curried(&self) -> bool {
        matches!(self, RelationWrapper::Curried(_))
    }

    pub fn relation(&self) -> &Arc<dyn Relation> {
        match self {
            RelationWrapper::Direct(lazy) => lazy.relation(),
            RelationWrapper::Curried(curried) => curried.relation(),
        }
    }

    /// A direct wrapper forwards any exposed operation; a curried one only
    /// its captured operation.
    pub fn forward(&self, name: &str, args: Vec<Value>) -> Result<CallOutcome, RelationError> {
        match self {
            RelationWrapper::Direct(lazy) => lazy.forward(name, args),
            RelationWrapper::Curried(curried) => curried.forward(name, args),
        }
    }
}

impl From<LazyRelation> for RelationWrapper {
    fn from(lazy: LazyRelation) -> Self {
        RelationWrapper::Direct(lazy)
    }
}

impl From<Curried> for RelationWrapper {
    fn from(curried: Curried) -> Self {
        RelationWrapper::Curried(curried)
    }
}
