//! Curried relation calls.
//!
//! A `Curried` holds an operation that was forwarded with too few arguments.
//! Supplying more arguments produces either another `Curried` or, once the
//! count matches the arity, the invoked result.

use crate::error::RelationError;
use crate::relation::lazy::dispatch;
use crate::relation::{Arity, CallOutcome, MapperRegistry, Relation};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Curried {
    relation: Arc<dyn Relation>,
    mappers: Arc<MapperRegistry>,
    name: String,
    args: Vec<Value>,
    arity: usize,
}

impl Curried {
    pub(crate) fn new(
        relation: Arc<dyn Relation>,
        mappers: Arc<MapperRegistry>,
        name: &str,
        args: Vec<Value>,
        arity: usize,
    ) -> Self {
        Self {
            relation,
            mappers,
            name: name.to_string(),
            args,
            arity,
        }
    }

    pub fn relation(&self) -> &Arc<dyn Relation> {
        &self.relation
    }

    /// The deferred operation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments captured so far.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Arguments still needed before the operation can run.
    pub fn remaining(&self) -> usize {
        self.arity.saturating_sub(self.args.len())
    }

    pub fn is_curried(&self) -> bool {
        true
    }

    /// Append `args` to the captured ones and dispatch again.
    pub fn call(&self, args: Vec<Value>) -> Result<CallOutcome, RelationError> {
        let mut all = self.args.clone();
        all.extend(args);
        dispatch(
            &self.relation,
            &self.mappers,
            &self.name,
            Arity::Fixed(self.arity),
            all,
        )
    }

    /// Forwarding on a curried call is locked to its captured operation.
    pub fn forward(&self, name: &str, args: Vec<Value>) -> Result<CallOutcome, RelationError> {
        if name != self.name {
            return Err(RelationError::NoSuchOperation {
                relation: self.relation.name().to_string(),
                name: name.to_string(),
            });
        }
        self.call(args)
    }
}
