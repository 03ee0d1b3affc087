//! Error types for graph construction, input routing and relation forwarding.
//!
//! Collaborator failures arrive as `anyhow::Error`; they are boxed here so the
//! original cause stays reachable through `Error::source`.

use crate::command::CommandId;
use crate::path::TuplePath;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A registry could not resolve a name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no command '{command}' registered for relation '{relation}'")]
    CommandNotFound { relation: String, command: String },
    #[error("no mapper registered under '{name}'")]
    UnknownMapper { name: String },
}

/// The nested command specification has an unsupported shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed command spec at {location}: {reason}")]
pub struct SpecError {
    pub location: String,
    pub reason: String,
}

impl SpecError {
    pub fn new(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

/// Failures raised while assembling a command graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Spec(#[from] SpecError),
    /// Children were requested for a command that cannot run them.
    #[error("command {command} does not accept child commands")]
    NotComposite { command: CommandId },
}

/// A tuple path could not be walked against a concrete input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("missing key '{key}' while resolving {path}")]
    MissingKey { path: TuplePath, key: String },
    #[error("expected a collection at {path} to take index {index}")]
    NotACollection { path: TuplePath, index: usize },
    #[error("index {index} is out of bounds for {len} elements at {path}")]
    IndexOutOfBounds {
        path: TuplePath,
        index: usize,
        len: usize,
    },
    #[error("fan-out index {index} needs a non-empty path")]
    EmptyPath { index: usize },
}

/// Execution failure attributed to the command node that raised it.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command {command} could not resolve its input")]
    Execution {
        command: CommandId,
        #[source]
        source: PathError,
    },
    #[error("command {command} failed")]
    Failed {
        command: CommandId,
        #[source]
        source: BoxError,
    },
}

impl CommandError {
    /// The node the failure belongs to.
    pub fn command(&self) -> &CommandId {
        match self {
            CommandError::Execution { command, .. } | CommandError::Failed { command, .. } => {
                command
            }
        }
    }
}

/// Failures surfaced by lazy relations, curried calls and pipelines.
#[derive(Debug, Error)]
pub enum RelationError {
    /// The name is not in the wrapper's capability table, or a curried
    /// wrapper was called with a different operation name.
    #[error("relation '{relation}' has no operation '{name}'")]
    NoSuchOperation { relation: String, name: String },
    #[error("operation '{relation}.{name}' takes {arity} arguments, got {given}")]
    ArityMismatch {
        relation: String,
        name: String,
        arity: usize,
        given: usize,
    },
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("relation '{relation}' failed in '{operation}'")]
    Failed {
        relation: String,
        operation: String,
        #[source]
        source: BoxError,
    },
    #[error("mapper '{mapper}' failed")]
    MapperFailed {
        mapper: String,
        #[source]
        source: BoxError,
    },
}
