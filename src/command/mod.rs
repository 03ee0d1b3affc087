//! Command layer: nested specs, input routing, and the command graph.
//!
//! The storage-facing commands are supplied by the host through [`Command`]
//! and looked up through [`CommandLookup`]. This module owns:
//! - [`CommandSpec`] (validated nested spec, parsed from JSON or built in code)
//! - [`InputResolver`] (tuple path walk, with fan-out by index)
//! - [`CommandNode`] and the recursive graph builder

pub mod graph;
pub mod resolve;
pub mod spec;

pub use graph::{CommandNode, NodeOutcome, build};
pub use resolve::InputResolver;
pub use spec::{CommandSpec, RawCommandSpec, RelationRef};

use crate::Result;
use crate::error::LookupError;
use crate::path::TuplePath;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A storage command supplied by the host.
///
/// Implementations must tolerate concurrent read-only `call`s if a built graph
/// is shared between threads.
pub trait Command: Send + Sync + fmt::Debug {
    /// Relation the command writes to.
    fn relation(&self) -> &str;

    /// Command name within the relation (`create`, `update`, ...).
    fn name(&self) -> &str;

    /// Whether child commands can be attached under this command.
    fn is_composite(&self) -> bool {
        false
    }

    /// Run the command against its routed input. `parent` carries the output
    /// of the parent node, if any.
    fn call(&self, input: &Value, parent: Option<&Value>) -> Result<Value>;

    /// Fold the outcomes of child commands into this command's output. Runs
    /// after every child has finished; the default keeps `output` as is.
    fn combine(&self, output: Value, _children: &[NodeOutcome]) -> Result<Value> {
        Ok(output)
    }
}

/// Resolves `(relation, command)` pairs to commands.
pub trait CommandLookup {
    fn command(&self, relation: &str, name: &str) -> std::result::Result<Arc<dyn Command>, LookupError>;
}

/// Identity of a node inside a built graph, used for failure attribution.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CommandId {
    pub relation: String,
    pub name: String,
    pub path: TuplePath,
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} at {}", self.relation, self.name, self.path)
    }
}

/// In-memory command registry keyed by relation, then command name.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, BTreeMap<String, Arc<dyn Command>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under its own relation and name, replacing any
    /// previous entry.
    pub fn register(&mut self, command: Arc<dyn Command>) -> &mut Self {
        self.commands
            .entry(command.relation().to_string())
            .or_default()
            .insert(command.name().to_string(), command);
        self
    }

    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }
}

impl CommandLookup for CommandRegistry {
    fn command(&self, relation: &str, name: &str) -> std::result::Result<Arc<dyn Command>, LookupError> {
        self.commands
            .get(relation)
            .and_then(|by_name| by_name.get(name))
            .cloned()
            .ok_or_else(|| LookupError::CommandNotFound {
                relation: relation.to_string(),
                command: name.to_string(),
            })
    }
}
