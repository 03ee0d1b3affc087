//! Composition layer over host-supplied commands and relations.
//!
//! - [`command`]: builds a tree of write commands from a nested spec and
//!   routes each node's slice of an input tuple through its [`TuplePath`]
//! - [`relation`]: lazy relation wrappers with auto-currying, mapper
//!   pipelines and eager-load graphs

pub mod command;
pub mod diagnostics;
pub mod error;
pub mod path;
pub mod relation;

pub use command::{Command, CommandId, CommandLookup, CommandNode, CommandRegistry, CommandSpec};
pub use error::{CommandError, GraphError, LookupError, PathError, RelationError, SpecError};
pub use path::TuplePath;
pub use relation::{CallOutcome, Curried, LazyRelation, MapperRegistry, Relation, RelationGraph};

pub type Result<T> = anyhow::Result<T>;
