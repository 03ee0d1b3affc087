//! Command graph: recursive assembly from a [`CommandSpec`] and execution.
//!
//! Each node is bound to the tuple path implied by its position in the command spec
//! (`prefix + key`). At call time a node resolves its own slice of the input,
//! runs its command, then runs its children. When a node's slice is a
//! collection, each child runs once per element with that element's index,
//! which is how one-to-many writes reach `input[parent][i][child]`. Children
//! always resolve below their parent's slice, so fan-out nests to any depth.
//! Once every child has run, the command's `combine` hook sees their outcomes.

use crate::command::{Command, CommandId, CommandLookup, CommandSpec, InputResolver};
use crate::diagnostics;
use crate::error::{CommandError, GraphError};
use crate::path::TuplePath;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One command bound to its input path, plus owned children.
#[derive(Debug, Clone)]
pub struct CommandNode {
    id: CommandId,
    command: Arc<dyn Command>,
    input: InputResolver,
    children: Vec<CommandNode>,
}

/// Result of running a node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeOutcome {
    pub command: CommandId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub output: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeOutcome>,
}

/// Build the command tree for `spec`, rooted under `prefix`.
///
/// Lookup failures abort the build and are returned unchanged. Requesting
/// children for a command that is not composite is an error.
///
/// `spec` is validated again here because specs assembled in code with
/// [`CommandSpec::new`] never pass through the JSON parser. The identifier
/// pattern is compiled once per process, so the repeat walk is cheap.
pub fn build<R>(registry: &R, spec: &CommandSpec, prefix: &TuplePath) -> Result<CommandNode, GraphError>
where
    R: CommandLookup + ?Sized,
{
    spec.validate()?;
    let root = build_node(registry, spec, prefix)?;
    warn_shared_paths(&root);
    Ok(root)
}

fn build_node<R>(registry: &R, spec: &CommandSpec, prefix: &TuplePath) -> Result<CommandNode, GraphError>
where
    R: CommandLookup + ?Sized,
{
    let relation = spec.relation.relation();
    let command = registry.command(relation, &spec.command)?;
    let path = prefix.child(spec.relation.key());

    let id = CommandId {
        relation: relation.to_string(),
        name: spec.command.clone(),
        path: path.clone(),
    };

    if !spec.children.is_empty() && !command.is_composite() {
        return Err(GraphError::NotComposite { command: id });
    }

    let children = spec
        .children
        .iter()
        .map(|child| build_node(registry, child, &path))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(command = %id, children = children.len(), "built command node");

    Ok(CommandNode {
        id,
        command,
        input: InputResolver::new(path),
        children,
    })
}

fn warn_shared_paths(root: &CommandNode) {
    let mut seen: BTreeMap<&TuplePath, usize> = BTreeMap::new();
    for node in root.nodes() {
        *seen.entry(node.path()).or_default() += 1;
    }
    for (path, count) in seen {
        if count > 1 {
            diagnostics::warn(format!(
                "{} command nodes share tuple path {}; they will read the same input",
                count, path
            ));
        }
    }
}

impl CommandNode {
    pub fn id(&self) -> &CommandId {
        &self.id
    }

    pub fn command(&self) -> &Arc<dyn Command> {
        &self.command
    }

    pub fn path(&self) -> &TuplePath {
        self.input.path()
    }

    pub fn children(&self) -> &[CommandNode] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// All nodes of the subtree in depth-first pre-order.
    pub fn nodes(&self) -> Vec<&CommandNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.nodes());
        }
        out
    }

    /// Resolve this node's slice of `input`, attributing path failures to
    /// this node.
    pub fn resolve_input<'a>(
        &self,
        input: &'a Value,
        index: Option<usize>,
    ) -> Result<&'a Value, CommandError> {
        self.input
            .resolve(input, index)
            .map_err(|source| CommandError::Execution {
                command: self.id.clone(),
                source,
            })
    }

    /// Run the subtree against a full input tuple.
    pub fn call(&self, input: &Value) -> Result<NodeOutcome, CommandError> {
        self.call_at(input, 0, None, None)
    }

    /// `base` is the value the first `depth` keys of this node's path lead
    /// to: the whole input for the root, otherwise the parent's slice or one
    /// element of it.
    fn call_at(
        &self,
        base: &Value,
        depth: usize,
        index: Option<usize>,
        parent: Option<&Value>,
    ) -> Result<NodeOutcome, CommandError> {
        let slice = self
            .input
            .resolve_from(base, depth)
            .map_err(|source| CommandError::Execution {
                command: self.id.clone(),
                source,
            })?;

        tracing::debug!(command = %self.id, index = ?index, "calling command");
        let output = self
            .command
            .call(slice, parent)
            .map_err(|err| self.failed(err))?;

        let depth = self.path().len();
        let mut children = Vec::new();
        for child in &self.children {
            match slice {
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        children.push(child.call_at(item, depth, Some(i), Some(&output))?);
                    }
                }
                _ => children.push(child.call_at(slice, depth, None, Some(&output))?),
            }
        }

        let output = self
            .command
            .combine(output, &children)
            .map_err(|err| self.failed(err))?;

        Ok(NodeOutcome {
            command: self.id.clone(),
            index,
            output,
            children,
        })
    }

    fn failed(&self, err: anyhow::Error) -> CommandError {
        CommandError::Failed {
            command: self.id.clone(),
            source: err.into(),
        }
    }
}
