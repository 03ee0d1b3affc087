//! Relation graph: a root relation with eager-loaded dependents.
//!
//! Only the shape is recorded here. Reading the root and merging dependents
//! is left to the host's execution engine.

use crate::relation::LazyRelation;
use std::fmt;

#[derive(Debug, Clone)]
pub struct RelationGraph {
    root: LazyRelation,
    nodes: Vec<LazyRelation>,
}

impl RelationGraph {
    pub fn build(root: LazyRelation, dependents: impl IntoIterator<Item = LazyRelation>) -> Self {
        Self {
            root,
            nodes: dependents.into_iter().collect(),
        }
    }

    pub fn root(&self) -> &LazyRelation {
        &self.root
    }

    /// Dependents in the order they were combined.
    pub fn nodes(&self) -> &[LazyRelation] {
        &self.nodes
    }

    pub fn dependent_names(&self) -> Vec<&str> {
        self.nodes.iter().map(LazyRelation::name).collect()
    }
}

impl fmt::Display for RelationGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.root.name(), self.dependent_names().join(", "))
    }
}
