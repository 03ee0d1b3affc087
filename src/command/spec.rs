//! Nested command specs.
//!
//! JSON shapes accepted by [`CommandSpec::from_json`]:
//!
//! ```text
//! ["users", ["create"]]                          bare relation, no children
//! [{"user": "users"}, ["create", <children>]]    keyed relation
//! {"users": ["create", <children>]}              mapping shorthand (one entry)
//!
//! <children> := null | <node> | [<node>, ...]
//! ```
//!
//! Raw shapes are deserialized first (`RawCommandSpec`) and then validated
//! into [`CommandSpec`], so the builder never has to guess what a value is.

use crate::error::SpecError;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const IDENT_RE: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

static IDENT: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn ident() -> Result<&'static Regex, SpecError> {
    IDENT
        .get_or_init(|| Regex::new(IDENT_RE))
        .as_ref()
        .map_err(|err| SpecError::new("$", err.to_string()))
}

/// How a spec node names its relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationRef {
    /// The relation is addressed by its own name.
    Bare(String),
    /// Input is read under `key`; the command belongs to `relation`.
    Keyed { key: String, relation: String },
}

impl RelationRef {
    /// Key appended to the parent tuple path.
    pub fn key(&self) -> &str {
        match self {
            RelationRef::Bare(name) => name,
            RelationRef::Keyed { key, .. } => key,
        }
    }

    pub fn relation(&self) -> &str {
        match self {
            RelationRef::Bare(name) => name,
            RelationRef::Keyed { relation, .. } => relation,
        }
    }
}

/// Validated spec node: one command on one relation plus nested children.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawCommandSpec")]
pub struct CommandSpec {
    pub relation: RelationRef,
    pub command: String,
    pub children: Vec<CommandSpec>,
}

impl CommandSpec {
    pub fn new(relation: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            relation: RelationRef::Bare(relation.into()),
            command: command.into(),
            children: Vec::new(),
        }
    }

    pub fn keyed(
        key: impl Into<String>,
        relation: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            relation: RelationRef::Keyed {
                key: key.into(),
                relation: relation.into(),
            },
            command: command.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: CommandSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = CommandSpec>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn from_json(value: &Value) -> Result<Self, SpecError> {
        let raw: RawCommandSpec = serde_json::from_value(value.clone()).map_err(|err| {
            SpecError::new(
                "$",
                format!("value matches no command spec shape ({err})"),
            )
        })?;
        raw.validate_and_build()
    }

    pub fn from_json_str(text: &str) -> Result<Self, SpecError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| SpecError::new("$", format!("invalid JSON: {err}")))?;
        Self::from_json(&value)
    }

    /// Number of relation references in this spec, children included.
    pub fn relation_count(&self) -> usize {
        1 + self.children.iter().map(CommandSpec::relation_count).sum::<usize>()
    }

    /// Check every relation and command name is an identifier and every
    /// input key is non-empty. Keys address JSON input, so `first-name` or
    /// `user.id` are fine.
    pub fn validate(&self) -> Result<(), SpecError> {
        self.validate_at("$", ident()?)
    }

    fn validate_at(&self, parent: &str, re: &Regex) -> Result<(), SpecError> {
        let location = format!("{}/{}", parent, self.relation.key());
        if self.relation.key().is_empty() {
            return Err(SpecError::new(location, "input key is empty"));
        }
        let names = [
            ("relation", self.relation.relation()),
            ("command", self.command.as_str()),
        ];
        for (what, name) in names {
            if !re.is_match(name) {
                return Err(SpecError::new(
                    location,
                    format!("{} {:?} is not an identifier", what, name),
                ));
            }
        }
        for child in &self.children {
            child.validate_at(&location, re)?;
        }
        Ok(())
    }
}

/// Raw spec node shape as it appears in JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCommandSpec {
    Pair(RawRelationRef, RawCommand),
    Mapping(BTreeMap<String, RawCommand>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRelationRef {
    Name(String),
    Keyed(BTreeMap<String, String>),
}

/// `["create"]` or `["create", <children>]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCommand {
    Leaf([String; 1]),
    Branch(String, Option<RawChildren>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawChildren {
    Many(Vec<RawCommandSpec>),
    One(Box<RawCommandSpec>),
}

impl RawCommandSpec {
    /// Normalize the raw shape and validate names.
    pub fn validate_and_build(&self) -> Result<CommandSpec, SpecError> {
        let spec = self.build_at("$")?;
        spec.validate()?;
        Ok(spec)
    }

    fn build_at(&self, location: &str) -> Result<CommandSpec, SpecError> {
        let (relation, command) = match self {
            RawCommandSpec::Pair(relation, command) => (relation.build_at(location)?, command),
            RawCommandSpec::Mapping(entries) => {
                let (name, command) = single_entry(entries, location, "mapping spec")?;
                (RelationRef::Bare(name.clone()), command)
            }
        };

        let here = format!("{}/{}", location, relation.key());
        let (command, children) = match command {
            RawCommand::Leaf([name]) => (name.clone(), Vec::new()),
            RawCommand::Branch(name, None) => (name.clone(), Vec::new()),
            RawCommand::Branch(name, Some(RawChildren::One(child))) => {
                (name.clone(), vec![child.build_at(&here)?])
            }
            RawCommand::Branch(name, Some(RawChildren::Many(children))) => {
                let children = children
                    .iter()
                    .map(|child| child.build_at(&here))
                    .collect::<Result<Vec<_>, _>>()?;
                (name.clone(), children)
            }
        };

        Ok(CommandSpec {
            relation,
            command,
            children,
        })
    }
}

impl RawRelationRef {
    fn build_at(&self, location: &str) -> Result<RelationRef, SpecError> {
        match self {
            RawRelationRef::Name(name) => Ok(RelationRef::Bare(name.clone())),
            RawRelationRef::Keyed(entries) => {
                let (key, relation) = single_entry(entries, location, "relation reference")?;
                Ok(RelationRef::Keyed {
                    key: key.clone(),
                    relation: relation.clone(),
                })
            }
        }
    }
}

impl TryFrom<RawCommandSpec> for CommandSpec {
    type Error = SpecError;

    fn try_from(raw: RawCommandSpec) -> Result<Self, Self::Error> {
        raw.validate_and_build()
    }
}

fn single_entry<'a, V>(
    entries: &'a BTreeMap<String, V>,
    location: &str,
    what: &str,
) -> Result<(&'a String, &'a V), SpecError> {
    let mut iter = entries.iter();
    match (iter.next(), iter.next()) {
        (Some(entry), None) => Ok(entry),
        _ => Err(SpecError::new(
            location,
            format!("{} must have exactly one entry (found {})", what, entries.len()),
        )),
    }
}
