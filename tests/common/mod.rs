#![allow(dead_code)]

use anyhow::{anyhow, bail};
use relgraph::command::{Command, CommandRegistry};
use relgraph::relation::{Arity, MapperRegistry, Operation, Relation, Response};
use relgraph::{LazyRelation, Result};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// One recorded command invocation: routed input and parent output.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub command: String,
    pub input: Value,
    pub parent: Option<Value>,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

/// Command that records its calls and returns `{"relation": ..., "input": ...}`.
#[derive(Debug)]
pub struct RecordingCommand {
    pub relation: String,
    pub name: String,
    pub composite: bool,
    pub log: CallLog,
}

impl Command for RecordingCommand {
    fn relation(&self) -> &str {
        &self.relation
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_composite(&self) -> bool {
        self.composite
    }

    fn call(&self, input: &Value, parent: Option<&Value>) -> Result<Value> {
        if input.get("fail").is_some() {
            bail!("{} refused input", self.relation);
        }
        self.log
            .lock()
            .map_err(|_| anyhow!("call log poisoned"))?
            .push(Call {
                command: format!("{}.{}", self.relation, self.name),
                input: input.clone(),
                parent: parent.cloned(),
            });
        Ok(json!({"relation": self.relation, "input": input}))
    }
}

/// Registry with composite `create` and leaf `delete` for each relation.
pub fn registry(relations: &[&str]) -> (CommandRegistry, CallLog) {
    let log: CallLog = Arc::default();
    let mut registry = CommandRegistry::new();
    for relation in relations {
        registry.register(Arc::new(RecordingCommand {
            relation: relation.to_string(),
            name: "create".into(),
            composite: true,
            log: Arc::clone(&log),
        }));
        registry.register(Arc::new(RecordingCommand {
            relation: relation.to_string(),
            name: "delete".into(),
            composite: false,
            log: Arc::clone(&log),
        }));
    }
    (registry, log)
}

pub fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().expect("call log").clone()
}

/// In-memory relation over JSON objects.
///
/// Operations: `restrict(criteria)`, `where_eq(key, value)`,
/// `project(keys...)`, `count()`, and a `call` that must never be forwarded.
#[derive(Debug, Clone)]
pub struct MemoryRelation {
    pub name: String,
    pub tuples: Vec<Value>,
    pub invocations: Arc<Mutex<Vec<String>>>,
}

impl MemoryRelation {
    pub fn new(name: &str, tuples: Vec<Value>) -> Self {
        Self {
            name: name.to_string(),
            tuples,
            invocations: Arc::default(),
        }
    }

    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().expect("invocations").clone()
    }

    fn derive(&self, tuples: Vec<Value>) -> Response {
        Response::Relation(Arc::new(MemoryRelation {
            name: self.name.clone(),
            tuples,
            invocations: Arc::clone(&self.invocations),
        }))
    }

    fn filter(&self, keep: impl Fn(&Value) -> bool) -> Vec<Value> {
        self.tuples.iter().filter(|t| keep(*t)).cloned().collect()
    }
}

impl Relation for MemoryRelation {
    fn name(&self) -> &str {
        &self.name
    }

    fn operations(&self) -> Vec<Operation> {
        vec![
            Operation::new("restrict", Arity::Fixed(1)),
            Operation::new("where_eq", Arity::Fixed(2)),
            Operation::new("project", Arity::Variadic),
            Operation::new("count", Arity::Fixed(0)),
            Operation::new("call", Arity::Fixed(0)),
        ]
    }

    fn invoke(&self, operation: &str, args: &[Value]) -> Result<Response> {
        self.invocations
            .lock()
            .map_err(|_| anyhow!("invocations poisoned"))?
            .push(operation.to_string());

        match (operation, args) {
            ("restrict", [criteria]) => {
                let criteria = criteria
                    .as_object()
                    .ok_or_else(|| anyhow!("restrict expects an object"))?;
                Ok(self.derive(self.filter(|t| {
                    criteria.iter().all(|(k, v)| t.get(k) == Some(v))
                })))
            }
            ("where_eq", [key, value]) => {
                let key = key.as_str().ok_or_else(|| anyhow!("where_eq key must be a string"))?;
                Ok(self.derive(self.filter(|t| t.get(key) == Some(value))))
            }
            ("project", keys) => {
                let keys: Vec<&str> = keys.iter().filter_map(Value::as_str).collect();
                let tuples = self
                    .tuples
                    .iter()
                    .map(|t| {
                        let projected: serde_json::Map<String, Value> = keys
                            .iter()
                            .filter_map(|k| t.get(*k).map(|v| (k.to_string(), v.clone())))
                            .collect();
                        Value::Object(projected)
                    })
                    .collect();
                Ok(self.derive(tuples))
            }
            ("count", []) => Ok(Response::Value(json!(self.tuples.len()))),
            _ => bail!("unsupported call {operation} with {} args", args.len()),
        }
    }

    fn load(&self) -> Result<Vec<Value>> {
        self.invocations
            .lock()
            .map_err(|_| anyhow!("invocations poisoned"))?
            .push("load".to_string());
        Ok(self.tuples.clone())
    }
}

pub fn users() -> MemoryRelation {
    MemoryRelation::new(
        "users",
        vec![
            json!({"name": "Jane", "age": 30}),
            json!({"name": "Joe", "age": 25}),
            json!({"name": "Jade", "age": 30}),
        ],
    )
}

pub fn lazy(relation: MemoryRelation, mappers: MapperRegistry) -> LazyRelation {
    LazyRelation::new(Arc::new(relation), Arc::new(mappers))
}
