mod common;

use common::{MemoryRelation, lazy, users};
use pretty_assertions::assert_eq;
use relgraph::relation::{Arity, CallOutcome, FnMapper, MapperRegistry, Output, RelationWrapper};
use relgraph::{LookupError, RelationError};
use serde_json::{Value, json};
use std::sync::Arc;

fn names_mapper() -> FnMapper<impl Fn(Value) -> relgraph::Result<Value> + Send + Sync> {
    FnMapper::new("names", |value: Value| {
        let names: Vec<Value> = value
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|t| t.get("name").cloned())
            .collect();
        Ok(Value::Array(names))
    })
}

fn mappers() -> MapperRegistry {
    let mut registry = MapperRegistry::new();
    registry.register("names", Arc::new(names_mapper()));
    registry.register(
        "count",
        Arc::new(FnMapper::new("count", |value: Value| {
            Ok(json!(value.as_array().map(Vec::len).unwrap_or(0)))
        })),
    );
    registry
}

#[test]
fn exposed_operations_exclude_wrapper_names() {
    let relation = lazy(users(), MapperRegistry::new());

    let exposed: Vec<(&str, Arity)> = relation.exposed_operations().collect();
    assert_eq!(
        exposed,
        vec![
            ("count", Arity::Fixed(0)),
            ("project", Arity::Variadic),
            ("restrict", Arity::Fixed(1)),
            ("where_eq", Arity::Fixed(2)),
        ]
    );
    assert!(relation.exposes("restrict"));
    assert!(!relation.exposes("call"));
    assert!(!relation.is_curried());
}

#[test]
fn exact_arity_invokes_and_rewraps_relations() {
    let base = users();
    let relation = lazy(base.clone(), mappers());

    let outcome = relation.forward("restrict", vec![json!({"age": 30})]).unwrap();
    let restricted = outcome.into_output().and_then(Output::into_relation).unwrap();

    assert_eq!(base.invocations(), vec!["restrict"]);
    assert!(Arc::ptr_eq(restricted.mappers(), relation.mappers()));
    assert_eq!(
        restricted.call().unwrap().tuples,
        vec![json!({"name": "Jane", "age": 30}), json!({"name": "Jade", "age": 30})]
    );
}

#[test]
fn non_relation_results_are_returned_unchanged() {
    let relation = lazy(users(), MapperRegistry::new());
    let count = relation
        .forward("count", vec![])
        .unwrap()
        .into_output()
        .and_then(Output::into_value);
    assert_eq!(count, Some(json!(3)));
}

#[test]
fn variadic_operations_accept_any_count() {
    let relation = lazy(users(), MapperRegistry::new());
    let projected = relation
        .forward("project", vec![json!("name")])
        .unwrap()
        .into_output()
        .and_then(Output::into_relation)
        .unwrap();
    assert_eq!(
        projected.call().unwrap().tuples,
        vec![json!({"name": "Jane"}), json!({"name": "Joe"}), json!({"name": "Jade"})]
    );
}

#[test]
fn under_supplied_call_is_curried_without_invoking() {
    let base = users();
    let relation = lazy(base.clone(), MapperRegistry::new());

    let outcome = relation.forward("where_eq", vec![json!("name")]).unwrap();
    assert!(outcome.is_deferred());
    assert!(base.invocations().is_empty());

    let curried = outcome.into_curried().unwrap();
    assert_eq!(curried.name(), "where_eq");
    assert_eq!(curried.args(), [json!("name")]);
    assert_eq!(curried.arity(), 2);
    assert_eq!(curried.remaining(), 1);
    assert!(curried.is_curried());
}

#[test]
fn curried_call_runs_once_arguments_are_complete() {
    let base = users();
    let relation = lazy(base.clone(), MapperRegistry::new());
    let curried = relation
        .forward("where_eq", vec![json!("name")])
        .unwrap()
        .into_curried()
        .unwrap();

    let wrapper = RelationWrapper::from(curried);
    assert!(wrapper.is_curried());

    let err = wrapper.forward("restrict", vec![json!({})]).unwrap_err();
    assert!(matches!(err, RelationError::NoSuchOperation { ref name, .. } if name == "restrict"));

    let joe = wrapper
        .forward("where_eq", vec![json!("Joe")])
        .unwrap()
        .into_output()
        .and_then(Output::into_relation)
        .unwrap();
    assert_eq!(base.invocations(), vec!["where_eq"]);
    assert_eq!(joe.call().unwrap().tuples, vec![json!({"name": "Joe", "age": 25})]);
}

#[test]
fn unknown_operations_are_rejected() {
    let wrapper = RelationWrapper::from(lazy(users(), MapperRegistry::new()));
    for name in ["drop_table", "call", "combine"] {
        let err = wrapper.forward(name, vec![]).unwrap_err();
        assert!(
            matches!(err, RelationError::NoSuchOperation { .. }),
            "{name}: {err:?}"
        );
    }
}

#[test]
fn over_supplied_fixed_arity_is_an_error() {
    let relation = lazy(users(), MapperRegistry::new());
    let err = relation
        .forward("restrict", vec![json!({}), json!({})])
        .unwrap_err();
    assert!(matches!(
        err,
        RelationError::ArityMismatch { arity: 1, given: 2, .. }
    ));
}

#[test]
fn relation_failures_keep_their_cause() {
    let relation = lazy(users(), MapperRegistry::new());
    let err = relation.forward("restrict", vec![json!("not an object")]).unwrap_err();
    let RelationError::Failed { operation, source, .. } = err else {
        panic!("expected a relation failure");
    };
    assert_eq!(operation, "restrict");
    assert_eq!(source.to_string(), "restrict expects an object");
}

#[test]
fn map_with_folds_mappers_left_to_right() {
    let relation = lazy(users(), mappers());
    let adults = relation
        .forward("restrict", vec![json!({"age": 30})])
        .unwrap()
        .into_output()
        .and_then(Output::into_relation)
        .unwrap();

    let pipeline = adults.map_with(["names"]).unwrap();
    assert_eq!(pipeline.stages(), vec!["names"]);
    assert_eq!(pipeline.call().unwrap(), json!(["Jane", "Jade"]));

    let counted = adults.r#as(["names", "count"]).unwrap();
    assert_eq!(counted.stages(), vec!["names", "count"]);
    assert_eq!(counted.call().unwrap(), json!(2));
}

#[test]
fn map_with_without_names_loads_the_relation() {
    let base = users();
    let relation = lazy(base.clone(), mappers());
    let pipeline = relation.map_with(Vec::<String>::new()).unwrap();
    assert!(base.invocations().is_empty());

    assert_eq!(pipeline.call().unwrap().as_array().map(Vec::len), Some(3));
    assert_eq!(base.invocations(), vec!["load"]);
}

#[test]
fn call_reads_the_relation() {
    let base = users();
    let relation = lazy(base.clone(), MapperRegistry::new());
    assert!(base.invocations().is_empty());

    let loaded = relation.call().unwrap();
    assert_eq!(loaded.len(), 3);
    assert_eq!(base.invocations(), vec!["load"]);
}

#[test]
fn unknown_mapper_is_a_lookup_failure() {
    let relation = lazy(users(), mappers());
    let err = relation.map_with(["names", "json"]).unwrap_err();
    assert!(matches!(
        err,
        RelationError::Lookup(LookupError::UnknownMapper { ref name }) if name == "json"
    ));
}

#[test]
fn combine_records_dependents_in_order_without_reading() {
    let base = users();
    let tasks = MemoryRelation::new("tasks", vec![json!({"title": "write", "user": "Jane"})]);
    let tags = MemoryRelation::new("tags", vec![]);

    let root = lazy(base.clone(), MapperRegistry::new());
    let graph = root.combine([
        lazy(tasks.clone(), MapperRegistry::new()),
        lazy(tags.clone(), MapperRegistry::new()),
    ]);

    assert_eq!(graph.root().name(), "users");
    assert_eq!(graph.dependent_names(), vec!["tasks", "tags"]);
    assert_eq!(graph.to_string(), "users [tasks, tags]");
    assert!(base.invocations().is_empty());
    assert!(tasks.invocations().is_empty());
    assert!(tags.invocations().is_empty());
}

#[test]
fn call_outcome_variants_are_exclusive() {
    let relation = lazy(users(), MapperRegistry::new());
    let invoked = relation.forward("count", vec![]).unwrap();
    assert!(matches!(invoked, CallOutcome::Invoked(Output::Value(_))));
    assert!(invoked.into_curried().is_none());
}
