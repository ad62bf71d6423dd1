use serde_json::json;
use sift_lang::{
    CompileCache, CompileMode, ElementType, Engine, Projected, QueryError, Row, SortDirection,
    Source, Value, ValueKind, compiler::CompileCause, convert::elements_from_json,
};
use std::sync::Arc;

fn engine() -> Engine {
    Engine::with_cache(Arc::new(CompileCache::new()))
}

fn items(values: Vec<serde_json::Value>) -> Vec<Value> {
    elements_from_json(values)
}

fn select(engine: &Engine, items: &[Value], selector: &str, mode: CompileMode) -> Vec<Projected> {
    engine
        .select(&Source::new(items), selector, mode)
        .unwrap()
        .into_vec()
        .unwrap()
}

fn as_json(values: Vec<&Value>) -> serde_json::Value {
    serde_json::Value::Array(values.into_iter().cloned().map(serde_json::Value::from).collect())
}

// ============================================================================
// Projection
// ============================================================================

#[test]
fn test_select_single_field() {
    let items = items(vec![json!({"prop": 5})]);
    let output = select(&engine(), &items, "prop", CompileMode::DEFAULT);
    assert_eq!(output, vec![Projected::Value(Value::Integer(5))]);
}

#[test]
fn test_select_fields_keeps_key_order() {
    let items = items(vec![json!({"b": "x", "a": 1})]);
    let output = select(&engine(), &items, "a,b", CompileMode::DEFAULT);
    match &output[0] {
        Projected::Row(row) => {
            assert_eq!(row.keys().collect::<Vec<_>>(), vec!["a", "b"]);
            assert_eq!(row.get("a"), Some(&Value::Integer(1)));
            assert_eq!(row.get("b"), Some(&Value::String("x".into())));
            assert_eq!(row.kind(), None);
        }
        other => panic!("expected a row, got {:?}", other),
    }
}

#[test]
fn test_select_colliding_keys() {
    let items = items(vec![json!({"a": {"value": 1}, "b": {"value": 2}})]);
    let output = select(&engine(), &items, "a.value, b.value", CompileMode::DEFAULT);
    assert_eq!(
        Value::from(output[0].clone()).to_string(),
        r#"{"value":1,"value_1":2}"#
    );
}

#[test]
fn test_select_uniform_fields_are_typed() {
    let items = items(vec![json!({"a": 1, "b": 2}), json!({"a": "3", "b": 4})]);
    let output = select(&engine(), &items, "a, b", CompileMode::DEFAULT);
    match &output[1] {
        Projected::Row(Row::Typed { kind, entries }) => {
            assert_eq!(*kind, ValueKind::Integer);
            // coerced from the string "3"
            assert_eq!(entries.get("a"), Some(&Value::Integer(3)));
        }
        other => panic!("expected a typed row, got {:?}", other),
    }
}

#[test]
fn test_select_star_uses_element_type() {
    let items = items(vec![json!({"id": 1, "price": 9})]);
    let engine = engine();
    let source = Source::typed(ElementType::new("Order", ["price"]), &items);
    let output = engine
        .select(&source, "*", CompileMode::DEFAULT)
        .unwrap()
        .into_vec()
        .unwrap();
    assert_eq!(Value::from(output[0].clone()).to_string(), r#"{"price":9}"#);
    assert!(engine.cache().contains(&sift_lang::CacheKey::new(
        "Order",
        "select {price: x.price} @ int",
        CompileMode::DEFAULT
    )));
}

#[test]
fn test_select_missing_field_is_noop() {
    let items = items(vec![json!({"prop": {"a": 1}})]);
    let output = select(&engine(), &items, "prop.prop2", CompileMode::DEFAULT);
    assert_eq!(Value::from(output[0].clone()).to_string(), r#"{"a":1}"#);
}

#[test]
fn test_select_casts() {
    let items = items(vec![json!({"price": "10.50", "n": 3})]);
    let output = select(&engine(), &items, "price as decimal", CompileMode::DEFAULT);
    assert_eq!(
        output[0],
        Projected::Value(Value::Decimal(rust_decimal::Decimal::new(1050, 2)))
    );

    let output = select(&engine(), &items, "n as string", CompileMode::DEFAULT);
    assert_eq!(output[0], Projected::Value(Value::String("3".into())));

    let encoded = vec![Value::String(r#"{"id": 4}"#.into())];
    let output = select(&engine(), &encoded, "(object)id", CompileMode::DEFAULT);
    assert_eq!(output[0], Projected::Value(Value::Integer(4)));
}

#[test]
fn test_select_incompatible_cast_is_compile_error() {
    let items = items(vec![json!({"tags": [1, 2]})]);
    let engine = engine();
    let result = engine.select(&Source::new(&items), "tags as int", CompileMode::DEFAULT);
    match result {
        Err(QueryError::Compile(err)) => {
            assert!(matches!(err.cause, CompileCause::IncompatibleCast { .. }));
        }
        other => panic!("expected a compile error, got {:?}", other.map(|_| ())),
    }
    assert!(engine.cache().is_empty());
}

#[test]
fn test_rows_follow_the_source_they_run_on() {
    let numbers = items(vec![json!({"a": 1, "b": 2})]);
    let words = items(vec![json!({"a": "x", "b": "y"})]);
    let warm = engine();
    select(&warm, &numbers, "a, b", CompileMode::DEFAULT);

    // Same element type name, different field kinds.
    let reused = select(&warm, &words, "a, b", CompileMode::DEFAULT);
    let fresh = select(&engine(), &words, "a, b", CompileMode::DEFAULT);
    assert_eq!(reused, fresh);
    match &reused[0] {
        Projected::Row(Row::Typed { kind, .. }) => assert_eq!(*kind, ValueKind::String),
        other => panic!("expected a typed row, got {:?}", other),
    }
    assert_eq!(warm.cache().len(), 2);
}

#[test]
fn test_row_that_stops_coercing_is_erased() {
    let items = items(vec![json!({"a": 1, "b": 2}), json!({"a": "x", "b": 3})]);
    let output = select(&engine(), &items, "a, b", CompileMode::DEFAULT);
    assert!(matches!(&output[0], Projected::Row(Row::Typed { .. })));
    match &output[1] {
        Projected::Row(Row::Erased(entries)) => {
            assert_eq!(entries.get("a"), Some(&Value::String("x".into())));
            assert_eq!(entries.get("b"), Some(&Value::Integer(3)));
        }
        other => panic!("expected an erased row, got {:?}", other),
    }
}

#[test]
fn test_safe_defaults_follow_the_source_they_run_on() {
    let numbers = items(vec![json!({"tags": [1, 2]})]);
    let words = items(vec![json!({"tags": ["a", "b"]}), json!({"tags": ["c"]})]);
    let warm = engine();
    select(&warm, &numbers, "tags[1]", CompileMode::SAFE);

    let output = select(&warm, &words, "tags[1]", CompileMode::SAFE);
    assert_eq!(
        output,
        vec![
            Projected::Value(Value::String("b".into())),
            Projected::Value(Value::String(String::new())),
        ]
    );
}

// ============================================================================
// Modes
// ============================================================================

#[test]
fn test_lazy_failure_surfaces_per_item() {
    let items = items(vec![json!({"tags": [1, 2]}), json!({"tags": [5]})]);
    let mut output = engine()
        .select(&Source::new(&items), "tags[1]", CompileMode::DEFAULT)
        .unwrap();
    assert!(!output.is_materialized());
    assert_eq!(output.next(), Some(Ok(Projected::Value(Value::Integer(2)))));
    let err = output.next().unwrap().unwrap_err();
    assert_eq!(&*err.spec, "x.tags[1]");
    assert_eq!(err.mode, CompileMode::DEFAULT);
    assert_eq!(
        err.to_string(),
        "evaluating `x.tags[1]` (Default): index 1 is out of range for an array of length 1"
    );
}

#[test]
fn test_materialized_failure_surfaces_immediately() {
    let items = items(vec![json!({"tags": [1, 2]}), json!({"tags": [5]})]);
    let result = engine().select(&Source::new(&items), "tags[1]", CompileMode::MATERIALIZE);
    assert!(matches!(result, Err(QueryError::Invocation(_))));
}

#[test]
fn test_materialized_output() {
    let items = items(vec![json!({"a": 1}), json!({"a": 2})]);
    let output = engine()
        .select(&Source::new(&items), "a", CompileMode::MATERIALIZE)
        .unwrap();
    assert!(output.is_materialized());
    assert_eq!(output.as_slice().map(<[_]>::len), Some(2));
}

#[test]
fn test_safe_mode_substitutes_defaults() {
    let items = items(vec![
        json!({"tags": [1, 2]}),
        json!({"tags": [5]}),
        json!({"tags": [0, 3]}),
    ]);
    let output = select(&engine(), &items, "tags[1]", CompileMode::MATERIALIZE_SAFE);
    assert_eq!(
        output,
        vec![
            Projected::Value(Value::Integer(2)),
            Projected::Value(Value::Integer(0)),
            Projected::Value(Value::Integer(3)),
        ]
    );
}

#[test]
fn test_safe_mode_unknown_kind_defaults_to_null() {
    let items = items(vec![json!({"a": 1, "b": []})]);
    let output = select(&engine(), &items, "a, b[5]", CompileMode::SAFE);
    assert_eq!(Value::from(output[0].clone()).to_string(), r#"{"a":1,"b":null}"#);
}

// ============================================================================
// Predicates
// ============================================================================

#[test]
fn test_where_truthiness() {
    let items = items(vec![json!({"age": 0}), json!({"age": 1})]);
    let kept: Vec<&Value> = engine()
        .where_(&Source::new(&items), "age", CompileMode::DEFAULT)
        .unwrap()
        .into_vec()
        .unwrap();
    assert_eq!(as_json(kept), json!([{"age": 1}]));
}

#[test]
fn test_where_safe_excludes_failing_elements() {
    let items = items(vec![
        json!({"tags": [1, 2]}),
        json!({"tags": [5]}),
        json!({"tags": [0, 3]}),
    ]);
    let engine = engine();
    let source = Source::new(&items);

    let strict = engine.where_(&source, "tags[1]", CompileMode::DEFAULT).unwrap().into_vec();
    assert!(strict.is_err());

    let kept = engine
        .where_(&source, "tags[1]", CompileMode::SAFE)
        .unwrap()
        .into_vec()
        .unwrap();
    assert_eq!(as_json(kept), json!([{"tags": [1, 2]}, {"tags": [0, 3]}]));
}

#[test]
fn test_where_incompatible_cast_is_compile_error() {
    let items = items(vec![json!({"tags": [1]})]);
    let engine = engine();
    match engine.where_(&Source::new(&items), "tags as int", CompileMode::DEFAULT) {
        Err(QueryError::Compile(err)) => {
            assert_eq!(err.spec, "x.tags as int");
            assert!(matches!(err.cause, CompileCause::IncompatibleCast { .. }));
        }
        other => panic!("expected a compile error, got {:?}", other.map(|_| ())),
    }
    assert!(engine.cache().is_empty());
}

#[test]
fn test_filter_conditions() {
    let items = items(vec![
        json!({"name": "Alice", "age": 30}),
        json!({"name": "Bob", "age": 17}),
        json!({"name": "Anna", "age": 18}),
    ]);
    let engine = engine();
    let source = Source::new(&items);
    let run = |condition: &str| {
        as_json(
            engine
                .filter(&source, condition, CompileMode::DEFAULT)
                .unwrap()
                .into_vec()
                .unwrap(),
        )
    };

    assert_eq!(
        run("age >= 18"),
        json!([{"name": "Alice", "age": 30}, {"name": "Anna", "age": 18}])
    );
    assert_eq!(run("x.name == \"Bob\""), json!([{"name": "Bob", "age": 17}]));
    assert_eq!(run("name =~ \"^An\""), json!([{"name": "Anna", "age": 18}]));
    assert_eq!(run("(age != 30)").as_array().map(Vec::len), Some(2));
}

#[test]
fn test_filter_match_all_skips_compiler() {
    let items = items(vec![json!({"a": 1}), json!({"a": 0})]);
    let engine = engine();
    let source = Source::new(&items);
    for condition in ["*", ".*", " * "] {
        let kept = engine
            .filter(&source, condition, CompileMode::DEFAULT)
            .unwrap()
            .into_vec()
            .unwrap();
        assert_eq!(kept.len(), 2);
        assert!(std::ptr::eq(kept[0], &items[0]));
    }
    assert_eq!(engine.cache().compile_count(), 0);
    assert!(engine.cache().is_empty());
}

#[test]
fn test_filter_logical_is_unsupported() {
    let items = items(vec![json!({"a": 1, "b": 2})]);
    let engine = engine();
    let result = engine.filter(&Source::new(&items), "a and b > 1", CompileMode::DEFAULT);
    match result {
        Err(QueryError::Compile(err)) => {
            assert_eq!(err.spec, "(x.a and x.b > 1)");
            assert!(matches!(err.cause, CompileCause::Unsupported(_)));
        }
        other => panic!("expected unsupported, got {:?}", other.map(|_| ())),
    }
    assert!(engine.cache().is_empty());
}

#[test]
fn test_filter_incomparable_values() {
    let items = items(vec![json!({"name": "x"})]);
    let engine = engine();
    let source = Source::new(&items);
    let err = engine
        .filter(&source, "name > 3", CompileMode::DEFAULT)
        .unwrap()
        .into_vec()
        .unwrap_err();
    assert_eq!(&*err.spec, "x.name > 3");

    let kept = engine
        .filter(&source, "name > 3", CompileMode::SAFE)
        .unwrap()
        .into_vec()
        .unwrap();
    assert!(kept.is_empty());
}

#[test]
fn test_filter_parse_error() {
    let items = items(vec![json!({"a": 1})]);
    let result = engine().filter(&Source::new(&items), "a ==", CompileMode::DEFAULT);
    assert!(matches!(result, Err(QueryError::Parse(_))));
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_order_by_then_by() {
    let items = items(vec![
        json!({"price": 1, "id": 2}),
        json!({"price": 1, "id": 1}),
        json!({"price": 0, "id": 5}),
    ]);
    let ordered = engine()
        .order_by(&Source::new(&items), "price", SortDirection::Descending, CompileMode::DEFAULT)
        .unwrap()
        .then_by("id", SortDirection::Ascending)
        .unwrap();
    assert_eq!(
        as_json(ordered.into_vec()),
        json!([{"price": 1, "id": 1}, {"price": 1, "id": 2}, {"price": 0, "id": 5}])
    );
}

#[test]
fn test_then_by_keeps_order_of_full_ties() {
    let items = items(vec![
        json!({"g": "b", "n": 1, "tag": "first"}),
        json!({"g": "a", "n": 1, "tag": "second"}),
        json!({"g": "b", "n": 1, "tag": "third"}),
    ]);
    let ordered = engine()
        .order_by(&Source::new(&items), "g", SortDirection::Ascending, CompileMode::DEFAULT)
        .unwrap()
        .then_by("n", SortDirection::Descending)
        .unwrap();
    let tags: Vec<String> = ordered
        .iter()
        .map(|v| match v {
            Value::Object(map) => map["tag"].as_string(),
            other => panic!("expected a record, got {:?}", other),
        })
        .collect();
    assert_eq!(tags, vec!["second", "first", "third"]);
}

#[test]
fn test_order_by_mixed_numbers() {
    let items = items(vec![json!({"v": 2.5}), json!({"v": 1}), json!({"v": 3})]);
    let ordered = engine()
        .order_by(&Source::new(&items), "v", SortDirection::Ascending, CompileMode::DEFAULT)
        .unwrap();
    assert_eq!(as_json(ordered.into_vec()), json!([{"v": 1}, {"v": 2.5}, {"v": 3}]));
}

#[test]
fn test_order_by_key_failure() {
    let items = items(vec![json!({"k": [2]}), json!({"k": []}), json!({"k": [1]})]);
    let engine = engine();
    let source = Source::new(&items);

    let strict = engine.order_by(&source, "k[0]", SortDirection::Ascending, CompileMode::DEFAULT);
    assert!(matches!(strict, Err(QueryError::Invocation(_))));

    let ordered = engine
        .order_by(&source, "k[0]", SortDirection::Ascending, CompileMode::SAFE)
        .unwrap();
    assert_eq!(as_json(ordered.into_vec()), json!([{"k": []}, {"k": [1]}, {"k": [2]}]));
}
