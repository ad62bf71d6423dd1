//! Execute sift queries against JSON input

use tracing::debug;

use super::CliError;
use crate::{CompileMode, ElementType, Engine, QueryError, SortDirection, Source, Value};

/// The query to run.
#[derive(Debug, Clone)]
pub enum Operation {
    Select { selector: String },
    Where { chain: String },
    Order {
        chain: String,
        direction: SortDirection,
        then: Vec<(String, SortDirection)>,
    },
    Filter { condition: String },
}

/// Options for a single run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub operation: Operation,
    /// JSON input string
    pub input: Option<String>,
    pub mode: CompileMode,
    /// Element type name to compile against instead of the inferred one
    pub type_name: Option<String>,
}

/// Split `chain[:asc|:desc]` into the chain and its direction.
pub fn parse_then(text: &str) -> (String, SortDirection) {
    match text.rsplit_once(':') {
        Some((chain, "desc")) => (chain.to_string(), SortDirection::Descending),
        Some((chain, "asc")) => (chain.to_string(), SortDirection::Ascending),
        _ => (text.to_string(), SortDirection::Ascending),
    }
}

/// A JSON array is the element list; anything else is a single element.
fn elements(document: serde_json::Value) -> Vec<Value> {
    match document {
        serde_json::Value::Array(items) => crate::convert::elements_from_json(items),
        other => vec![Value::from(other)],
    }
}

/// Run the operation and return its output as an array value.
///
/// Render it with [`crate::output::to_json`] or
/// [`crate::output::to_json_pretty`].
pub fn execute(options: &RunOptions) -> Result<Value, CliError> {
    execute_with(&Engine::new(), options)
}

pub fn execute_with(engine: &Engine, options: &RunOptions) -> Result<Value, CliError> {
    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;
    let items = elements(serde_json::from_str(json_str)?);

    let source = match &options.type_name {
        Some(name) => {
            let inferred = ElementType::infer(items.first());
            Source::typed(ElementType::new(name.as_str(), inferred.fields().to_vec()), &items)
        }
        None => Source::new(&items),
    };
    debug!(element_type = %source.element_type(), items = items.len(), mode = %options.mode, "running query");

    let mode = options.mode;
    let output: Vec<Value> = match &options.operation {
        Operation::Select { selector } => engine
            .select(&source, selector, mode)?
            .map_items(Value::from)
            .into_vec()
            .map_err(QueryError::from)?,
        Operation::Where { chain } => engine
            .where_(&source, chain, mode)?
            .map_items(Value::clone)
            .into_vec()
            .map_err(QueryError::from)?,
        Operation::Filter { condition } => engine
            .filter(&source, condition, mode)?
            .map_items(Value::clone)
            .into_vec()
            .map_err(QueryError::from)?,
        Operation::Order {
            chain,
            direction,
            then,
        } => {
            let mut ordered = engine.order_by(&source, chain, *direction, mode)?;
            for (chain, direction) in then {
                ordered = ordered.then_by(chain, *direction)?;
            }
            ordered.into_vec().into_iter().cloned().collect()
        }
    };

    Ok(Value::Array(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CompileCache;
    use crate::output::{to_json, to_json_pretty};
    use serde_json::json;
    use std::sync::Arc;

    fn output(operation: Operation, input: &str) -> Value {
        let engine = Engine::with_cache(Arc::new(CompileCache::new()));
        let options = RunOptions {
            operation,
            input: Some(input.to_string()),
            mode: CompileMode::DEFAULT,
            type_name: None,
        };
        execute_with(&engine, &options).unwrap()
    }

    fn run(operation: Operation, input: &str) -> serde_json::Value {
        serde_json::Value::from(output(operation, input))
    }

    #[test]
    fn test_parse_then() {
        assert_eq!(parse_then("id"), ("id".to_string(), SortDirection::Ascending));
        assert_eq!(parse_then("id:desc"), ("id".to_string(), SortDirection::Descending));
        assert_eq!(parse_then("a['x:y']"), ("a['x:y']".to_string(), SortDirection::Ascending));
    }

    #[test]
    fn test_single_object_is_one_element() {
        let output = run(
            Operation::Select {
                selector: "a".into(),
            },
            r#"{"a": 3}"#,
        );
        assert_eq!(output, json!([3]));
    }

    #[test]
    fn test_order_with_then() {
        let output = run(
            Operation::Order {
                chain: "price".into(),
                direction: SortDirection::Descending,
                then: vec![parse_then("id:asc")],
            },
            r#"[{"price":1,"id":2},{"price":1,"id":1},{"price":0,"id":5}]"#,
        );
        assert_eq!(
            output,
            json!([{"price":1,"id":1},{"price":1,"id":2},{"price":0,"id":5}])
        );
    }

    #[test]
    fn test_pretty_output_keeps_selector_order() {
        let rows = output(
            Operation::Select {
                selector: "b, a".into(),
            },
            r#"[{"a": 1.50, "b": "x"}]"#,
        );
        assert_eq!(
            to_json_pretty(&rows),
            "[\n  {\n    \"b\": \"x\",\n    \"a\": 1.5\n  }\n]"
        );
        assert_eq!(to_json(&rows), r#"[{"b":"x","a":1.5}]"#);
    }

    #[test]
    fn test_no_input() {
        let options = RunOptions {
            operation: Operation::Filter {
                condition: "*".into(),
            },
            input: None,
            mode: CompileMode::DEFAULT,
            type_name: None,
        };
        assert!(matches!(execute(&options), Err(CliError::NoInput)));
    }
}
