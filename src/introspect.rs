//! Element type descriptions.
//!
//! Elements are dynamic, so "the element type" is a description carried next
//! to a source: a name (part of every cache key) and the readable field
//! names `*` expands to.

use std::fmt;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementType {
    name: String,
    fields: Vec<String>,
}

impl ElementType {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ElementType {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Describe the shape of `sample`.
    ///
    /// Records are named after their field list (`{id,price}`), so two
    /// anonymous shapes only share cached artifacts when their fields match.
    /// Scalars are named after their kind and have no fields.
    pub fn infer(sample: Option<&Value>) -> Self {
        match sample {
            Some(Value::Object(map)) => {
                let fields: Vec<String> = map.keys().cloned().collect();
                ElementType {
                    name: format!("{{{}}}", fields.join(",")),
                    fields,
                }
            }
            Some(other) => ElementType::new(other.kind().name(), Vec::<String>::new()),
            None => ElementType::new("empty", Vec::<String>::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Readable fields, in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer_record() {
        let sample = Value::from(json!({"id": 1, "price": 2}));
        let ty = ElementType::infer(Some(&sample));
        assert_eq!(ty.name(), "{id,price}");
        assert_eq!(ty.fields(), &["id".to_string(), "price".to_string()]);
    }

    #[test]
    fn test_infer_scalar_and_empty() {
        assert_eq!(ElementType::infer(Some(&Value::Integer(1))).name(), "int");
        assert!(ElementType::infer(None).fields().is_empty());
    }
}
