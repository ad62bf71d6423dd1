use std::{cmp::Ordering, fmt, str::FromStr};

use indexmap::IndexMap;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

/// A dynamic value flowing through compiled selectors.
///
/// Elements of a source are usually `Object`s (records), but any value can be
/// an element. Objects keep their field insertion order, which is the order
/// `*` enumerates fields in and the order named rows are emitted in.
///
/// # Examples
///
/// ```
/// use sift_lang::Value;
/// use indexmap::IndexMap;
///
/// let mut record = IndexMap::new();
/// record.insert("price".to_string(), Value::Integer(5));
/// record.insert("name".to_string(), Value::String("apple".to_string()));
///
/// let element = Value::Object(record);
/// assert!(element.is_truthy());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value
    Null,

    /// Boolean (true/false)
    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Floating-point number
    Float(f64),

    /// Exact decimal, produced by `as decimal` casts
    Decimal(Decimal),

    /// UTF-8 string
    String(String),

    /// Ordered list of values
    Array(Vec<Value>),

    /// Record with ordered, string-keyed fields
    Object(IndexMap<String, Value>),
}

/// The runtime type of a [`Value`].
///
/// Used by the type resolver to decide between typed and erased rows, as the
/// target of cast annotations, and to pick safe-mode default values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Float,
    Decimal,
    String,
    Array,
    Object,
}

impl ValueKind {
    /// Canonical name, as accepted by cast annotations.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "bool",
            ValueKind::Integer => "int",
            ValueKind::Float => "float",
            ValueKind::Decimal => "decimal",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }

    /// The value safe mode substitutes when a computation of this kind fails.
    pub fn default_value(self) -> Value {
        match self {
            ValueKind::Null => Value::Null,
            ValueKind::Boolean => Value::Boolean(false),
            ValueKind::Integer => Value::Integer(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Decimal => Value::Decimal(Decimal::ZERO),
            ValueKind::String => Value::String(String::new()),
            ValueKind::Array => Value::Array(Vec::new()),
            ValueKind::Object => Value::Object(IndexMap::new()),
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Float | ValueKind::Decimal)
    }

    /// Whether a value of kind `self` can ever be coerced to `target`.
    ///
    /// This is the static half of coercion; [`Value::coerce`] may still fail
    /// on a particular value (for example a non-numeric string to `int`).
    pub fn converts_to(self, target: ValueKind) -> bool {
        if self == target {
            return true;
        }
        match target {
            ValueKind::Null => false,
            ValueKind::String => !matches!(self, ValueKind::Null),
            ValueKind::Boolean | ValueKind::Integer | ValueKind::Float | ValueKind::Decimal => {
                self.is_numeric() || matches!(self, ValueKind::Boolean | ValueKind::String)
            }
            ValueKind::Array | ValueKind::Object => self == ValueKind::String,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "null" => Ok(ValueKind::Null),
            "bool" | "boolean" => Ok(ValueKind::Boolean),
            "int" | "integer" | "long" => Ok(ValueKind::Integer),
            "float" | "double" => Ok(ValueKind::Float),
            "decimal" => Ok(ValueKind::Decimal),
            "string" | "str" => Ok(ValueKind::String),
            "array" | "list" => Ok(ValueKind::Array),
            "object" | "record" => Ok(ValueKind::Object),
            other => Err(format!("unknown type name '{}'", other)),
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Check if the value is truthy (for predicates)
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Null => false,
            Boolean(b) => *b,
            Integer(n) => *n != 0,
            Float(n) => *n != 0.0,
            Decimal(d) => !d.is_zero(),
            String(s) => !s.is_empty(),
            Array(arr) => !arr.is_empty(),
            Object(obj) => !obj.is_empty(),
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(n) if n.is_finite() => Some(n.round() as i64),
            Value::Decimal(d) => d.round().to_i64(),
            _ => None,
        }
    }

    /// Get as decimal, widening integers and floats
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(n) => Some(Decimal::from(*n)),
            Value::Float(n) => Decimal::from_f64(*n),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Get as string (scalars render bare, containers render as JSON)
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Attempt an ordinary conversion to `target`.
    ///
    /// Returns `None` when the value has no sensible representation in the
    /// target kind. Strings holding JSON text are reinterpreted as arrays or
    /// objects.
    pub fn coerce(&self, target: ValueKind) -> Option<Value> {
        if self.kind() == target {
            return Some(self.clone());
        }
        match (target, self) {
            (ValueKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },
            (ValueKind::Boolean, v) if v.kind().is_numeric() => Some(Value::Boolean(v.is_truthy())),
            (ValueKind::Integer, Value::Boolean(b)) => Some(Value::Integer(*b as i64)),
            (ValueKind::Integer, Value::String(s)) => s.trim().parse().ok().map(Value::Integer),
            (ValueKind::Integer, v) => v.as_int().map(Value::Integer),
            (ValueKind::Float, Value::Boolean(b)) => Some(Value::Float(if *b { 1.0 } else { 0.0 })),
            (ValueKind::Float, Value::String(s)) => s.trim().parse().ok().map(Value::Float),
            (ValueKind::Float, v) => v.as_float().map(Value::Float),
            (ValueKind::Decimal, Value::Boolean(b)) => Some(Value::Decimal(Decimal::from(*b as i64))),
            (ValueKind::Decimal, Value::String(s)) => {
                Decimal::from_str(s.trim()).ok().map(Value::Decimal)
            }
            (ValueKind::Decimal, v) => v.as_decimal().map(Value::Decimal),
            (ValueKind::String, Value::Null) => None,
            (ValueKind::String, v) => Some(Value::String(v.as_string())),
            (ValueKind::Array | ValueKind::Object, Value::String(s)) => {
                let parsed: serde_json::Value = serde_json::from_str(s).ok()?;
                let value = Value::from(parsed);
                (value.kind() == target).then_some(value)
            }
            _ => None,
        }
    }

    /// Loose equality used by `==`/`!=` conditions: numbers compare by value
    /// regardless of representation.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        if self.kind().is_numeric() && other.kind().is_numeric() {
            return compare_numbers(self, other) == Ordering::Equal;
        }
        self == other
    }

    /// Total natural ordering used for sort keys.
    ///
    /// Kinds rank Null < Boolean < numbers < String < Array < Object; numbers
    /// of different representations compare numerically.
    pub fn natural_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.natural_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Object(a), Value::Object(b)) => a.len().cmp(&b.len()),
            (a, b) if a.kind().is_numeric() && b.kind().is_numeric() => compare_numbers(a, b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Integer(_) | Value::Float(_) | Value::Decimal(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_numbers(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
        (Value::Decimal(_), _) | (_, Value::Decimal(_)) => match (a.as_decimal(), b.as_decimal()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => float_cmp(a, b),
        },
        _ => float_cmp(a, b),
    }
}

fn float_cmp(a: &Value, b: &Value) -> Ordering {
    let x = a.as_float().unwrap_or(f64::NAN);
    let y = b.as_float().unwrap_or(f64::NAN);
    x.partial_cmp(&y).unwrap_or_else(|| x.is_nan().cmp(&y.is_nan()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Integer(0).is_truthy());
        assert!(Value::Integer(-1).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(Value::Decimal(Decimal::ONE).is_truthy());
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(Value::Float(2.6).coerce(ValueKind::Integer), Some(Value::Integer(3)));
        assert_eq!(
            Value::String(" 42 ".into()).coerce(ValueKind::Integer),
            Some(Value::Integer(42))
        );
        assert_eq!(
            Value::Integer(7).coerce(ValueKind::Decimal),
            Some(Value::Decimal(Decimal::from(7)))
        );
        assert_eq!(Value::String("abc".into()).coerce(ValueKind::Float), None);
    }

    #[test]
    fn test_coerce_json_string_to_object() {
        let v = Value::String(r#"{"id": 3}"#.into()).coerce(ValueKind::Object);
        match v {
            Some(Value::Object(map)) => assert_eq!(map.get("id"), Some(&Value::Integer(3))),
            other => panic!("expected object, got {:?}", other),
        }
        assert_eq!(Value::String("[1]".into()).coerce(ValueKind::Object), None);
    }

    #[test]
    fn test_natural_ordering_across_kinds() {
        assert_eq!(Value::Null.natural_cmp(&Value::Boolean(false)), Ordering::Less);
        assert_eq!(Value::Integer(2).natural_cmp(&Value::Float(1.5)), Ordering::Greater);
        assert_eq!(
            Value::Decimal(Decimal::new(15, 1)).natural_cmp(&Value::Float(1.5)),
            Ordering::Equal
        );
        assert_eq!(Value::Integer(99).natural_cmp(&Value::String("a".into())), Ordering::Less);
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Integer(1).loosely_equals(&Value::Float(1.0)));
        assert!(!Value::Integer(1).loosely_equals(&Value::String("1".into())));
    }

    #[test]
    fn test_kind_names_round_trip() {
        assert_eq!("Integer".parse::<ValueKind>(), Ok(ValueKind::Integer));
        assert_eq!("double".parse::<ValueKind>(), Ok(ValueKind::Float));
        assert!("money".parse::<ValueKind>().is_err());
    }

    #[test]
    fn test_converts_to() {
        assert!(ValueKind::Integer.converts_to(ValueKind::Decimal));
        assert!(ValueKind::String.converts_to(ValueKind::Object));
        assert!(!ValueKind::Array.converts_to(ValueKind::Integer));
    }
}
