use std::fmt;

use crate::{
    ast::{CompareOp, LogicalOp, ValueChain},
    value::Value,
};

/// Named multi-field projection.
///
/// Keys are unique and keep insertion order; that order is the order the
/// compiled row emits its entries in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiFieldSpec {
    fields: Vec<(String, ValueChain)>,
}

impl MultiFieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a chain under its shortened name, returning the key it got.
    ///
    /// A name already taken gets `_1`, `_2`, ... appended, first free wins:
    /// `a.value, b.value` yields `value` and `value_1`.
    pub fn push(&mut self, chain: ValueChain) -> &str {
        let base = chain.short_name().to_string();
        self.push_named(base, chain)
    }

    /// Adds a chain under an explicit key, de-duplicated like [`push`](Self::push).
    pub fn push_named(&mut self, key: impl Into<String>, chain: ValueChain) -> &str {
        let base = key.into();
        let mut key = base.clone();
        let mut suffix = 1;
        while self.contains_key(&key) {
            key = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        self.fields.push((key, chain));
        &self.fields[self.fields.len() - 1].0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    pub fn fields(&self) -> &[(String, ValueChain)] {
        &self.fields
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for MultiFieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, chain)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", key, chain)?;
        }
        f.write_str("}")
    }
}

/// Boolean combination of conditions.
///
/// Parsed and rendered, but not compilable: the compiler rejects it with
/// `CompileError::Unsupported`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalSpec {
    pub op: LogicalOp,
    pub children: Vec<Condition>,
}

impl fmt::Display for LogicalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.op)?;
            }
            write!(f, "{}", child)?;
        }
        f.write_str(")")
    }
}

/// A predicate over one element.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Truthiness of a chain
    ///
    /// # Example
    /// ```text
    /// active
    /// ```
    Chain(ValueChain),

    /// Chain compared against a literal
    ///
    /// # Example
    /// ```text
    /// age >= 18
    /// ```
    Compare {
        chain: ValueChain,
        op: CompareOp,
        literal: Value,
    },

    /// `and` / `or` combination
    Logical(LogicalSpec),
}

impl Condition {
    /// Every chain the condition reads, left to right.
    pub fn chains(&self) -> Vec<&ValueChain> {
        match self {
            Condition::Chain(chain) | Condition::Compare { chain, .. } => vec![chain],
            Condition::Logical(spec) => spec.chains(),
        }
    }
}

impl LogicalSpec {
    pub fn chains(&self) -> Vec<&ValueChain> {
        self.children.iter().flat_map(Condition::chains).collect()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Chain(chain) => write!(f, "{}", chain),
            Condition::Compare { chain, op, literal } => write!(f, "{} {} {}", chain, op, literal),
            Condition::Logical(spec) => write!(f, "{}", spec),
        }
    }
}

/// A projection spec: what `select` compiles.
#[derive(Debug, Clone, PartialEq)]
pub enum Spec {
    /// One value per element
    Chain(ValueChain),

    /// One named row per element
    Fields(MultiFieldSpec),

    /// Boolean combination (unsupported by the compiler)
    Logical(LogicalSpec),
}

impl Spec {
    /// Every chain the projection reads, in output order.
    pub fn chains(&self) -> Vec<&ValueChain> {
        match self {
            Spec::Chain(chain) => vec![chain],
            Spec::Fields(fields) => fields.fields().iter().map(|(_, chain)| chain).collect(),
            Spec::Logical(logical) => logical.chains(),
        }
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spec::Chain(chain) => write!(f, "{}", chain),
            Spec::Fields(fields) => write!(f, "{}", fields),
            Spec::Logical(logical) => write!(f, "{}", logical),
        }
    }
}
