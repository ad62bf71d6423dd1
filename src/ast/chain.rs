use std::fmt;

use crate::{output::escape_string, value::ValueKind};

/// A single hop in a value-access chain.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessStep {
    /// Member read
    ///
    /// # Example
    /// ```text
    /// x.price
    /// ```
    Field(String),

    /// Integer element read (negative counts from the end)
    ///
    /// # Example
    /// ```text
    /// x.items[0]
    /// ```
    Index(i64),

    /// Keyed element read, quoted or bare
    ///
    /// # Example
    /// ```text
    /// x.tags['color']
    /// x.tags[color]
    /// ```
    Key(String),
}

impl AccessStep {
    /// The name this step contributes to an output key, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            AccessStep::Field(name) | AccessStep::Key(name) => Some(name),
            AccessStep::Index(_) => None,
        }
    }
}

impl fmt::Display for AccessStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessStep::Field(name) => write!(f, ".{}", name),
            AccessStep::Index(n) => write!(f, "[{}]", n),
            AccessStep::Key(key) => write!(f, "['{}']", escape_string(key)),
        }
    }
}

/// An ordered sequence of access steps producing one value from an element.
///
/// An empty chain is the identity: it yields the element itself.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueChain {
    pub steps: Vec<AccessStep>,

    /// Reinterpret the element as this kind before the first hop.
    pub arg_cast: Option<ValueKind>,

    /// Coerce the final value to this kind.
    pub out_cast: Option<ValueKind>,
}

impl ValueChain {
    pub fn new(steps: Vec<AccessStep>) -> Self {
        ValueChain {
            steps,
            arg_cast: None,
            out_cast: None,
        }
    }

    /// Chain reading a single field
    pub fn field(name: impl Into<String>) -> Self {
        ValueChain::new(vec![AccessStep::Field(name.into())])
    }

    pub fn with_arg_cast(mut self, kind: ValueKind) -> Self {
        self.arg_cast = Some(kind);
        self
    }

    pub fn with_out_cast(mut self, kind: ValueKind) -> Self {
        self.out_cast = Some(kind);
        self
    }

    pub fn is_identity(&self) -> bool {
        self.steps.is_empty() && self.arg_cast.is_none() && self.out_cast.is_none()
    }

    /// Output key derived from the chain: the last named step.
    ///
    /// `x.customer.address.city` shortens to `city`, `x.tags['color']` to
    /// `color`. Chains without any named step are keyed `value`.
    pub fn short_name(&self) -> &str {
        self.steps
            .iter()
            .rev()
            .find_map(AccessStep::name)
            .unwrap_or("value")
    }
}

impl fmt::Display for ValueChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(kind) = self.arg_cast {
            write!(f, "({})", kind)?;
        }
        f.write_str("x")?;
        for step in &self.steps {
            write!(f, "{}", step)?;
        }
        if let Some(kind) = self.out_cast {
            write!(f, " as {}", kind)?;
        }
        Ok(())
    }
}
