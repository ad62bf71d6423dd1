//! Compiles selector ASTs into native closures.
//!
//! Each [`AccessStep`] becomes a small closure specialised for its field
//! name, index or key; a chain is the composition of its steps, bracketed by
//! the optional argument and output casts. Projections, predicates and sort
//! keys are built on top of chain closures and, for projections and
//! predicates, lifted to whole-sequence transforms.
//!
//! Compiled artifacts hold no mutable state. They are `Send + Sync` and can
//! be called from any number of threads at once.

use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use thiserror::Error;
use tracing::trace;

use crate::{
    ast::{AccessStep, CompareOp, Condition, LogicalOp, MultiFieldSpec, Spec, ValueChain},
    mode::CompileMode,
    resolver,
    sequence::Sequence,
    value::{Value, ValueKind},
};

/// Runtime failure of a single value computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("index {index} is out of range for an array of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("key '{0}' not found")]
    KeyNotFound(String),

    #[error("cannot apply {step} to a {kind} value")]
    NotIndexable { kind: ValueKind, step: String },

    #[error("cannot convert a {from} value to {to}")]
    Conversion { from: ValueKind, to: ValueKind },

    #[error("cannot compare a {left} value with a {right} value")]
    Incomparable { left: ValueKind, right: ValueKind },
}

/// An [`EvalError`] raised while a compiled artifact ran, with the selector text
/// and mode it was compiled from.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("evaluating `{spec}` ({mode}): {source}")]
pub struct InvocationError {
    pub spec: Arc<str>,
    pub mode: CompileMode,
    #[source]
    pub source: EvalError,
}

#[derive(Debug, Error)]
pub enum CompileCause {
    #[error("a {from} value cannot be cast to {to}")]
    IncompatibleCast { from: ValueKind, to: ValueKind },

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("boolean combinations with `{0}` are not supported")]
    Unsupported(LogicalOp),
}

/// The spec could not be turned into a closure. Never cached.
#[derive(Debug, Error)]
#[error("cannot compile `{spec}`: {cause}")]
pub struct CompileError {
    pub spec: String,
    #[source]
    pub cause: CompileCause,
}

/// One element of a projection: a bare value or a named row.
#[derive(Debug, Clone, PartialEq)]
pub enum Projected {
    Value(Value),
    Row(Row),
}

/// Named output container of a multi-field projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Every entry is of `kind`; values were coerced on the way in.
    Typed {
        kind: ValueKind,
        entries: IndexMap<String, Value>,
    },

    /// Entries keep whatever kind their chain produced.
    Erased(IndexMap<String, Value>),
}

impl Row {
    pub fn entries(&self) -> &IndexMap<String, Value> {
        match self {
            Row::Typed { entries, .. } | Row::Erased(entries) => entries,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries().get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries().keys().map(String::as_str)
    }

    /// The uniform kind of a typed row.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Row::Typed { kind, .. } => Some(*kind),
            Row::Erased(_) => None,
        }
    }

    pub fn into_entries(self) -> IndexMap<String, Value> {
        match self {
            Row::Typed { entries, .. } | Row::Erased(entries) => entries,
        }
    }
}

impl From<Projected> for Value {
    fn from(p: Projected) -> Self {
        match p {
            Projected::Value(v) => v,
            Projected::Row(row) => Value::Object(row.into_entries()),
        }
    }
}

/// A compiled chain: element in, value out.
pub type ValueFn = Arc<dyn Fn(&Value) -> Result<Value, EvalError> + Send + Sync>;

type StepFn = Box<dyn for<'v> Fn(&'v Value) -> Result<&'v Value, EvalError> + Send + Sync>;

type ElementFn<T> = Arc<dyn Fn(&Value) -> Result<T, EvalError> + Send + Sync>;

/// Compiled projection over a whole source.
pub type Projector = Arc<
    dyn for<'a> Fn(&'a [Value]) -> Result<Sequence<'a, Projected>, InvocationError> + Send + Sync,
>;

/// Compiled filter over a whole source.
pub type Predicate = Arc<
    dyn for<'a> Fn(&'a [Value]) -> Result<Sequence<'a, &'a Value>, InvocationError> + Send + Sync,
>;

/// Compiled sort-key extraction for one element.
pub type KeyExtractor = Arc<dyn Fn(&Value) -> Result<Value, InvocationError> + Send + Sync>;

fn projector<F>(f: F) -> Projector
where
    F: for<'a> Fn(&'a [Value]) -> Result<Sequence<'a, Projected>, InvocationError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

fn predicate<F>(f: F) -> Predicate
where
    F: for<'a> Fn(&'a [Value]) -> Result<Sequence<'a, &'a Value>, InvocationError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

fn step_fn<F>(f: F) -> StepFn
where
    F: for<'v> Fn(&'v Value) -> Result<&'v Value, EvalError> + Send + Sync + 'static,
{
    Box::new(f)
}

fn array_index(arr: &[Value], index: i64) -> Result<&Value, EvalError> {
    let resolved = if index < 0 {
        arr.len().checked_sub(index.unsigned_abs() as usize)
    } else {
        Some(index as usize)
    };
    resolved
        .and_then(|i| arr.get(i))
        .ok_or(EvalError::IndexOutOfRange {
            index,
            len: arr.len(),
        })
}

/// Emit the closure for one hop.
fn emit_step(step: &AccessStep) -> StepFn {
    match step.clone() {
        // Unknown fields leave the upstream value untouched.
        AccessStep::Field(name) => step_fn(move |current| match current {
            Value::Object(map) => Ok(map.get(&name).unwrap_or(current)),
            _ => Ok(current),
        }),
        AccessStep::Index(index) => {
            let key = index.to_string();
            step_fn(move |current| match current {
                Value::Array(arr) => array_index(arr, index),
                Value::Object(map) => map.get(&key).ok_or_else(|| EvalError::KeyNotFound(key.clone())),
                other => Err(EvalError::NotIndexable {
                    kind: other.kind(),
                    step: format!("[{}]", index),
                }),
            })
        }
        AccessStep::Key(key) => {
            let as_index = key.parse::<i64>().ok();
            step_fn(move |current| match (current, as_index) {
                (Value::Object(map), _) => map.get(&key).ok_or_else(|| EvalError::KeyNotFound(key.clone())),
                (Value::Array(arr), Some(index)) => array_index(arr, index),
                (other, _) => Err(EvalError::NotIndexable {
                    kind: other.kind(),
                    step: format!("['{}']", key),
                }),
            })
        }
    }
}

fn coerce(value: &Value, kind: ValueKind) -> Result<Value, EvalError> {
    value.coerce(kind).ok_or(EvalError::Conversion {
        from: value.kind(),
        to: kind,
    })
}

/// Emit the closure for a whole chain, without any failure boundary.
pub fn emit_chain(chain: &ValueChain) -> ValueFn {
    let steps: Vec<StepFn> = chain.steps.iter().map(emit_step).collect();
    let arg_cast = chain.arg_cast;
    let out_cast = chain.out_cast;

    Arc::new(move |element: &Value| -> Result<Value, EvalError> {
        let reinterpreted;
        let mut current = match arg_cast {
            Some(kind) => {
                reinterpreted = coerce(element, kind)?;
                &reinterpreted
            }
            None => element,
        };
        for step in &steps {
            current = step(current)?;
        }
        match out_cast {
            Some(kind) => coerce(current, kind),
            None => Ok(current.clone()),
        }
    })
}

/// Wrap `f` in a failure boundary yielding `fallback` instead of an error.
fn guard<T>(f: ElementFn<T>, fallback: T, spec: Arc<str>) -> ElementFn<T>
where
    T: Clone + Send + Sync + 'static,
{
    Arc::new(move |element: &Value| -> Result<T, EvalError> {
        f(element).or_else(|err| {
            trace!(spec = %spec, error = %err, "safe mode substituted a default");
            Ok(fallback.clone())
        })
    })
}

fn invocation_context(
    spec: &Arc<str>,
    mode: CompileMode,
) -> impl Fn(EvalError) -> InvocationError + Send + Sync + 'static + use<> {
    let spec = Arc::clone(spec);
    move |source| InvocationError {
        spec: Arc::clone(&spec),
        mode,
        source,
    }
}

/// Turns ASTs into compiled artifacts for one [`CompileMode`].
///
/// `sample` is the source the artifact is compiled for. Only its first
/// element is ever read, and only to resolve output kinds; an empty sample
/// compiles the type-erased path.
#[derive(Debug, Clone, Copy)]
pub struct Compiler {
    mode: CompileMode,
}

impl Compiler {
    pub fn new(mode: CompileMode) -> Self {
        Compiler { mode }
    }

    pub fn mode(&self) -> CompileMode {
        self.mode
    }

    /// Rejects an output cast the sampled value could never satisfy.
    fn check_out_cast(&self, chain: &ValueChain, sample: &[Value]) -> Result<(), CompileCause> {
        let Some(target) = chain.out_cast else {
            return Ok(());
        };
        let uncast = ValueChain {
            out_cast: None,
            ..chain.clone()
        };
        match resolver::resolve_kind(&uncast, sample) {
            Some(from) if from != ValueKind::Null && !from.converts_to(target) => {
                Err(CompileCause::IncompatibleCast { from, to: target })
            }
            _ => Ok(()),
        }
    }

    /// Chain closure with the safe-mode boundary applied when requested.
    fn value_fn(
        &self,
        chain: &ValueChain,
        sample: &[Value],
        spec: &Arc<str>,
    ) -> Result<ValueFn, CompileCause> {
        self.check_out_cast(chain, sample)?;
        let f = emit_chain(chain);
        if !self.mode.is_safe() {
            return Ok(f);
        }
        let kind = resolver::output_kind(chain, sample);
        let fallback = kind.map(ValueKind::default_value).unwrap_or(Value::Null);
        Ok(guard(f, fallback, Arc::clone(spec)))
    }

    /// Row closure for a multi-field projection.
    ///
    /// Rows are typed when every field's output kind is the same on the
    /// sample. A later element whose values do not all coerce to that kind
    /// gets an erased row holding the values as produced.
    fn row_fn(
        &self,
        fields: &MultiFieldSpec,
        sample: &[Value],
        spec: &Arc<str>,
    ) -> Result<ElementFn<Projected>, CompileCause> {
        let kinds: Vec<Option<ValueKind>> = fields
            .fields()
            .iter()
            .map(|(_, chain)| resolver::output_kind(chain, sample))
            .collect();
        let uniform = resolver::resolve_uniform(&kinds);

        let mut compiled: Vec<(String, ValueFn)> = Vec::with_capacity(fields.len());
        for ((key, chain), kind) in fields.fields().iter().zip(&kinds) {
            self.check_out_cast(chain, sample)?;
            let f = emit_chain(chain);
            let f = if self.mode.is_safe() {
                let fallback = kind.map(ValueKind::default_value).unwrap_or(Value::Null);
                guard(f, fallback, Arc::clone(spec))
            } else {
                f
            };
            compiled.push((key.clone(), f));
        }

        Ok(Arc::new(move |element: &Value| -> Result<Projected, EvalError> {
            let mut entries = IndexMap::with_capacity(compiled.len());
            for (key, f) in &compiled {
                entries.insert(key.clone(), f(element)?);
            }
            Ok(Projected::Row(match uniform {
                Some(kind) => typed_row(kind, entries),
                None => Row::Erased(entries),
            }))
        }))
    }

    /// Compile a projection into a whole-source transform.
    pub fn projector(&self, spec: &Spec, sample: &[Value]) -> Result<Projector, CompileError> {
        let text: Arc<str> = Arc::from(spec.to_string());
        let fail = |cause| CompileError {
            spec: text.to_string(),
            cause,
        };

        let element: ElementFn<Projected> = match spec {
            Spec::Chain(chain) => {
                let f = self.value_fn(chain, sample, &text).map_err(fail)?;
                Arc::new(move |element: &Value| -> Result<Projected, EvalError> {
                    f(element).map(Projected::Value)
                })
            }
            Spec::Fields(fields) => self.row_fn(fields, sample, &text).map_err(fail)?,
            Spec::Logical(logical) => return Err(fail(CompileCause::Unsupported(logical.op))),
        };

        let materialize = self.mode.is_materialized();
        let context = Arc::new(invocation_context(&text, self.mode));
        Ok(projector(move |items: &[Value]| {
            let element = Arc::clone(&element);
            let context = Arc::clone(&context);
            let outputs = items
                .iter()
                .map(move |item| element(item).map_err(|err| context(err)));
            Sequence::build(outputs, materialize)
        }))
    }

    fn condition_fn(
        &self,
        condition: &Condition,
        sample: &[Value],
        spec: &Arc<str>,
    ) -> Result<ElementFn<bool>, CompileCause> {
        let test: ElementFn<bool> = match condition {
            Condition::Chain(chain) => {
                self.check_out_cast(chain, sample)?;
                let f = emit_chain(chain);
                Arc::new(move |element: &Value| -> Result<bool, EvalError> {
                    Ok(f(element)?.is_truthy())
                })
            }
            Condition::Compare { chain, op, literal } => {
                self.check_out_cast(chain, sample)?;
                let f = emit_chain(chain);
                compare_fn(f, *op, literal.clone())?
            }
            Condition::Logical(logical) => return Err(CompileCause::Unsupported(logical.op)),
        };

        // Failing elements never match in safe mode.
        Ok(if self.mode.is_safe() {
            guard(test, false, Arc::clone(spec))
        } else {
            test
        })
    }

    /// Compile a condition into a whole-source filter.
    pub fn predicate(&self, condition: &Condition, sample: &[Value]) -> Result<Predicate, CompileError> {
        let text: Arc<str> = Arc::from(condition.to_string());
        let test = self
            .condition_fn(condition, sample, &text)
            .map_err(|cause| CompileError {
                spec: text.to_string(),
                cause,
            })?;

        let materialize = self.mode.is_materialized();
        let context = Arc::new(invocation_context(&text, self.mode));
        Ok(predicate(move |items: &[Value]| {
            let test = Arc::clone(&test);
            let context = Arc::clone(&context);
            let kept = items.iter().filter_map(move |item| match test(item) {
                Ok(true) => Some(Ok(item)),
                Ok(false) => None,
                Err(err) => Some(Err(context(err))),
            });
            Sequence::build(kept, materialize)
        }))
    }

    /// Compile a sort-key extraction.
    pub fn key(&self, chain: &ValueChain, sample: &[Value]) -> Result<KeyExtractor, CompileError> {
        let text: Arc<str> = Arc::from(chain.to_string());
        let f = self.value_fn(chain, sample, &text).map_err(|cause| CompileError {
            spec: text.to_string(),
            cause,
        })?;
        let context = invocation_context(&text, self.mode);
        Ok(Arc::new(move |element: &Value| f(element).map_err(&context)))
    }
}

/// Coerce every entry to `kind`, or keep the row erased if any one refuses.
fn typed_row(kind: ValueKind, entries: IndexMap<String, Value>) -> Row {
    let coerced: Option<IndexMap<String, Value>> = entries
        .iter()
        .map(|(key, value)| value.coerce(kind).map(|v| (key.clone(), v)))
        .collect();
    match coerced {
        Some(coerced) => Row::Typed {
            kind,
            entries: coerced,
        },
        None => {
            trace!(%kind, "row values no longer share one kind");
            Row::Erased(entries)
        }
    }
}

fn compare_fn(f: ValueFn, op: CompareOp, literal: Value) -> Result<ElementFn<bool>, CompileCause> {
    if op == CompareOp::Matches {
        let pattern = Regex::new(&literal.as_string())?;
        return Ok(Arc::new(move |element: &Value| -> Result<bool, EvalError> {
            Ok(match f(element)? {
                Value::Null => false,
                value => pattern.is_match(&value.as_string()),
            })
        }));
    }

    Ok(Arc::new(move |element: &Value| -> Result<bool, EvalError> {
        let value = f(element)?;
        match op {
            CompareOp::Equal => Ok(value.loosely_equals(&literal)),
            CompareOp::NotEqual => Ok(!value.loosely_equals(&literal)),
            _ => ordered_compare(&value, op, &literal),
        }
    }))
}

fn ordered_compare(value: &Value, op: CompareOp, literal: &Value) -> Result<bool, EvalError> {
    if matches!(value, Value::Null) || matches!(literal, Value::Null) {
        return Ok(false);
    }
    let numeric = |v: &Value| v.as_float().is_some();
    if value.kind() != literal.kind() && !(numeric(value) && numeric(literal)) {
        return Err(EvalError::Incomparable {
            left: value.kind(),
            right: literal.kind(),
        });
    }
    let ord = value.natural_cmp(literal);
    Ok(match op {
        CompareOp::LessThan => ord.is_lt(),
        CompareOp::GreaterThan => ord.is_gt(),
        CompareOp::LessEqual => ord.is_le(),
        CompareOp::GreaterEqual => ord.is_ge(),
        CompareOp::Equal | CompareOp::NotEqual | CompareOp::Matches => false,
    })
}
