//! Query facade: parse, look up or compile, then run.
//!
//! Every operation follows the same path. The text is parsed into an AST,
//! the AST is rendered into a [`CacheKey`] together with the element type
//! name and the mode. The key also carries the kinds the AST's chains
//! produce on the first element. The compiled artifact is fetched from the
//! [`CompileCache`] or compiled on a miss. The artifact is then invoked
//! against the caller's elements.
//!
//! ```
//! use serde_json::json;
//! use sift_lang::{CompileMode, Engine, Source, Value, convert::elements_from_json};
//!
//! let items = elements_from_json(vec![json!({"a": 1, "b": "x"})]);
//! let engine = Engine::new();
//! let rows = engine
//!     .select(&Source::new(&items), "a, b", CompileMode::DEFAULT)
//!     .unwrap()
//!     .into_vec()
//!     .unwrap();
//! assert_eq!(Value::from(rows[0].clone()).to_string(), r#"{"a":1,"b":"x"}"#);
//! ```

use std::{cmp::Ordering, sync::Arc};

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    ast::{Condition, MultiFieldSpec, Spec, ValueChain},
    cache::{CacheError, CacheKey, CompileCache},
    compiler::{
        CompileError, Compiler, InvocationError, KeyExtractor, Predicate, Projected, Projector, Row,
    },
    introspect::ElementType,
    mode::CompileMode,
    parser::{ParseError, parse_condition},
    resolver,
    selector::{parse_chain, parse_selector},
    sequence::Sequence,
    value::Value,
};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error("cached artifact for `{0}` has an unexpected type")]
    ArtifactMismatch(String),
}

impl From<CacheError> for QueryError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Compile(err) => QueryError::Compile(err),
            CacheError::ArtifactMismatch(key) => QueryError::ArtifactMismatch(key.to_string()),
        }
    }
}

/// Elements to query, with the type description they are compiled against.
#[derive(Debug, Clone)]
pub struct Source<'a> {
    element_type: ElementType,
    items: &'a [Value],
}

impl<'a> Source<'a> {
    /// A source whose element type is inferred from its first element.
    pub fn new(items: &'a [Value]) -> Self {
        Source {
            element_type: ElementType::infer(items.first()),
            items,
        }
    }

    pub fn typed(element_type: ElementType, items: &'a [Value]) -> Self {
        Source {
            element_type,
            items,
        }
    }

    pub fn element_type(&self) -> &ElementType {
        &self.element_type
    }

    pub fn items(&self) -> &'a [Value] {
        self.items
    }

    /// Cache key for `ast` under operation `op`.
    ///
    /// The AST text is followed by the sampled signature of the chains it
    /// reads, since the compiled artifact depends on both.
    fn key<'c>(
        &self,
        op: &str,
        ast: impl std::fmt::Display,
        chains: impl IntoIterator<Item = &'c ValueChain>,
        mode: CompileMode,
    ) -> CacheKey {
        let shape = resolver::signature(chains, self.items);
        CacheKey::new(
            self.element_type.name(),
            format_args!("{} {} @ {}", op, ast, shape),
            mode,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

/// Entry point for all query operations.
///
/// Cloning is cheap; clones share the cache.
#[derive(Debug, Clone)]
pub struct Engine {
    cache: Arc<CompileCache>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    /// An engine backed by the process-wide cache.
    pub fn new() -> Self {
        Engine::with_cache(CompileCache::global())
    }

    /// An engine backed by `cache`, typically a fresh one in tests.
    pub fn with_cache(cache: Arc<CompileCache>) -> Self {
        Engine { cache }
    }

    pub fn cache(&self) -> &Arc<CompileCache> {
        &self.cache
    }

    /// Project every element through `selector`.
    ///
    /// A single chain yields bare values, a field list or `*` yields rows.
    pub fn select<'a>(
        &self,
        source: &Source<'a>,
        selector: &str,
        mode: CompileMode,
    ) -> Result<Sequence<'a, Projected>, QueryError> {
        let spec = parse_selector(selector, source.element_type())?;
        self.project(source, &spec, mode)
    }

    /// Like [`select`](Self::select), but always yields rows: a single chain
    /// becomes a one-entry row keyed by its short name.
    pub fn select_rows<'a>(
        &self,
        source: &Source<'a>,
        selector: &str,
        mode: CompileMode,
    ) -> Result<Sequence<'a, Row>, QueryError> {
        let spec = match parse_selector(selector, source.element_type())? {
            Spec::Chain(chain) => {
                let mut fields = MultiFieldSpec::new();
                fields.push(chain);
                Spec::Fields(fields)
            }
            spec => spec,
        };
        let projected = self.project(source, &spec, mode)?;
        Ok(projected.map_items(|item| match item {
            Projected::Row(row) => row,
            Projected::Value(value) => {
                Row::Erased(std::iter::once(("value".to_string(), value)).collect())
            }
        }))
    }

    /// Run an already parsed projection.
    pub fn project<'a>(
        &self,
        source: &Source<'a>,
        spec: &Spec,
        mode: CompileMode,
    ) -> Result<Sequence<'a, Projected>, QueryError> {
        let key = source.key("select", spec, spec.chains(), mode);
        let projector: Projector = self.cache.get_or_compile(&key, || {
            Compiler::new(mode).projector(spec, source.items())
        })?;
        Ok(projector(source.items())?)
    }

    /// Keep the elements for which `chain` is truthy.
    pub fn where_<'a>(
        &self,
        source: &Source<'a>,
        chain: &str,
        mode: CompileMode,
    ) -> Result<Sequence<'a, &'a Value>, QueryError> {
        let condition = Condition::Chain(parse_chain(chain)?);
        self.apply(source, &condition, mode)
    }

    /// Keep the elements matching a condition such as `age >= 18`.
    ///
    /// `*` and `.*` match everything and skip compilation altogether.
    pub fn filter<'a>(
        &self,
        source: &Source<'a>,
        condition: &str,
        mode: CompileMode,
    ) -> Result<Sequence<'a, &'a Value>, QueryError> {
        let text = condition.trim();
        if text == "*" || text == ".*" {
            trace!(condition = text, "match-all filter");
            return Ok(Sequence::build(source.items().iter().map(Ok), mode.is_materialized())?);
        }
        let condition = parse_condition(text)?;
        self.apply(source, &condition, mode)
    }

    /// Run an already parsed condition.
    pub fn apply<'a>(
        &self,
        source: &Source<'a>,
        condition: &Condition,
        mode: CompileMode,
    ) -> Result<Sequence<'a, &'a Value>, QueryError> {
        let key = source.key("where", condition, condition.chains(), mode);
        let predicate: Predicate = self.cache.get_or_compile(&key, || {
            Compiler::new(mode).predicate(condition, source.items())
        })?;
        Ok(predicate(source.items())?)
    }

    /// Stable sort of the elements by the key `chain` extracts.
    pub fn order_by<'a>(
        &self,
        source: &Source<'a>,
        chain: &str,
        direction: SortDirection,
        mode: CompileMode,
    ) -> Result<Ordered<'a>, QueryError> {
        let extract = self.key_extractor(source, chain, mode)?;
        let entries = source
            .items()
            .iter()
            .map(|item| -> Result<OrderedEntry<'a>, InvocationError> {
                Ok(OrderedEntry {
                    item,
                    keys: vec![extract(item)?],
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut ordered = Ordered {
            engine: self.clone(),
            source: source.clone(),
            mode,
            directions: vec![direction],
            entries,
        };
        ordered.sort();
        Ok(ordered)
    }

    fn key_extractor(
        &self,
        source: &Source<'_>,
        chain: &str,
        mode: CompileMode,
    ) -> Result<KeyExtractor, QueryError> {
        let chain: ValueChain = parse_chain(chain)?;
        let key = source.key("key", &chain, [&chain], mode);
        Ok(self.cache.get_or_compile(&key, || {
            Compiler::new(mode).key(&chain, source.items())
        })?)
    }
}

#[derive(Debug)]
struct OrderedEntry<'a> {
    item: &'a Value,
    keys: Vec<Value>,
}

/// Elements sorted by one or more keys.
#[derive(Debug)]
pub struct Ordered<'a> {
    engine: Engine,
    source: Source<'a>,
    mode: CompileMode,
    directions: Vec<SortDirection>,
    entries: Vec<OrderedEntry<'a>>,
}

impl<'a> Ordered<'a> {
    /// Break ties of the existing order by another key.
    ///
    /// Elements equal under every key keep their relative order.
    pub fn then_by(mut self, chain: &str, direction: SortDirection) -> Result<Self, QueryError> {
        let extract = self.engine.key_extractor(&self.source, chain, self.mode)?;
        for entry in &mut self.entries {
            let key = extract(entry.item)?;
            entry.keys.push(key);
        }
        self.directions.push(direction);
        self.sort();
        Ok(self)
    }

    fn sort(&mut self) {
        let directions = &self.directions;
        debug!(keys = directions.len(), items = self.entries.len(), "sorting");
        self.entries.sort_by(|a, b| {
            directions
                .iter()
                .zip(a.keys.iter().zip(&b.keys))
                .map(|(direction, (x, y))| direction.apply(x.natural_cmp(y)))
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Value> + '_ {
        self.entries.iter().map(|entry| entry.item)
    }

    pub fn into_vec(self) -> Vec<&'a Value> {
        self.entries.into_iter().map(|entry| entry.item).collect()
    }
}
