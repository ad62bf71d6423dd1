//! Process-wide cache of compiled artifacts.
//!
//! Artifacts are stored type-erased and downcast by the caller to the
//! closure type it compiled. Keys are textual signatures, so two specs that
//! render identically share one artifact. There is no eviction: the key
//! space is bounded by the distinct selectors and record shapes calling
//! code uses.

use std::{
    any::Any,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use dashmap::DashMap;
use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{compiler::CompileError, mode::CompileMode};

/// Canonical signature of a compiled artifact: element type name, rendered
/// AST and compile mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(type_name: &str, ast: impl fmt::Display, mode: CompileMode) -> Self {
        CacheKey(format!("{}|{}|{}", type_name, ast, mode))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("artifact cached under `{0}` is not of the requested type")]
    ArtifactMismatch(CacheKey),
}

type Artifact = Arc<dyn Any + Send + Sync>;

static GLOBAL_CACHE: Lazy<Arc<CompileCache>> = Lazy::new(|| Arc::new(CompileCache::new()));

/// Memoizing map from [`CacheKey`] to compiled artifact.
///
/// Lookups never block each other. Two threads missing on the same key may
/// both compile; the later insert wins, which is harmless because compiles
/// of one key are behaviourally identical. Failed compiles are not stored.
#[derive(Default)]
pub struct CompileCache {
    artifacts: DashMap<CacheKey, Artifact>,
    compiles: AtomicUsize,
    hits: AtomicUsize,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance.
    pub fn global() -> Arc<CompileCache> {
        Arc::clone(&GLOBAL_CACHE)
    }

    /// Return the artifact stored under `key`, compiling and storing it on a
    /// miss.
    pub fn get_or_compile<A, F>(&self, key: &CacheKey, compile: F) -> Result<A, CacheError>
    where
        A: Any + Clone + Send + Sync,
        F: FnOnce() -> Result<A, CompileError>,
    {
        if let Some(entry) = self.artifacts.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "compiled artifact cache hit");
            return entry
                .value()
                .downcast_ref::<A>()
                .cloned()
                .ok_or_else(|| CacheError::ArtifactMismatch(key.clone()));
        }

        debug!(key = %key, "compiling");
        let artifact = compile().inspect_err(|err| warn!(key = %key, error = %err, "compile failed"))?;
        self.compiles.fetch_add(1, Ordering::Relaxed);
        self.artifacts.insert(key.clone(), Arc::new(artifact.clone()));
        Ok(artifact)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.artifacts.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Number of successful compiles so far.
    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::Relaxed)
    }

    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Drop every artifact. Counters are kept.
    pub fn clear(&self) {
        self.artifacts.clear();
    }
}

impl fmt::Debug for CompileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileCache")
            .field("artifacts", &self.len())
            .field("compiles", &self.compile_count())
            .field("hits", &self.hit_count())
            .finish()
    }
}
