//! Shared single-writer / multi-reader handle with a render cache.
//!
//! ## Cache Key Design
//!
//! Rendered exports are cached by `(generation, revision, format)`. Every
//! successful mutation through the library API bumps its revision. The
//! handle's own generation counter is bumped by [`SharedLibrary::write`] and
//! [`SharedLibrary::replace`], because the closure passed to `write` may
//! swap in a whole library whose revision count started over.
//! `replace` also clears the cache.
//!
//! A render is inserted into the cache while the library read lock is still
//! held. A writer therefore cannot slip in between computing a render and
//! caching it under the old revision.

use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{LibraryStats, TokenLibrary};
use crate::error::TokenError;
use crate::export::{render_with, ExportError, ExportFormat, ExportOptions};
use crate::types::{Edge, Role, TokenId};

/// Configuration for the render cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached renders.
    pub max_entries: usize,
    /// Whether to enable the cache.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 64,
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// A disabled cache.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Cache key for one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RenderCacheKey {
    generation: u64,
    revision: u64,
    format: ExportFormat,
}

/// Result of a cached render.
#[derive(Debug, Clone)]
pub struct RenderResult {
    /// Rendered bytes.
    pub bytes: Arc<Vec<u8>>,
    /// Whether the bytes came from the cache.
    pub cache_hit: bool,
}

/// Cache statistics.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Current number of entries in the cache.
    pub len: usize,
    /// Maximum capacity of the cache.
    pub cap: usize,
}

/// Thread-safe handle to a [`TokenLibrary`].
///
/// Clones share the same library and cache.
#[derive(Clone)]
pub struct SharedLibrary {
    inner: Arc<RwLock<TokenLibrary>>,
    /// Bumped under the write lock by `write` and `replace`.
    generation: Arc<AtomicU64>,
    options: ExportOptions,
    cache: Option<Arc<RwLock<LruCache<RenderCacheKey, Arc<Vec<u8>>>>>>,
}

impl SharedLibrary {
    /// Wrap a library with the default cache and export options.
    pub fn new(library: TokenLibrary) -> Self {
        Self::with_config(library, CacheConfig::default(), ExportOptions::default())
    }

    /// Wrap a library with explicit cache and export configuration.
    pub fn with_config(library: TokenLibrary, config: CacheConfig, options: ExportOptions) -> Self {
        let cache = if config.enabled {
            let size = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
            Some(Arc::new(RwLock::new(LruCache::new(size))))
        } else {
            None
        };
        Self {
            inner: Arc::new(RwLock::new(library)),
            generation: Arc::new(AtomicU64::new(0)),
            options,
            cache,
        }
    }

    /// Run a query under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&TokenLibrary) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run an arbitrary mutation under the write lock.
    ///
    /// Cached renders are not reused afterwards, even if the closure
    /// changed nothing.
    pub fn write<R>(&self, f: impl FnOnce(&mut TokenLibrary) -> R) -> R {
        let mut guard = self.inner.write();
        self.generation.fetch_add(1, Ordering::Relaxed);
        f(&mut guard)
    }

    /// Mutation through a library method that bumps the revision on success.
    fn mutate<R>(&self, f: impl FnOnce(&mut TokenLibrary) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Swap in a new library (e.g. the result of a fresh aggregation).
    ///
    /// Returns the previous library.
    pub fn replace(&self, library: TokenLibrary) -> TokenLibrary {
        let mut guard = self.inner.write();
        let previous = std::mem::replace(&mut *guard, library);
        self.generation.fetch_add(1, Ordering::Relaxed);
        if let Some(cache) = &self.cache {
            cache.write().clear();
        }
        tracing::info!(
            previous_batch = %previous.batch_id(),
            batch = %guard.batch_id(),
            tokens = guard.len(),
            "library replaced"
        );
        previous
    }

    /// Current revision.
    pub fn revision(&self) -> u64 {
        self.inner.read().revision()
    }

    /// Assign a role given as curator input text.
    pub fn assign_role(&self, id: &TokenId, role: &str) -> Result<(), TokenError> {
        self.mutate(|library| library.assign_role(id, role))
    }

    /// Assign a role.
    pub fn set_role(&self, id: &TokenId, role: Role) -> Result<(), TokenError> {
        self.mutate(|library| library.set_role(id, role))
    }

    /// Declare an edge.
    pub fn insert_edge(&self, edge: Edge) -> Result<(), TokenError> {
        self.mutate(|library| library.insert_edge(edge))
    }

    /// Delete a token, optionally cascading its edges.
    pub fn delete_token(&self, id: &TokenId, force: bool) -> Result<Vec<Edge>, TokenError> {
        self.mutate(|library| library.delete_token(id, force))
    }

    /// Statistics computed from the current state.
    pub fn stats(&self, top_n: usize) -> LibraryStats {
        self.read(|library| library.stats(top_n))
    }

    /// Render an export, serving it from the cache when possible.
    pub fn render(&self, format: ExportFormat) -> Result<RenderResult, ExportError> {
        let library = self.inner.read();
        let key = RenderCacheKey {
            // Writers bump the generation under the write lock we now exclude.
            generation: self.generation.load(Ordering::Relaxed),
            revision: library.revision(),
            format,
        };

        if let Some(cache) = &self.cache {
            if let Some(bytes) = cache.read().peek(&key) {
                return Ok(RenderResult {
                    bytes: Arc::clone(bytes),
                    cache_hit: true,
                });
            }
        }

        let bytes = Arc::new(render_with(&library, format, &self.options)?);

        if let Some(cache) = &self.cache {
            cache.write().put(key, Arc::clone(&bytes));
        }
        drop(library);

        Ok(RenderResult {
            bytes,
            cache_hit: false,
        })
    }

    /// Get cache statistics.
    ///
    /// Returns `None` if caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| {
            let cache = cache.read();
            CacheStats {
                len: cache.len(),
                cap: cache.cap().get(),
            }
        })
    }
}
