//! A blocking flavor of the resolver for threaded callers without a runtime.
//!
//! Semantics are identical to the async [`Resolver`](crate::Resolver): the
//! same cache state, the same expiry rules, the same single-flight guarantee.
//! Only the flight primitive differs; per-key exclusion uses a fixed set of
//! blocking striped locks, so waiting callers park their thread instead of
//! suspending a task.

use std::time::Instant;

use parking_lot::Mutex;

use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::flight::stripe_index;
use crate::store::{CacheState, CacheStatus};

/// The blocking counterpart of [`Lookup`](crate::Lookup).
pub trait Lookup: Send + Sync {
    /// The resolved value.
    type Value: Clone + Send + Sync + 'static;
    /// The lookup's own error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Performs the upstream lookup for `key`.
    fn lookup(&self, key: &str) -> Result<Option<Self::Value>, Self::Error>;
}

impl<V, E, F> Lookup for F
where
    V: Clone + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Result<Option<V>, E> + Send + Sync,
{
    type Value = V;
    type Error = E;

    fn lookup(&self, key: &str) -> Result<Option<V>, E> {
        self(key)
    }
}

/// The blocking counterpart of [`Resolver`](crate::Resolver).
pub struct Resolver<L: Lookup> {
    lookup: L,
    cache: Mutex<CacheState<L::Value>>,
    stripes: Box<[Mutex<()>]>,
}

impl<L: Lookup> Resolver<L> {
    const STRIPES: usize = 64;

    /// Creates a blocking resolver.
    pub fn new(lookup: L, config: ResolverConfig) -> Self {
        Self {
            lookup,
            cache: Mutex::new(CacheState::new(config)),
            stripes: (0..Self::STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Resolves `key`, consulting the caches first.
    ///
    /// See [`Resolver::resolve`](crate::Resolver::resolve).
    pub fn resolve(&self, key: &str) -> Result<L::Value, ResolveError<L::Error>> {
        self.resolve_inner(key, false)
    }

    /// Resolves `key` from upstream, ignoring cached results.
    ///
    /// See [`Resolver::refresh`](crate::Resolver::refresh).
    pub fn refresh(&self, key: &str) -> Result<L::Value, ResolveError<L::Error>> {
        self.resolve_inner(key, true)
    }

    fn resolve_inner(
        &self,
        raw_key: &str,
        force_refresh: bool,
    ) -> Result<L::Value, ResolveError<L::Error>> {
        let key = raw_key.trim();
        if key.is_empty() {
            return Err(ResolveError::EmptyKey);
        }

        if !force_refresh {
            match self.cache.lock().check(key, Instant::now()) {
                CacheStatus::Fresh(value) => {
                    tracing::trace!(key, "cache hit");
                    return Ok(value);
                }
                CacheStatus::Absent => {
                    tracing::trace!(key, "negative cache hit");
                    return Err(ResolveError::NotFound);
                }
                CacheStatus::Unknown => {}
            }
        }

        let _guard = self.stripes[stripe_index(key, self.stripes.len())].lock();

        // Another caller may have finished this key while we waited.
        if !force_refresh {
            match self.cache.lock().check(key, Instant::now()) {
                CacheStatus::Fresh(value) => {
                    tracing::trace!(key, "cache hit after waiting on flight");
                    return Ok(value);
                }
                CacheStatus::Absent => {
                    tracing::trace!(key, "negative cache hit after waiting on flight");
                    return Err(ResolveError::NotFound);
                }
                CacheStatus::Unknown => {}
            }
        }

        tracing::debug!(key, force_refresh, "consulting upstream lookup");
        match self.lookup.lookup(raw_key) {
            Ok(Some(value)) => {
                self.cache
                    .lock()
                    .store_value(key, value.clone(), Instant::now());
                Ok(value)
            }
            Ok(None) => {
                tracing::debug!(key, "upstream confirmed key missing");
                self.cache.lock().store_miss(key, Instant::now());
                Err(ResolveError::NotFound)
            }
            Err(error) => {
                tracing::debug!(key, "upstream lookup failed");
                self.cache.lock().store_miss(key, Instant::now());
                Err(ResolveError::Lookup(error))
            }
        }
    }
}
