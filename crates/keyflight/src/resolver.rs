use std::future::Future;
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::flight::{KeyLock, StripedLock};
use crate::store::{CacheState, CacheStatus};

/// The upstream operation being memoized.
///
/// The lookup is expected to be idempotent and is typically expensive, like a
/// network call translating a user-visible name into a stable identifier.
/// Returning `Ok(None)` means the key is confirmed to not exist; any `Err` is
/// treated as a transient failure and handed back to the caller.
pub trait Lookup: Send + Sync {
    /// The resolved value.
    type Value: Clone + Send + Sync + 'static;
    /// The lookup's own error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Performs the upstream lookup for `key`.
    fn lookup(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Self::Value>, Self::Error>> + Send;
}

impl<V, E, Fut, F> Lookup for F
where
    V: Clone + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<V>, E>> + Send,
    F: Fn(&str) -> Fut + Send + Sync,
{
    type Value = V;
    type Error = E;

    fn lookup(&self, key: &str) -> impl Future<Output = Result<Option<V>, E>> + Send {
        self(key)
    }
}

/// A memoizing, deduplicating front for an expensive keyed [`Lookup`].
///
/// Successful results are cached for [`time_to_live`], confirmed misses for
/// [`retry_misses_after`], both expiring lazily on read. Concurrent calls for
/// the same key are collapsed into a single upstream lookup: one caller
/// performs it while the others wait on the per-key lock and then read its
/// freshly stored result from the cache.
///
/// The resolver owns all of its state and is meant to be created once and
/// shared (e.g. in an `Arc`) by everything that needs the translation.
///
/// [`time_to_live`]: ResolverConfig::time_to_live
/// [`retry_misses_after`]: ResolverConfig::retry_misses_after
pub struct Resolver<L: Lookup, F = StripedLock> {
    lookup: L,
    cache: Mutex<CacheState<L::Value>>,
    flights: F,
}

impl<L: Lookup> Resolver<L> {
    /// Creates a resolver with the default [`StripedLock`] flight primitive.
    pub fn new(lookup: L, config: ResolverConfig) -> Self {
        Self::with_flights(lookup, config, StripedLock::default())
    }
}

impl<L: Lookup, F: KeyLock> Resolver<L, F> {
    /// Creates a resolver with a caller-chosen flight primitive.
    pub fn with_flights(lookup: L, config: ResolverConfig, flights: F) -> Self {
        Self {
            lookup,
            cache: Mutex::new(CacheState::new(config)),
            flights,
        }
    }

    /// Resolves `key`, consulting the caches first.
    ///
    /// Fails with [`ResolveError::NotFound`] when the key is confirmed
    /// absent, either freshly or from a still-valid negative mark, and with
    /// [`ResolveError::EmptyKey`] when the key is blank after trimming.
    pub async fn resolve(&self, key: &str) -> Result<L::Value, ResolveError<L::Error>> {
        self.resolve_inner(key, false).await
    }

    /// Resolves `key` from upstream, ignoring cached results.
    ///
    /// The fresh result still goes through the per-key lock and overwrites
    /// whatever the caches held for the key.
    pub async fn refresh(&self, key: &str) -> Result<L::Value, ResolveError<L::Error>> {
        self.resolve_inner(key, true).await
    }

    async fn resolve_inner(
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

        let _guard = self.flights.acquire(key).await;

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
        // The upstream receives the caller's original spelling; only the
        // cache is keyed by the trimmed form.
        match self.lookup.lookup(raw_key).await {
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
