use std::collections::HashMap;
use std::time::Instant;

use crate::config::ResolverConfig;

/// Outcome of a cache read for one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CacheStatus<V> {
    /// A fresh positive entry exists.
    Fresh(V),
    /// A fresh negative mark exists: the key is confirmed absent.
    Absent,
    /// Neither cache has a fresh entry; the upstream has to be consulted.
    Unknown,
}

/// Positive and negative caches for resolved keys.
///
/// Entries expire lazily: an expired entry is indistinguishable from a
/// missing one, and is removed by the read that observes it so the maps stay
/// bounded by the working set. The two maps are kept mutually exclusive per
/// key: storing a value drops any negative mark and vice versa, so at most
/// one of them is ever authoritative.
///
/// All methods take `now` explicitly; the resolvers pass `Instant::now()`.
#[derive(Debug)]
pub(crate) struct CacheState<V> {
    positive: HashMap<String, (Instant, V)>,
    negative: HashMap<String, Instant>,
    config: ResolverConfig,
}

impl<V: Clone> CacheState<V> {
    pub(crate) fn new(config: ResolverConfig) -> Self {
        Self {
            positive: HashMap::new(),
            negative: HashMap::new(),
            config,
        }
    }

    /// Reads the caches for `key`, evicting whatever has expired.
    ///
    /// The negative cache takes precedence; see [`store_value`](Self::store_value)
    /// for why the two never hold a fresh entry for the same key at once.
    pub(crate) fn check(&mut self, key: &str, now: Instant) -> CacheStatus<V> {
        if let Some(&marked_at) = self.negative.get(key) {
            if now.duration_since(marked_at) <= self.config.retry_misses_after {
                return CacheStatus::Absent;
            }
            self.negative.remove(key);
        }
        if let Some((inserted_at, value)) = self.positive.get(key) {
            if now.duration_since(*inserted_at) <= self.config.time_to_live {
                return CacheStatus::Fresh(value.clone());
            }
            self.positive.remove(key);
        }
        CacheStatus::Unknown
    }

    /// Stores a successfully resolved value, clearing any negative mark.
    pub(crate) fn store_value(&mut self, key: &str, value: V, now: Instant) {
        self.negative.remove(key);
        self.positive.insert(key.to_owned(), (now, value));
    }

    /// Marks the key as missing, clearing any stale positive entry.
    pub(crate) fn store_miss(&mut self, key: &str, now: Instant) {
        self.positive.remove(key);
        self.negative.insert(key.to_owned(), now);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn test_state() -> CacheState<u32> {
        CacheState::new(ResolverConfig {
            time_to_live: Duration::from_secs(60),
            retry_misses_after: Duration::from_secs(10),
        })
    }

    #[test]
    fn test_positive_entry_expires() {
        let mut state = test_state();
        let now = Instant::now();

        state.store_value("a", 1, now);
        assert_eq!(state.check("a", now), CacheStatus::Fresh(1));
        assert_eq!(
            state.check("a", now + Duration::from_secs(60)),
            CacheStatus::Fresh(1)
        );
        assert_eq!(
            state.check("a", now + Duration::from_secs(61)),
            CacheStatus::Unknown
        );
        // the expired entry was evicted by the read above
        assert!(state.positive.is_empty());
    }

    #[test]
    fn test_negative_mark_expires() {
        let mut state = test_state();
        let now = Instant::now();

        state.store_miss("ghost", now);
        assert_eq!(state.check("ghost", now), CacheStatus::Absent);
        assert_eq!(
            state.check("ghost", now + Duration::from_secs(11)),
            CacheStatus::Unknown
        );
        assert!(state.negative.is_empty());
    }

    #[test]
    fn test_value_clears_negative_mark() {
        let mut state = test_state();
        let now = Instant::now();

        state.store_miss("a", now);
        state.store_value("a", 1, now);
        assert_eq!(state.check("a", now), CacheStatus::Fresh(1));
        assert!(state.negative.is_empty());
    }

    #[test]
    fn test_miss_clears_value() {
        let mut state = test_state();
        let now = Instant::now();

        state.store_value("a", 1, now);
        state.store_miss("a", now);
        assert_eq!(state.check("a", now), CacheStatus::Absent);
        assert!(state.positive.is_empty());
    }
}
