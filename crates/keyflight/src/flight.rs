use std::collections::HashMap;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

/// Picks the stripe responsible for `key`.
pub(crate) fn stripe_index(key: &str, stripes: usize) -> usize {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish() as usize % stripes
}

/// Per-key exclusive access, serializing the underlying lookups.
///
/// The resolver holds the returned guard across the whole upstream call, so
/// that two callers racing on the same key never both reach the upstream: the
/// loser blocks here, then finds the winner's result in the cache.
///
/// Dropping a waiter's `acquire` future (timeout, cancellation) only gives up
/// its place in line; the lookup in progress belongs to the caller holding
/// the guard and is unaffected.
pub trait KeyLock: Send + Sync {
    /// Releases the key when dropped.
    type Guard<'a>: Send
    where
        Self: 'a;

    /// Waits until no other caller holds `key`, then claims it.
    fn acquire(&self, key: &str) -> impl Future<Output = Self::Guard<'_>> + Send;
}

/// A fixed set of locks indexed by key hash.
///
/// Memory use is bounded by the stripe count regardless of how many distinct
/// keys pass through, at the cost of occasional false contention between
/// keys that hash to the same stripe. This is the default flight primitive.
#[derive(Debug)]
pub struct StripedLock {
    stripes: Box<[Mutex<()>]>,
}

impl StripedLock {
    /// Creates a lock set with the given number of stripes.
    ///
    /// # Panics
    ///
    /// Panics if `stripes` is zero.
    pub fn new(stripes: usize) -> Self {
        assert!(stripes > 0, "need at least one stripe");
        Self {
            stripes: (0..stripes).map(|_| Mutex::new(())).collect(),
        }
    }

    fn stripe(&self, key: &str) -> &Mutex<()> {
        &self.stripes[stripe_index(key, self.stripes.len())]
    }
}

impl Default for StripedLock {
    fn default() -> Self {
        Self::new(64)
    }
}

impl KeyLock for StripedLock {
    type Guard<'a>
        = MutexGuard<'a, ()>
    where
        Self: 'a;

    fn acquire(&self, key: &str) -> impl Future<Output = Self::Guard<'_>> + Send {
        self.stripe(key).lock()
    }
}

/// One lock per distinct key, with opportunistic pruning.
///
/// Unlike [`StripedLock`] this never produces false contention, but it keeps
/// a map entry per key. Entries nobody holds or waits on are pruned whenever
/// the map grows past a threshold, so the map is bounded by the number of
/// concurrently active keys rather than by every key ever seen.
#[derive(Debug, Default)]
pub struct KeyedLock {
    locks: parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLock {
    const PRUNE_THRESHOLD: usize = 128;

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

impl KeyLock for KeyedLock {
    type Guard<'a>
        = OwnedMutexGuard<()>
    where
        Self: 'a;

    fn acquire(&self, key: &str) -> impl Future<Output = Self::Guard<'_>> + Send {
        let lock = {
            let mut locks = self.locks.lock();
            if locks.len() >= Self::PRUNE_THRESHOLD {
                // Entries only the map itself references have neither a
                // holder nor waiters and can be dropped.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(key.to_owned()).or_default())
        };
        lock.lock_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_striped_same_key_contends() {
        let locks = StripedLock::default();
        let _guard = locks.acquire("alice").await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.acquire("alice"));
        assert!(blocked.await.is_err());
    }

    #[tokio::test]
    async fn test_striped_releases_on_drop() {
        let locks = StripedLock::new(1);
        drop(locks.acquire("alice").await);
        let _guard = locks.acquire("alice").await;
    }

    #[tokio::test]
    async fn test_keyed_distinct_keys_do_not_contend() {
        let locks = KeyedLock::default();
        let _guard = locks.acquire("alice").await;

        let other = tokio::time::timeout(Duration::from_millis(100), locks.acquire("bob"));
        assert!(other.await.is_ok());
    }

    #[tokio::test]
    async fn test_keyed_same_key_contends() {
        let locks = KeyedLock::default();
        let _guard = locks.acquire("alice").await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.acquire("alice"));
        assert!(blocked.await.is_err());
    }

    #[tokio::test]
    async fn test_striped_cancelled_waiter_does_not_consume_release() {
        let locks = Arc::new(StripedLock::default());
        let guard = locks.acquire("alice").await;

        let waiter = tokio::spawn({
            let locks = Arc::clone(&locks);
            async move { drop(locks.acquire("alice").await) }
        });
        // let the waiter queue up behind the held guard, then cancel it
        tokio::time::sleep(Duration::from_millis(10)).await;
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(100), locks.acquire("alice"));
        assert!(reacquired.await.is_ok());
    }

    #[tokio::test]
    async fn test_keyed_cancelled_waiter_does_not_consume_release() {
        let locks = Arc::new(KeyedLock::default());
        let guard = locks.acquire("alice").await;

        let waiter = tokio::spawn({
            let locks = Arc::clone(&locks);
            async move { drop(locks.acquire("alice").await) }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(100), locks.acquire("alice"));
        assert!(reacquired.await.is_ok());
    }

    #[tokio::test]
    async fn test_keyed_prunes_idle_locks() {
        let locks = KeyedLock::default();
        for i in 0..4 * KeyedLock::PRUNE_THRESHOLD {
            drop(locks.acquire(&format!("key-{i}")).await);
        }
        assert!(locks.len() <= KeyedLock::PRUNE_THRESHOLD);
    }
}
