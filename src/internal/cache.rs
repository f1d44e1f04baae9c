use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Concurrent in-memory cache with a fixed TTL per entry.
///
/// Expired entries are dropped lazily on the next `get` for their key.
/// With metrics enabled every lookup emits a `cache.get` debug event.
#[derive(Clone)]
pub struct Cache<K, V>
where
    K: Eq + Hash,
{
    entries: Arc<DashMap<K, CacheEntry<V>>>,
    ttl: Duration,
    enable_metrics: bool,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, enable_metrics: bool) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            enable_metrics,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let start = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => {
                if self.enable_metrics {
                    tracing::debug!(elapsed = ?start.elapsed(), hit = true, "cache.get");
                }
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(key);
        }
        if self.enable_metrics {
            tracing::debug!(elapsed = ?start.elapsed(), hit = false, expired, "cache.get");
        }
        None
    }

    pub fn set(&self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop every entry whose key matches `predicate`.
    pub fn invalidate_where(&self, predicate: impl Fn(&K) -> bool) {
        self.entries.retain(|k, _| !predicate(k));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
