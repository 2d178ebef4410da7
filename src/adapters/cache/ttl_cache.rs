//! Time-boxed in-memory cache.
//!
//! Entries expire a fixed time after they were written. Expired entries are
//! dropped lazily on the next read of the same key.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Per-process cache keyed by `K` with a single TTL for every entry.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<K, (V, Instant)>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value while it is fresh.
    pub async fn get(&self, key: &K) -> Option<V> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, stored_at)) if stored_at.elapsed() < self.ttl => {
                    return Some(value.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Stale: drop it unless another writer refreshed it meanwhile.
        let mut entries = self.entries.write().await;
        if let Some((_, stored_at)) = entries.get(key) {
            if stored_at.elapsed() >= self.ttl {
                entries.remove(key);
            }
        }
        None
    }

    pub async fn insert(&self, key: K, value: V) {
        self.entries
            .write()
            .await
            .insert(key, (value, Instant::now()));
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, fresh or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            entries: Arc::clone(&self.entries),
        }
    }
}
