//! Typed cache wrapper around Moka.

use std::hash::Hash;

use moka::sync::Cache;
use tracing::debug;

use super::CacheConfig;

/// Named, bounded cache. Clones share the same entries.
#[derive(Clone)]
pub struct TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, V>,
    name: &'static str,
}

impl<K, V> TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, config: CacheConfig) -> Self {
        let mut builder = Cache::builder()
            .name(name)
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl);
        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        Self {
            inner: builder.build(),
            name,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    /// Live value for `key`; expired entries read as absent.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    pub fn invalidate(&self, key: &K) {
        self.inner.invalidate(key);
    }

    pub fn invalidate_all(&self) {
        debug!("Clearing cache {}", self.name);
        self.inner.invalidate_all();
    }

    /// Insert `key` unless present; returns `true` if this call inserted it.
    ///
    /// The first caller within a TTL window wins.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool
    where
        K: Clone,
    {
        self.inner.entry(key).or_insert(value).is_fresh()
    }
}
