// ── Read-through cache ──
//
// TTL-keyed, type-erased value cache. Hits are served without touching
// the upstream; misses run the producer and store its result. Producer
// failures propagate and are never stored. Concurrent misses on the same
// key may both produce; the last write wins. Every miss also sweeps
// out entries that have expired, so one-off keys cannot pile up.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tracing::trace;

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
}

/// Shared TTL cache keyed by string.
#[derive(Default)]
pub struct ReadThroughCache {
    entries: DashMap<String, Entry>,
}

impl ReadThroughCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, or run `producer` and cache its
    /// output for `ttl`.
    ///
    /// An entry stored under the same key with a different type is
    /// treated as a miss and overwritten.
    pub async fn get_or_populate<V, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<Arc<V>, E>
    where
        V: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.lookup::<V>(key) {
            trace!(key, "cache hit");
            return Ok(hit);
        }

        trace!(key, "cache miss");
        self.purge_expired();
        let value = Arc::new(producer().await?);
        let erased: Arc<dyn Any + Send + Sync> = value.clone();
        self.entries.insert(
            key.to_owned(),
            Entry {
                value: erased,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(value)
    }

    /// Remove the named entries. Unknown keys are ignored.
    pub fn flush(&self, keys: &[&str]) {
        for key in keys {
            if self.entries.remove(*key).is_some() {
                trace!(key, "cache entry flushed");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| e.expires_at > Instant::now())
    }

    /// A view whose keys are prefixed with `"{name}|"`.
    pub fn namespace(&self, name: &'static str) -> CacheNamespace<'_> {
        CacheNamespace { cache: self, name }
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            trace!(purged, "expired cache entries removed");
        }
    }

    fn lookup<V: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<V>> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if entry.expires_at <= now {
            drop(entry);
            self.entries.remove_if(key, |_, e| e.expires_at <= now);
            return None;
        }
        Arc::clone(&entry.value).downcast::<V>().ok()
    }
}

/// Key-prefixing handle onto a [`ReadThroughCache`].
#[derive(Clone, Copy)]
pub struct CacheNamespace<'a> {
    cache: &'a ReadThroughCache,
    name: &'static str,
}

impl CacheNamespace<'_> {
    pub fn key(&self, key: &str) -> String {
        format!("{}|{key}", self.name)
    }

    pub async fn get_or_populate<V, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<Arc<V>, E>
    where
        V: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.cache
            .get_or_populate(&self.key(key), ttl, producer)
            .await
    }

    pub fn flush(&self, keys: &[&str]) {
        let full: Vec<String> = keys.iter().map(|k| self.key(k)).collect();
        let refs: Vec<&str> = full.iter().map(String::as_str).collect();
        self.cache.flush(&refs);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains(&self.key(key))
    }
}

/// Key for a parameterised operation: `"{operation}|{json(params)}"`.
pub fn cache_key(operation: &str, params: &impl Serialize) -> String {
    let json = serde_json::to_string(params).unwrap_or_else(|_| "null".into());
    format!("{operation}|{json}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const TTL: Duration = Duration::from_secs(600);

    async fn counted(
        cache: &ReadThroughCache,
        key: &str,
        calls: &AtomicUsize,
    ) -> Result<Arc<String>, String> {
        cache
            .get_or_populate(key, TTL, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(format!("value-{n}"))
            })
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn hit_within_ttl_skips_producer() {
        let cache = ReadThroughCache::new();
        let calls = AtomicUsize::new(0);

        let a = counted(&cache, "k", &calls).await.unwrap();
        tokio::time::advance(Duration::from_secs(599)).await;
        let b = counted(&cache, "k", &calls).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_reproduced() {
        let cache = ReadThroughCache::new();
        let calls = AtomicUsize::new(0);

        counted(&cache, "k", &calls).await.unwrap();
        tokio::time::advance(TTL).await;
        let again = counted(&cache, "k", &calls).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(again.as_str(), "value-1");
    }

    #[tokio::test(start_paused = true)]
    async fn miss_sweeps_other_expired_keys() {
        let cache = ReadThroughCache::new();
        let calls = AtomicUsize::new(0);

        for range in ["2024-01-01..2024-01-07", "2024-01-08..2024-01-14"] {
            counted(&cache, range, &calls).await.unwrap();
        }
        assert_eq!(cache.len(), 2);

        tokio::time::advance(TTL).await;
        counted(&cache, "2024-01-15..2024-01-21", &calls).await.unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache.contains("2024-01-15..2024-01-21"));
    }

    #[tokio::test(start_paused = true)]
    async fn miss_keeps_live_entries() {
        let cache = ReadThroughCache::new();
        let calls = AtomicUsize::new(0);

        counted(&cache, "a", &calls).await.unwrap();
        tokio::time::advance(Duration::from_secs(300)).await;
        counted(&cache, "b", &calls).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("a"));
    }

    #[tokio::test]
    async fn flush_forces_reproduction() {
        let cache = ReadThroughCache::new();
        let calls = AtomicUsize::new(0);

        counted(&cache, "k", &calls).await.unwrap();
        cache.flush(&["k", "missing"]);
        counted(&cache, "k", &calls).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn producer_errors_are_not_cached() {
        let cache = ReadThroughCache::new();
        let err = cache
            .get_or_populate::<String, _, _, _>("k", TTL, || async { Err("boom".to_owned()) })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty());

        let calls = AtomicUsize::new(0);
        counted(&cache, "k", &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn namespaces_do_not_collide() {
        let cache = ReadThroughCache::new();
        let a = cache.namespace("a");
        let b = cache.namespace("b");

        a.get_or_populate("x", TTL, || async { Ok::<_, ()>(1_u32) })
            .await
            .unwrap();
        let from_b = b
            .get_or_populate("x", TTL, || async { Ok::<_, ()>(2_u32) })
            .await
            .unwrap();

        assert_eq!(*from_b, 2);
        assert!(cache.contains("a|x"));
        a.flush(&["x"]);
        assert!(!cache.contains("a|x"));
        assert!(b.contains("x"));
    }

    #[test]
    fn parameterised_keys_embed_json() {
        assert_eq!(cache_key("details", &("abc", 3)), r#"details|["abc",3]"#);
    }
}
