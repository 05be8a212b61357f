//! Cache layer
//!
//! [`CacheStore`] is the backing key-value store and owns expiry.
//! [`TokenCache`] fronts it for the orchestrator and turns store failures into
//! misses / no-op writes so the caller always falls through to fresh data.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use tokenagg_core::{CacheError, CacheResult};

/// Backing store with per-entry TTL
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the value if present and unexpired
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Number of live entries, when the store can report it
    fn len(&self) -> Option<usize> {
        None
    }
}

/// Timestamped cache entry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: String,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process store backed by DashMap
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.entries.len())
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Backend(format!("TTL out of range: {:?}", ttl)))?;

        self.entries.insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    fn len(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// Fail-soft facade over a [`CacheStore`]
#[derive(Clone)]
pub struct TokenCache {
    store: Arc<dyn CacheStore>,
    errors: Arc<AtomicU64>,
}

impl TokenCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            errors: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached blob, or `None` on miss or store failure
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(Some(value)) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                debug!(key, "Cache miss");
                None
            }
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key, "Cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// Store `value` for `ttl`; returns whether the write succeeded
    pub async fn set(&self, key: &str, value: String, ttl: Duration) -> bool {
        match self.store.set(key, value, ttl).await {
            Ok(()) => true,
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key, "Cache write failed: {}", e);
                false
            }
        }
    }

    pub fn entry_count(&self) -> Option<usize> {
        self.store.len()
    }

    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Store that fails every call
    pub struct UnavailableStore;

    #[async_trait::async_trait]
    impl CacheStore for UnavailableStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::UnavailableStore;
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_get_before_and_after_ttl() {
        let store = MemoryStore::new();
        store.set("tokens:v1:SOL", "[]".into(), Duration::from_secs(30)).await.unwrap();

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(store.get("tokens:v1:SOL").await.unwrap().as_deref(), Some("[]"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("tokens:v1:SOL").await.unwrap(), None);
        assert_eq!(store.len(), Some(0), "expired entry removed on read");
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_overwrites_and_resets_ttl() {
        let store = MemoryStore::new();
        store.set("k", "a".into(), Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        store.set("k", "b".into(), Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = MemoryStore::new();
        store.set("short", "1".into(), Duration::from_secs(1)).await.unwrap();
        store.set("long", "2".into(), Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), Some(1));
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades() {
        let cache = TokenCache::new(Arc::new(UnavailableStore));

        assert_eq!(cache.get("k").await, None);
        assert!(!cache.set("k", "v".into(), Duration::from_secs(1)).await);
        assert_eq!(cache.error_count(), 2);
        assert_eq!(cache.entry_count(), None);
    }

    #[test]
    fn test_concurrent_writes() {
        use std::thread;

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                let handle = runtime.handle().clone();
                thread::spawn(move || {
                    for j in 0..100 {
                        handle
                            .block_on(store.set(&format!("{i}:{j}"), "x".into(), Duration::from_secs(60)))
                            .unwrap();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), Some(400));
    }
}
