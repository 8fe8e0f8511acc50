use std::{
    collections::HashMap,
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::Result;

/// Cached response bytes with an optional absolute expiry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    pub data: Bytes,
    pub expires_at: Option<SystemTime>,
}

impl CacheEntry {
    /// An entry that never expires.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            expires_at: None,
        }
    }

    /// An entry expiring `ttl` after `now`; `None` never expires.
    pub fn with_ttl(data: impl Into<Bytes>, ttl: Option<Duration>, now: SystemTime) -> Self {
        Self {
            data: data.into(),
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
        }
    }

    pub fn is_valid_at(&self, now: SystemTime) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }

    /// Validity against the wall clock at the moment of the call.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(SystemTime::now())
    }
}

/// Key/value store for cached responses.
///
/// Implementations must tolerate concurrent `get`/`save` calls from many
/// in-flight requests. Expiry is evaluated by the caller at read time; stores
/// are not required to evict anything.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    async fn save(&self, key: &str, entry: CacheEntry) -> Result<()>;
}

/// Unbounded process-local cache.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, entry: CacheEntry) -> Result<()> {
        self.entries.write().await.insert(key.to_owned(), entry);
        Ok(())
    }
}

/// Store that never holds anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCacheStore;

#[async_trait]
impl CacheStore for NoopCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<CacheEntry>> {
        Ok(None)
    }

    async fn save(&self, _key: &str, _entry: CacheEntry) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::{CacheEntry, CacheStore, InMemoryCacheStore, NoopCacheStore};

    #[test]
    fn entry_without_expiry_is_always_valid() {
        let entry = CacheEntry::new("data");
        let far_future = SystemTime::now() + Duration::from_secs(10 * 365 * 24 * 3600);
        assert!(entry.is_valid_at(far_future));
    }

    #[test]
    fn ttl_entry_expires_after_ttl_elapses() {
        let written = SystemTime::now();
        let entry = CacheEntry::with_ttl("data", Some(Duration::from_secs(1)), written);

        assert!(entry.is_valid());
        assert!(entry.is_valid_at(written + Duration::from_millis(999)));
        assert!(!entry.is_valid_at(written + Duration::from_secs(1)));
        assert!(!entry.is_valid_at(written + Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn in_memory_store_round_trips_and_overwrites() {
        let store = InMemoryCacheStore::new();
        assert!(store.get("k").await.unwrap().is_none());

        store.save("k", CacheEntry::new("first")).await.unwrap();
        store.save("k", CacheEntry::new("second")).await.unwrap();

        let entry = store.get("k").await.unwrap().expect("entry must exist");
        assert_eq!(entry.data, "second");
        assert_eq!(store.len().await, 1);

        store.clear().await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn noop_store_drops_writes() {
        let store = NoopCacheStore;
        store.save("k", CacheEntry::new("x")).await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }
}
