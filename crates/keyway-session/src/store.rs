//! LRU + TTL session store.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::data::SessionData;
use crate::error::{Error, Result};

/// Entry stored in the LRU.
#[derive(Debug, Clone)]
struct Entry {
    data: SessionData,
    last_access: Instant,
}

impl Entry {
    fn is_expired(&self, config: &StoreConfig) -> bool {
        config
            .ttl
            .is_some_and(|ttl| self.last_access.elapsed() > ttl)
    }
}

/// Session store shared by all request handlers.
///
/// Cloning is cheap; clones share the same sessions.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<LruCache<String, Entry>>>,
    config: StoreConfig,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new(config: StoreConfig) -> Self {
        let cap = NonZeroUsize::new(config.max_sessions).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(RwLock::new(LruCache::new(cap))),
            config,
        }
    }

    /// Generate an id for a new session.
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Load a session, resetting its idle timer.
    ///
    /// Returns `None` for unknown and expired sessions; expired ones are
    /// dropped on the way.
    pub async fn load(&self, session_id: &str) -> Option<SessionData> {
        let mut inner = self.inner.write().await;

        let expired = inner
            .peek(session_id)
            .is_some_and(|entry| entry.is_expired(&self.config));
        if expired {
            debug!(session_id = %session_id, "Session expired, removing");
            inner.pop(session_id);
            return None;
        }

        inner.get_mut(session_id).map(|entry| {
            entry.last_access = Instant::now();
            trace!(session_id = %session_id, "Session loaded");
            entry.data.clone()
        })
    }

    /// Store a session, evicting the least recently used one if full.
    pub async fn save(&self, session_id: &str, data: SessionData) -> Result<()> {
        if self.config.max_sessions == 0 {
            return Err(Error::NoCapacity);
        }
        if Uuid::try_parse(session_id).is_err() {
            return Err(Error::InvalidId(session_id.to_string()));
        }

        let mut inner = self.inner.write().await;
        let entry = Entry {
            data,
            last_access: Instant::now(),
        };
        if let Some((evicted, _)) = inner.push(session_id.to_string(), entry)
            && evicted != session_id
        {
            debug!(session_id = %evicted, "Evicted least recently used session");
        }

        trace!(session_id = %session_id, size = inner.len(), "Session saved");
        Ok(())
    }

    /// Remove a session.
    pub async fn remove(&self, session_id: &str) -> Option<SessionData> {
        self.inner.write().await.pop(session_id).map(|e| e.data)
    }

    /// Whether a live session exists (does not reset its timer).
    pub async fn contains(&self, session_id: &str) -> bool {
        self.inner
            .read()
            .await
            .peek(session_id)
            .is_some_and(|entry| !entry.is_expired(&self.config))
    }

    /// Number of stored sessions, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Drop every expired session and return how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let expired: Vec<String> = inner
            .iter()
            .filter(|(_, entry)| entry.is_expired(&self.config))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            inner.pop(id);
        }

        if !expired.is_empty() {
            debug!(count = expired.len(), "Cleaned up expired sessions");
        }
        expired.len()
    }

    /// Start the background sweep if enabled and a TTL is configured.
    pub fn spawn_cleanup_task(&self) -> Option<JoinHandle<()>> {
        if !self.config.enable_cleanup_task || self.config.ttl.is_none() {
            return None;
        }

        let store = self.clone();
        let interval = self.config.cleanup_interval;
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.cleanup_expired().await;
            }
        }))
    }

    /// Store statistics.
    pub async fn stats(&self) -> StoreStats {
        StoreStats {
            size: self.inner.read().await.len(),
            capacity: self.config.max_sessions,
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Current number of sessions.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    fn data(key: &str, value: &str) -> SessionData {
        let mut data = SessionData::new();
        data.set(key, value);
        data
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = SessionStore::new(StoreConfig::new().with_max_sessions(10));
        let id = SessionStore::new_id();

        store.save(&id, data("state", "abc")).await.unwrap();

        let loaded = store.load(&id).await.unwrap();
        assert_eq!(loaded.get("state"), Some("abc"));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let store = SessionStore::new(StoreConfig::new());
        assert!(store.load(&SessionStore::new_id()).await.is_none());
    }

    #[tokio::test]
    async fn test_rejects_foreign_ids() {
        let store = SessionStore::new(StoreConfig::new());
        let result = store.save("../../etc/passwd", SessionData::new()).await;
        assert!(matches!(result, Err(Error::InvalidId(_))));
    }

    #[tokio::test]
    async fn test_zero_capacity() {
        let store = SessionStore::new(StoreConfig::new().with_max_sessions(0));
        let result = store.save(&SessionStore::new_id(), SessionData::new()).await;
        assert!(matches!(result, Err(Error::NoCapacity)));
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let store = SessionStore::new(StoreConfig::new().with_max_sessions(3));
        let ids: Vec<String> = (0..4).map(|_| SessionStore::new_id()).collect();

        for id in &ids[..3] {
            store.save(id, SessionData::new()).await.unwrap();
        }

        // Touch the oldest so the second becomes LRU.
        store.load(&ids[0]).await.unwrap();
        store.save(&ids[3], SessionData::new()).await.unwrap();

        assert_eq!(store.len().await, 3);
        assert!(store.contains(&ids[0]).await);
        assert!(!store.contains(&ids[1]).await);
        assert!(store.contains(&ids[2]).await);
        assert!(store.contains(&ids[3]).await);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let store = SessionStore::new(StoreConfig::new().with_ttl(Duration::from_millis(50)));
        let id = SessionStore::new_id();
        store.save(&id, SessionData::new()).await.unwrap();

        sleep(Duration::from_millis(100)).await;

        assert!(!store.contains(&id).await);
        assert!(store.load(&id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_resets_ttl() {
        let store = SessionStore::new(StoreConfig::new().with_ttl(Duration::from_millis(100)));
        let id = SessionStore::new_id();
        store.save(&id, SessionData::new()).await.unwrap();

        sleep(Duration::from_millis(60)).await;
        assert!(store.load(&id).await.is_some());
        sleep(Duration::from_millis(60)).await;

        assert!(store.contains(&id).await);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = SessionStore::new(StoreConfig::new().with_ttl(Duration::from_millis(50)));
        for _ in 0..3 {
            store
                .save(&SessionStore::new_id(), SessionData::new())
                .await
                .unwrap();
        }

        sleep(Duration::from_millis(100)).await;

        assert_eq!(store.cleanup_expired().await, 3);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_without_ttl_never_expires() {
        let store = SessionStore::new(StoreConfig::new().without_ttl());
        let id = SessionStore::new_id();
        store.save(&id, SessionData::new()).await.unwrap();

        sleep(Duration::from_millis(20)).await;
        assert_eq!(store.cleanup_expired().await, 0);
        assert!(store.spawn_cleanup_task().is_none());
    }

    #[tokio::test]
    async fn test_background_cleanup() {
        let config = StoreConfig::new()
            .with_ttl(Duration::from_millis(20))
            .with_cleanup_interval(Duration::from_millis(30));
        let store = SessionStore::new(config);
        store
            .save(&SessionStore::new_id(), SessionData::new())
            .await
            .unwrap();

        let handle = store.spawn_cleanup_task().unwrap();
        sleep(Duration::from_millis(150)).await;
        handle.abort();

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_and_stats() {
        let store = SessionStore::new(StoreConfig::new().with_max_sessions(5));
        let id = SessionStore::new_id();
        store.save(&id, data("k", "v")).await.unwrap();

        assert_eq!(
            store.stats().await,
            StoreStats {
                size: 1,
                capacity: 5
            }
        );
        assert_eq!(store.remove(&id).await.unwrap().get("k"), Some("v"));
        assert!(store.remove(&id).await.is_none());
    }
}
