//! TTL + LRU cache of resolved `TenantConfig` keyed by normalized host.
//!
//! Backed by `dashmap` so lookups for different hosts never contend on a
//! single lock, the same reasoning the reference daemon applies when it
//! reaches for `dashmap` over a single `RwLock<HashMap<..>>`.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::tenant::model::TenantConfig;

/// One cache slot: the resolved config plus bookkeeping for eviction.
#[derive(Clone)]
struct Entry {
    config: TenantConfig,
    inserted_at: DateTime<Utc>,
}

/// Host-keyed tenant config cache with TTL expiry and size-bounded LRU
/// eviction.
pub struct TenantConfigCache {
    entries: DashMap<String, Entry>,
    max_size: usize,
}

impl TenantConfigCache {
    /// Construct an empty cache bounded to `max_size` entries.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self { entries: DashMap::new(), max_size }
    }

    /// Fetch a cache entry regardless of expiry (used for stale-serve).
    #[must_use]
    pub fn get_any(&self, host: &str) -> Option<TenantConfig> {
        self.entries.get(host).map(|e| e.config.clone())
    }

    /// Fetch a cache entry only if it is not expired.
    #[must_use]
    pub fn get_fresh(&self, host: &str, now: DateTime<Utc>) -> Option<TenantConfig> {
        let entry = self.entries.get(host)?;
        if entry.config.is_expired(now) {
            return None;
        }
        Some(entry.config.clone())
    }

    /// Insert/replace a resolved config, evicting the oldest entry first if
    /// the cache is at capacity and this is a new key.
    pub fn insert(&self, host: String, config: TenantConfig, now: DateTime<Utc>) {
        if !self.entries.contains_key(&host) && self.entries.len() >= self.max_size {
            self.evict_oldest();
        }
        self.entries.insert(host, Entry { config, inserted_at: now });
    }

    /// Number of entries currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&self) {
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|entry| entry.inserted_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest_key {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::model::StorageConfig;

    fn config(version: &str, expires_at: Option<DateTime<Utc>>) -> TenantConfig {
        TenantConfig {
            tenant_id: "t1".to_string(),
            config_version: version.to_string(),
            expires_at,
            features: Default::default(),
            storage: StorageConfig { root: "/root".to_string(), ..Default::default() },
            publishers: vec![],
            email_server: None,
            ai: Default::default(),
            captionfile: Default::default(),
            confirmation: Default::default(),
            content: Default::default(),
            auth0: None,
            credentials: Default::default(),
        }
    }

    #[test]
    fn fresh_entry_is_returned_before_expiry() {
        let now = Utc::now();
        let cache = TenantConfigCache::new(10);
        cache.insert("acme.example.com".to_string(), config("v1", Some(now + chrono::Duration::seconds(60))), now);

        assert!(cache.get_fresh("acme.example.com", now).is_some());
    }

    #[test]
    fn expired_entry_is_not_returned_by_get_fresh_but_is_by_get_any() {
        let now = Utc::now();
        let cache = TenantConfigCache::new(10);
        cache.insert("acme.example.com".to_string(), config("v1", Some(now - chrono::Duration::seconds(1))), now);

        assert!(cache.get_fresh("acme.example.com", now).is_none());
        assert!(cache.get_any("acme.example.com").is_some());
    }

    #[test]
    fn eviction_removes_oldest_entry_when_at_capacity() {
        let now = Utc::now();
        let cache = TenantConfigCache::new(2);
        cache.insert("a.example.com".to_string(), config("v1", None), now);
        cache.insert("b.example.com".to_string(), config("v1", None), now + chrono::Duration::seconds(1));
        cache.insert("c.example.com".to_string(), config("v1", None), now + chrono::Duration::seconds(2));

        assert_eq!(cache.len(), 2);
        assert!(cache.get_any("a.example.com").is_none());
        assert!(cache.get_any("c.example.com").is_some());
    }
}
