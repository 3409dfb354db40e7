//! Bounded TTL response cache.
//!
//! # Invariants
//! - `len() <= max_entries` after every admission
//! - An entry is only returned as a hit while `now - admitted_at <= ttl`
//! - A stale entry without an ETag is purged by the lookup that finds it. One
//!   with an ETag stays until it is revalidated or overwritten, or until an
//!   eviction or a sweep drops it, and is only handed out through [`CacheStore::stale`]
//! - Admission at capacity first drops expired entries, then the oldest
//!   quarter of the store by admission time (ties broken by key)
//! - Expired entries count as absent: if purging them frees room, the oldest
//!   quarter is left alone, so a full store evicts `ceil(max / 4)` only when
//!   nothing in it has expired

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::request::{RequestKey, ResponseSnapshot};

/// A cached response with its admission time and lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    response: ResponseSnapshot,
    admitted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.admitted_at) <= self.ttl
    }
}

/// Diagnostic view of one entry.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryStats {
    pub key: RequestKey,
    pub age_ms: u64,
    pub ttl_ms: u64,
}

/// Diagnostic view of the whole store.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub entries: Vec<CacheEntryStats>,
}

struct Inner {
    entries: HashMap<RequestKey, CacheEntry>,
    max_entries: usize,
}

/// Thread-safe response cache. All operations are synchronous and never
/// hold the lock across an await point.
pub struct CacheStore {
    inner: Mutex<Inner>,
}

impl CacheStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                max_entries: max_entries.max(1),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached response if present and fresh. A stale entry is
    /// removed unless it carries an ETag to revalidate with.
    pub fn lookup(&self, key: &RequestKey) -> Option<ResponseSnapshot> {
        let now = Instant::now();
        let mut inner = self.lock();

        let entry = inner.entries.get(key)?;
        if entry.is_fresh(now) {
            return Some(entry.response.clone());
        }
        if entry.response.etag().is_some() {
            tracing::debug!(key = %key, "Stale cache entry kept for revalidation");
            return None;
        }

        inner.entries.remove(key);
        metrics::record_cache_size(inner.entries.len());
        tracing::debug!(key = %key, "Purged stale cache entry");
        None
    }

    /// Expired entry that carries an ETag, for a conditional re-fetch.
    pub fn stale(&self, key: &RequestKey) -> Option<ResponseSnapshot> {
        let now = Instant::now();
        let inner = self.lock();
        inner
            .entries
            .get(key)
            .filter(|entry| !entry.is_fresh(now) && entry.response.etag().is_some())
            .map(|entry| entry.response.clone())
    }

    /// Store a response snapshot, evicting first if the store is full.
    pub fn admit(&self, key: RequestKey, response: ResponseSnapshot, ttl: Duration) {
        let now = Instant::now();
        let mut inner = self.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= inner.max_entries {
            let expired = purge_expired(&mut inner.entries, now);
            if inner.entries.len() >= inner.max_entries {
                let evicted = evict_oldest_quarter(&mut inner.entries);
                tracing::debug!(expired, evicted, "Cache full, evicted oldest entries");
                metrics::record_cache_eviction(evicted);
            }
        }

        inner.entries.insert(
            key,
            CacheEntry {
                response,
                admitted_at: now,
                ttl,
            },
        );
        metrics::record_cache_size(inner.entries.len());
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.lock();
        let removed = purge_expired(&mut inner.entries, Instant::now());
        metrics::record_cache_size(inner.entries.len());
        removed
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
        metrics::record_cache_size(0);
    }

    /// Change the bound. Shrinking takes effect at the next admission.
    pub fn set_max_entries(&self, max_entries: usize) {
        self.lock().max_entries = max_entries.max(1);
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let inner = self.lock();

        let mut entries: Vec<CacheEntryStats> = inner
            .entries
            .iter()
            .map(|(key, entry)| CacheEntryStats {
                key: key.clone(),
                age_ms: now.saturating_duration_since(entry.admitted_at).as_millis() as u64,
                ttl_ms: entry.ttl.as_millis() as u64,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        CacheStats {
            size: inner.entries.len(),
            max_size: inner.max_entries,
            entries,
        }
    }
}

fn purge_expired(entries: &mut HashMap<RequestKey, CacheEntry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.is_fresh(now));
    before - entries.len()
}

/// Drop `ceil(len / 4)` entries, oldest admission first.
fn evict_oldest_quarter(entries: &mut HashMap<RequestKey, CacheEntry>) -> usize {
    let count = entries.len().div_ceil(4);

    let mut by_age: Vec<(Instant, RequestKey)> = entries
        .iter()
        .map(|(key, entry)| (entry.admitted_at, key.clone()))
        .collect();
    by_age.sort();

    for (_, key) in by_age.into_iter().take(count) {
        entries.remove(&key);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestDescriptor;
    use http::HeaderMap;

    fn key(path: &str) -> RequestKey {
        RequestDescriptor::get(path).key()
    }

    fn response(body: &'static str) -> ResponseSnapshot {
        ResponseSnapshot::new(200, HeaderMap::new(), body)
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_within_ttl() {
        let store = CacheStore::new(10);
        store.admit(key("/api/hoteles"), response("hoteles"), Duration::from_secs(600));

        tokio::time::advance(Duration::from_secs(60)).await;
        let hit = store.lookup(&key("/api/hoteles")).unwrap();
        assert_eq!(hit.body().as_ref(), b"hoteles");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_is_purged_on_lookup() {
        let store = CacheStore::new(10);
        store.admit(key("/api/hoteles"), response("hoteles"), Duration::from_secs(600));

        tokio::time::advance(Duration::from_secs(601)).await;
        assert!(store.lookup(&key("/api/hoteles")).is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_with_etag_is_kept_for_revalidation() {
        let store = CacheStore::new(10);
        let mut headers = HeaderMap::new();
        headers.insert(http::header::ETAG, http::HeaderValue::from_static("\"v1\""));
        let tagged = ResponseSnapshot::new(200, headers, "usuario");
        store.admit(key("/api/usuarios/3"), tagged, Duration::from_secs(300));

        assert!(store.stale(&key("/api/usuarios/3")).is_none());

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(store.lookup(&key("/api/usuarios/3")).is_none());
        let stale = store.stale(&key("/api/usuarios/3")).unwrap();
        assert_eq!(stale.body().as_ref(), b"usuario");

        assert_eq!(store.purge_expired(), 1);
        assert!(store.stale(&key("/api/usuarios/3")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_drops_oldest_quarter() {
        let store = CacheStore::new(8);
        for i in 0..8 {
            store.admit(key(&format!("/api/hoteles/{i}")), response("x"), Duration::from_secs(600));
            tokio::time::advance(Duration::from_millis(10)).await;
        }
        assert_eq!(store.len(), 8);

        store.admit(key("/api/hoteles/8"), response("x"), Duration::from_secs(600));

        // ceil(8 * 0.25) = 2 evicted, then one inserted
        assert_eq!(store.len(), 7);
        assert!(store.lookup(&key("/api/hoteles/0")).is_none());
        assert!(store.lookup(&key("/api/hoteles/1")).is_none());
        assert!(store.lookup(&key("/api/hoteles/2")).is_some());
        assert!(store.lookup(&key("/api/hoteles/8")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_rounds_up() {
        let store = CacheStore::new(5);
        for i in 0..5 {
            store.admit(key(&format!("/api/usuarios/{i}")), response("x"), Duration::from_secs(60));
            tokio::time::advance(Duration::from_millis(1)).await;
        }
        store.admit(key("/api/usuarios/5"), response("x"), Duration::from_secs(60));
        // ceil(5 * 0.25) = 2
        assert_eq!(store.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_store_prefers_expired_entries() {
        let store = CacheStore::new(4);
        store.admit(key("/api/auth/verificar"), response("x"), Duration::from_secs(30));
        for i in 0..3 {
            store.admit(key(&format!("/api/hoteles/{i}")), response("x"), Duration::from_secs(600));
        }
        tokio::time::advance(Duration::from_secs(31)).await;

        store.admit(key("/api/hoteles/3"), response("x"), Duration::from_secs(600));
        assert_eq!(store.len(), 4);
        assert!(store.lookup(&key("/api/hoteles/0")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_does_not_evict() {
        let store = CacheStore::new(2);
        store.admit(key("/api/a"), response("1"), Duration::from_secs(60));
        store.admit(key("/api/b"), response("1"), Duration::from_secs(60));
        store.admit(key("/api/b"), response("2"), Duration::from_secs(60));

        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup(&key("/api/b")).unwrap().body().as_ref(), b"2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_report_age_and_ttl() {
        let store = CacheStore::new(3);
        store.admit(key("/api/ciudades"), response("x"), Duration::from_secs(300));
        tokio::time::advance(Duration::from_secs(5)).await;

        let stats = store.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.max_size, 3);
        assert_eq!(stats.entries[0].key.as_str(), "GET /api/ciudades");
        assert_eq!(stats.entries[0].age_ms, 5_000);
        assert_eq!(stats.entries[0].ttl_ms, 300_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_and_clear() {
        let store = CacheStore::new(3);
        store.admit(key("/api/a"), response("x"), Duration::from_secs(1));
        store.admit(key("/api/b"), response("x"), Duration::from_secs(100));
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        store.clear();
        assert!(store.is_empty());
    }
}
