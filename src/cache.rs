//! Per-user eligible pool cache.
//!
//! `Mutex<HashMap<user, entry>>`, entry = settings fingerprint + `Arc` pool +
//! build time. Entries are replaced wholesale, never mutated. Pools are built
//! outside the lock; two concurrent misses for one user may both build and
//! the last insert wins.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::corpus::Corpus;
use crate::eligibility::{build_eligible_pool, EligiblePool, ScopeSettings};
use crate::metrics;

pub const DEFAULT_TTL_SECS: i64 = 3600;
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
struct CacheEntry {
    fingerprint: String,
    pool: Arc<EligiblePool>,
    built_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct PoolCache {
    inner: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for PoolCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS), DEFAULT_CAPACITY)
    }
}

impl PoolCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Cached pool for `user`, rebuilt when absent, expired, or built from
    /// different settings.
    pub fn get_or_build(
        &self,
        user: &str,
        settings: &ScopeSettings,
        corpus: &Corpus,
        now: DateTime<Utc>,
    ) -> Arc<EligiblePool> {
        let fingerprint = settings.fingerprint();
        {
            let map = self.inner.lock().expect("pool cache mutex poisoned");
            if let Some(e) = map.get(user) {
                if e.fingerprint == fingerprint && now - e.built_at < self.ttl {
                    metrics::incr(metrics::POOL_CACHE_HITS);
                    return Arc::clone(&e.pool);
                }
            }
        }

        metrics::incr(metrics::POOL_CACHE_MISSES);
        let pool = Arc::new(build_eligible_pool(settings, corpus));
        debug!(user, verses = pool.len(), "pool cache rebuilt");

        let mut map = self.inner.lock().expect("pool cache mutex poisoned");
        map.insert(
            user.to_string(),
            CacheEntry {
                fingerprint,
                pool: Arc::clone(&pool),
                built_at: now,
            },
        );
        if map.len() > self.capacity {
            let oldest = map
                .iter()
                .min_by_key(|(_, e)| e.built_at)
                .map(|(k, _)| k.clone());
            if let Some(k) = oldest {
                map.remove(&k);
            }
        }
        pool
    }

    /// Drop `user`'s entry; returns whether one existed.
    pub fn invalidate(&self, user: &str) -> bool {
        let removed = self
            .inner
            .lock()
            .expect("pool cache mutex poisoned")
            .remove(user)
            .is_some();
        metrics::incr(metrics::POOL_CACHE_INVALIDATIONS);
        debug!(user, removed, "pool cache invalidated");
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("pool cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn corpus() -> Corpus {
        Corpus::builder()
            .chapter("Ruth", 1, ["a", "b"])
            .chapter("Mark", 1, ["c"])
            .build()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn hit_returns_same_arc() {
        let cache = PoolCache::default();
        let c = corpus();
        let s = ScopeSettings::default();
        let a = cache.get_or_build("u1", &s, &c, t0());
        let b = cache.get_or_build("u1", &s, &c, t0() + Duration::minutes(5));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn settings_change_and_expiry_rebuild() {
        let cache = PoolCache::new(Duration::seconds(60), 10);
        let c = corpus();
        let all = ScopeSettings::default();
        let a = cache.get_or_build("u1", &all, &c, t0());

        let ruth = ScopeSettings {
            books: vec!["Ruth".into()],
            ..Default::default()
        };
        let b = cache.get_or_build("u1", &ruth, &c, t0());
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(b.len(), 2);

        let d = cache.get_or_build("u1", &ruth, &c, t0() + Duration::seconds(61));
        assert!(!Arc::ptr_eq(&b, &d));
    }

    #[test]
    fn invalidate_forces_rebuild() {
        let cache = PoolCache::default();
        let c = corpus();
        let s = ScopeSettings::default();
        let a = cache.get_or_build("u1", &s, &c, t0());
        assert!(cache.invalidate("u1"));
        assert!(!cache.invalidate("u1"));
        let b = cache.get_or_build("u1", &s, &c, t0());
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(*a, *b);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = PoolCache::new(Duration::seconds(DEFAULT_TTL_SECS), 2);
        let c = corpus();
        let s = ScopeSettings::default();
        cache.get_or_build("old", &s, &c, t0());
        cache.get_or_build("mid", &s, &c, t0() + Duration::seconds(1));
        cache.get_or_build("new", &s, &c, t0() + Duration::seconds(2));
        assert_eq!(cache.len(), 2);
        assert!(!cache.invalidate("old"));
    }
}
