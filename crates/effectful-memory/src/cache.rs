// In-memory cache
//
// Expiry is measured on tokio's clock, so tests with a paused runtime can
// advance time instead of sleeping.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::Instant;

use effectful_core::interpreter::CacheStore;
use effectful_error::BackendResult;

use crate::faults::Faults;

#[derive(Debug, Clone)]
struct Slot {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

/// A byte cache with lazy expiry
#[derive(Debug, Default)]
pub struct MemoryCache {
    slots: Mutex<HashMap<String, Slot>>,
    faults: Faults,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure injection for `get`, `set` and `delete`
    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Whether `key` currently holds a live entry
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.slots.lock().get(key).map_or(false, |slot| slot.is_live(now))
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|_, slot| slot.is_live(now));
        before - slots.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> BackendResult<Option<Bytes>> {
        self.faults.check("get")?;
        let now = Instant::now();
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(key).filter(|slot| slot.is_live(now)) {
            return Ok(Some(slot.value.clone()));
        }
        slots.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> BackendResult<()> {
        self.faults.check("set")?;
        // An expiry past the clock's range never arrives
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.slots
            .lock()
            .insert(key.to_string(), Slot { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> BackendResult<bool> {
        self.faults.check("delete")?;
        let now = Instant::now();
        let removed = self.slots.lock().remove(key);
        Ok(removed.map_or(false, |slot| slot.is_live(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_on_tokio_clock() {
        let cache = MemoryCache::new();
        cache
            .set("session", Bytes::from_static(b"s1"), Some(Duration::from_secs(10)))
            .await
            .unwrap();
        cache
            .set("forever", Bytes::from_static(b"f"), None)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(
            cache.get("session").await,
            Ok(Some(Bytes::from_static(b"s1")))
        );

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("session").await, Ok(None));
        assert!(cache.contains("forever"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_expiry_keeps_entry() {
        let cache = MemoryCache::new();
        cache
            .set("far", Bytes::from_static(b"x"), Some(Duration::MAX))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(cache.get("far").await, Ok(Some(Bytes::from_static(b"x"))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_and_delete_ignore_expired() {
        let cache = MemoryCache::new();
        cache
            .set("a", Bytes::from_static(b"1"), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        cache
            .set("b", Bytes::from_static(b"2"), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        cache
            .set("c", Bytes::from_static(b"3"), Some(Duration::from_secs(60)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.delete("a").await, Ok(false));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.delete("c").await, Ok(true));
    }
}
