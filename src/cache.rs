use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::{Duration, PrimitiveDateTime};

use crate::clock::Clock;

/// Key/value store with per-entry expiry. A miss is never an error.
pub trait Cache<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;
    fn set(&self, key: &str, value: V, ttl: Duration);
    fn delete(&self, key: &str);
    fn clear(&self);

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at: PrimitiveDateTime,
}

/// In-process cache. Check-then-set sequences in callers are not atomic, but
/// each individual operation is.
pub struct MemoryCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V> MemoryCache<V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live and expired entries still held.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

impl<V: Clone + Send> Cache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries();
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.entries()
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    fn delete(&self, key: &str) {
        self.entries().remove(key);
    }

    fn clear(&self) {
        self.entries().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use time::macros::datetime;

    fn cache() -> (Arc<FixedClock>, MemoryCache<String>) {
        let clock = Arc::new(FixedClock::new(datetime!(2024-01-01 00:00:00)));
        let cache = MemoryCache::new(clock.clone());
        (clock, cache)
    }

    #[test]
    fn returns_value_until_expiry() {
        let (clock, cache) = cache();
        cache.set("k", "v".to_string(), Duration::seconds(10));
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        clock.advance(Duration::seconds(9));
        assert!(cache.has("k"));

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty(), "expired entry should be evicted on read");
    }

    #[test]
    fn delete_and_clear_remove_entries() {
        let (_clock, cache) = cache();
        cache.set("a", "1".to_string(), Duration::HOUR);
        cache.set("b", "2".to_string(), Duration::HOUR);
        cache.delete("a");
        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_keys_are_plain_misses() {
        let (_clock, cache) = cache();
        assert_eq!(cache.get("nothing"), None);
        cache.delete("nothing");
    }

    #[test]
    fn purge_expired_keeps_live_entries() {
        let (clock, cache) = cache();
        cache.set("short", "1".to_string(), Duration::seconds(1));
        cache.set("long", "2".to_string(), Duration::HOUR);
        clock.advance(Duration::minutes(1));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn shared_across_threads() {
        let (_clock, cache) = cache();
        let cache = Arc::new(cache);
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        cache.set(&format!("{worker}:{i}"), i.to_string(), Duration::HOUR);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker should finish");
        }
        assert_eq!(cache.len(), 200);
    }
}
