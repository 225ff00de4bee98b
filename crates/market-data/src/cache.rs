//! Small in-process TTL cache for upstream responses.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Entry count above which an insert first drops every expired entry.
pub const SWEEP_THRESHOLD: usize = 500;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Mutex-guarded map with a fixed per-entry time to live.
///
/// Expired entries are never returned. They are removed lazily: on lookup,
/// and in one sweep whenever an insert finds the map over
/// [`SWEEP_THRESHOLD`] entries.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let now = Instant::now();
        if entries.len() > SWEEP_THRESHOLD {
            entries.retain(|_, entry| entry.expires_at > now);
        }
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("tcs".to_string(), 1u32);
        assert_eq!(cache.get(&"tcs".to_string()), Some(1));
        assert_eq!(cache.get(&"infy".to_string()), None);
    }

    #[test]
    fn test_expired_entry_is_dropped_on_read() {
        let cache = TtlCache::new(Duration::from_millis(10));
        cache.insert("tcs", 1u32);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&"tcs"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_runs_above_threshold() {
        let cache = TtlCache::new(Duration::from_millis(10));
        for i in 0..=SWEEP_THRESHOLD {
            cache.insert(i, i);
        }
        assert_eq!(cache.len(), SWEEP_THRESHOLD + 1);

        std::thread::sleep(Duration::from_millis(20));
        cache.insert(usize::MAX, 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_no_sweep_at_or_below_threshold() {
        let cache = TtlCache::new(Duration::from_millis(10));
        for i in 0..SWEEP_THRESHOLD {
            cache.insert(i, i);
        }
        std::thread::sleep(Duration::from_millis(20));
        cache.insert(usize::MAX, 0);
        // Expired entries stay until a read or a sweep removes them
        assert_eq!(cache.len(), SWEEP_THRESHOLD + 1);
    }
}
