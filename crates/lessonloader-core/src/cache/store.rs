use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::debug;

use super::clock::{Clock, SystemClock};

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub loaded_at: DateTime<Utc>,
    pub schema_version: String,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, loaded_at: DateTime<Utc>, schema_version: impl Into<String>) -> Self {
        Self {
            data,
            loaded_at,
            schema_version: schema_version.into(),
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.loaded_at
    }

    /// Valid iff younger than `ttl` and written under `schema_version`.
    pub fn is_valid(&self, now: DateTime<Utc>, ttl: Duration, schema_version: &str) -> bool {
        self.age(now) < ttl && self.schema_version == schema_version
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let minutes = self.age(now).num_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// TTL + schema-versioned key/value store.
///
/// Operations never fail. Locks are held only for the map access itself.
pub struct TtlCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    ttl: Duration,
    schema_version: String,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration, schema_version: impl Into<String>) -> Self {
        Self::with_clock(ttl, schema_version, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, schema_version: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            schema_version: schema_version.into(),
            clock,
        }
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Fetch a valid entry. Invalid entries are removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let valid = entries
            .get(key)
            .map(|entry| entry.is_valid(now, self.ttl, &self.schema_version))?;
        if valid {
            return entries.get(key).map(|entry| entry.data.clone());
        }
        entries.remove(key);
        debug!(key = key, "Dropped expired cache entry");
        None
    }

    /// Store `data` stamped with the current time and schema version.
    pub fn put(&self, key: &str, data: T) {
        let entry = CacheEntry::new(data, self.clock.now(), self.schema_version.clone());
        self.entries.lock().insert(key.to_string(), entry);
    }

    /// Returns whether an entry was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    pub fn invalidate_all(&self) {
        self.entries.lock().clear();
    }

    /// Remove every entry whose value matches `predicate`. Returns the count removed.
    pub fn invalidate_where(&self, mut predicate: impl FnMut(&str, &T) -> bool) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, entry| !predicate(key, &entry.data));
        before - entries.len()
    }

    /// Sweep all invalid entries. Returns the count removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid(now, self.ttl, &self.schema_version));
        before - entries.len()
    }

    /// Number of stored entries, including ones not yet found to be expired.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable age of a valid entry.
    pub fn age_display(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| entry.is_valid(now, self.ttl, &self.schema_version))
            .map(|entry| entry.age_display(now))
    }

    #[cfg(test)]
    fn insert_entry(&self, key: &str, entry: CacheEntry<T>) {
        self.entries.lock().insert(key.to_string(), entry);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn cache_with_clock(ttl_minutes: i64) -> (TtlCache<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = TtlCache::with_clock(Duration::minutes(ttl_minutes), "1.0.0", clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_put_then_get() {
        let (cache, _) = cache_with_clock(10);
        cache.put("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_put_overwrites() {
        let (cache, _) = cache_with_clock(10);
        cache.put("a", 1);
        cache.put("a", 2);
        assert_eq!(cache.get("a"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ttl_boundary() {
        let (cache, clock) = cache_with_clock(10);
        cache.put("a", 1);

        clock.advance(Duration::minutes(10) - Duration::milliseconds(1));
        assert_eq!(cache.get("a"), Some(1));

        clock.advance(Duration::milliseconds(2));
        assert_eq!(cache.get("a"), None);
        // Lazily purged
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_schema_mismatch_is_a_miss() {
        let (cache, clock) = cache_with_clock(10);
        cache.insert_entry("old", CacheEntry::new(7, clock.now(), "0.9.0"));
        assert_eq!(cache.get("old"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate() {
        let (cache, _) = cache_with_clock(10);
        cache.put("a", 1);
        cache.put("b", 2);
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert_eq!(cache.get("b"), Some(2));

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_where() {
        let (cache, _) = cache_with_clock(10);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);
        let removed = cache.invalidate_where(|_, value| value % 2 == 1);
        assert_eq!(removed, 2);
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn test_purge_expired() {
        let (cache, clock) = cache_with_clock(10);
        cache.put("old", 1);
        clock.advance(Duration::minutes(6));
        cache.put("new", 2);
        clock.advance(Duration::minutes(5));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("new"), Some(2));
    }

    #[test]
    fn test_age_display() {
        let now = Utc::now();
        let entry = CacheEntry::new((), now, "1");
        assert_eq!(entry.age_display(now), "just now");
        assert_eq!(entry.age_display(now + Duration::minutes(5)), "5m ago");
        assert_eq!(entry.age_display(now + Duration::minutes(95)), "2h ago");
        assert_eq!(entry.age_display(now + Duration::hours(26)), "1d ago");
        // Clock skew
        assert_eq!(entry.age_display(now - Duration::minutes(3)), "just now");
    }

    #[test]
    fn test_age_display_for_missing_key() {
        let (cache, _) = cache_with_clock(10);
        assert_eq!(cache.age_display("nope"), None);
        cache.put("a", 1);
        assert_eq!(cache.age_display("a").as_deref(), Some("just now"));
    }
}
