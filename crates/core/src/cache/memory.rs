//! In-process result cache.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use super::{CachedValue, Fingerprint, ResultCache};

struct CacheEntry {
    value: CachedValue,
    expires_at: DateTime<Utc>,
}

/// Bounded in-memory cache with per-entry expiry.
///
/// When full, expired entries are purged first, then the entry closest to
/// expiry is evicted.
pub struct MemoryCache {
    entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
    max_entries: usize,
}

impl MemoryCache {
    pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &Fingerprint) -> Option<CachedValue> {
        let now = Utc::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        None
    }

    fn put(&self, key: Fingerprint, value: CachedValue, expires_at: DateTime<Utc>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let now = Utc::now();
            entries.retain(|_, e| e.expires_at > now);

            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(key, CacheEntry { value, expires_at });
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
