//! Result cache keyed by query fingerprint.

mod memory;

pub use memory::MemoryCache;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::ResultPage;

/// Deterministic content hash of a rendered query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash the given parts in order. Parts are separated so that
    /// `["ab", "c"]` and `["a", "bc"]` differ.
    pub fn compute(parts: &[&str]) -> Self {
        let mut ctx = md5::Context::new();
        for part in parts {
            ctx.consume(part.as_bytes());
            ctx.consume([0x1f]);
        }
        Self(format!("{:x}", ctx.compute()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached query outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CachedValue {
    Page(ResultPage),
    Count(u64),
}

/// Trait for result caches.
///
/// Implementations must never return an entry past its expiry.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &Fingerprint) -> Option<CachedValue>;

    fn put(&self, key: Fingerprint, value: CachedValue, expires_at: DateTime<Utc>);

    /// Drop every entry.
    fn clear(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = Fingerprint::compute(&["SELECT 1", "0:50"]);
        let b = Fingerprint::compute(&["SELECT 1", "0:50"]);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_fingerprint_part_boundaries_matter() {
        assert_ne!(
            Fingerprint::compute(&["ab", "c"]),
            Fingerprint::compute(&["a", "bc"])
        );
    }

    #[test]
    fn test_fingerprint_page_token_matters() {
        assert_ne!(
            Fingerprint::compute(&["SELECT 1", "0:50"]),
            Fingerprint::compute(&["SELECT 1", "50:50"])
        );
    }
}
