//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the collaborator traits,
//! allowing engine, bulk and export tests without a search server or a real
//! artifact tree.
//!
//! # Example
//!
//! ```rust,ignore
//! use nzbdex_core::testing::{fixtures, FixedSettings, MockArtifactStore, MockSearchIndex};
//!
//! let store = fixtures::seeded_store();
//! let index = MockSearchIndex::new();
//! let settings = FixedSettings::new(Some(0));
//!
//! let id = store.insert_release(&fixtures::release("guid-1", "Some.Show.S01E01", 5040))?;
//! index.add_document(id, "Some.Show.S01E01").await;
//! ```

mod mock_artifact_store;
mod mock_search_index;

pub use mock_artifact_store::MockArtifactStore;
pub use mock_search_index::{MockSearchIndex, RecordedQuery};

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::query::SettingsSource;
use crate::store::StoreError;

/// Settings source with an adjustable password visibility value.
#[derive(Debug)]
pub struct FixedSettings {
    /// `i64::MIN` stands for "not set".
    value: AtomicI64,
    /// When set, reads fail as if the settings table were unreachable.
    unavailable: AtomicBool,
}

impl FixedSettings {
    pub fn new(value: Option<i64>) -> Self {
        Self {
            value: AtomicI64::new(value.unwrap_or(i64::MIN)),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set(&self, value: Option<i64>) {
        self.value
            .store(value.unwrap_or(i64::MIN), Ordering::SeqCst);
    }

    /// Make subsequent reads fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl SettingsSource for FixedSettings {
    fn password_setting(&self) -> Result<Option<i64>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database("settings unavailable".to_string()));
        }
        Ok(Some(self.value.load(Ordering::SeqCst)).filter(|v| *v != i64::MIN))
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use crate::config::{Config, SearchIndexConfig, StorageConfig};
    use crate::store::{NewRelease, SqliteReleaseStore};

    /// Parent and child categories loaded by [`seeded_store`].
    pub const CATEGORIES: &[(i64, &str, Option<i64>)] = &[
        (2000, "Movies", None),
        (2030, "SD", Some(2000)),
        (2040, "HD", Some(2000)),
        (5000, "TV", None),
        (5030, "SD", Some(5000)),
        (5040, "HD", Some(5000)),
        (5070, "Anime", Some(5000)),
        (7000, "Other", None),
        (7010, "Misc", Some(7000)),
    ];

    /// In-memory store with the standard category tree.
    pub fn seeded_store() -> Arc<SqliteReleaseStore> {
        let store = SqliteReleaseStore::in_memory().expect("in-memory store");
        for (id, title, parent) in CATEGORIES {
            store
                .insert_category(*id, title, *parent)
                .expect("insert category");
        }
        Arc::new(store)
    }

    /// A processed, password-free release posted now.
    pub fn release(guid: &str, searchname: &str, category: i64) -> NewRelease {
        NewRelease::new(guid, searchname, category)
    }

    /// A release posted `days` days ago.
    pub fn release_posted(guid: &str, searchname: &str, category: i64, days: i64) -> NewRelease {
        let mut release = NewRelease::new(guid, searchname, category);
        release.postdate = Utc::now() - Duration::days(days);
        release
    }

    /// Configuration with artifact paths under `root` and an index section.
    pub fn test_config(root: &Path) -> Config {
        Config {
            search: Some(SearchIndexConfig::default()),
            storage: StorageConfig {
                nzb_path: root.join("nzb"),
                covers_path: root.join("covers"),
                tmp_path: root.join("tmp"),
                nzb_split_level: 1,
            },
            ..Config::default()
        }
    }
}
