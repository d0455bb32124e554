use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub search: Option<SearchIndexConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub bulk: BulkConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("nzbdex.db")
}

/// Cache time-to-live tiers, in minutes.
///
/// Counts use the short tier, result pages the medium tier and the
/// category tree snapshot the long tier.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_short_minutes")]
    pub short_minutes: u32,
    #[serde(default = "default_medium_minutes")]
    pub medium_minutes: u32,
    #[serde(default = "default_long_minutes")]
    pub long_minutes: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            short_minutes: default_short_minutes(),
            medium_minutes: default_medium_minutes(),
            long_minutes: default_long_minutes(),
        }
    }
}

fn default_short_minutes() -> u32 {
    5
}

fn default_medium_minutes() -> u32 {
    10
}

fn default_long_minutes() -> u32 {
    1440
}

/// Pagination configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PagingConfig {
    /// Default page size when the caller does not supply one.
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,
    /// Upper bound on rows scanned by a pager count query.
    #[serde(default = "default_max_pager_results")]
    pub max_pager_results: u64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            items_per_page: default_items_per_page(),
            max_pager_results: default_max_pager_results(),
        }
    }
}

fn default_items_per_page() -> u32 {
    50
}

fn default_max_pager_results() -> u64 {
    125_000
}

/// Full-text search index configuration (Manticore HTTP API)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchIndexConfig {
    /// Manticore HTTP endpoint (e.g., "http://localhost:9308")
    #[serde(default = "default_search_url")]
    pub url: String,
    /// Real-time index holding release documents
    #[serde(default = "default_index_name")]
    pub index: String,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Maximum number of document ids requested per search
    #[serde(default = "default_max_matches")]
    pub max_matches: u32,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            url: default_search_url(),
            index: default_index_name(),
            timeout_secs: default_timeout(),
            max_matches: default_max_matches(),
        }
    }
}

fn default_search_url() -> String {
    "http://127.0.0.1:9308".to_string()
}

fn default_index_name() -> String {
    "releases_rt".to_string()
}

fn default_timeout() -> u32 {
    10
}

fn default_max_matches() -> u32 {
    10_000
}

/// Artifact storage locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_nzb_path")]
    pub nzb_path: PathBuf,
    #[serde(default = "default_covers_path")]
    pub covers_path: PathBuf,
    /// Where export archives are written.
    #[serde(default = "default_tmp_path")]
    pub tmp_path: PathBuf,
    /// Number of leading guid characters used as nested directories.
    #[serde(default = "default_split_level")]
    pub nzb_split_level: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            nzb_path: default_nzb_path(),
            covers_path: default_covers_path(),
            tmp_path: default_tmp_path(),
            nzb_split_level: default_split_level(),
        }
    }
}

fn default_nzb_path() -> PathBuf {
    PathBuf::from("nzb")
}

fn default_covers_path() -> PathBuf {
    PathBuf::from("covers")
}

fn default_tmp_path() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_split_level() -> usize {
    1
}

/// Bulk operation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BulkConfig {
    /// How many releases are deleted concurrently.
    #[serde(default = "default_delete_concurrency")]
    pub delete_concurrency: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            delete_concurrency: default_delete_concurrency(),
        }
    }
}

fn default_delete_concurrency() -> usize {
    4
}
