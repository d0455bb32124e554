use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::SiteId;

/// Timestamp format used for release dates in the store.
pub const STORE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `nzbstatus` value of a release whose NZB has been written.
pub const NZB_ADDED: i64 = 1;

/// Parse a stored timestamp.
pub fn parse_store_datetime(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, STORE_DATETIME_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

/// Format a timestamp for storage.
pub fn format_store_datetime(value: &DateTime<Utc>) -> String {
    value.format(STORE_DATETIME_FORMAT).to_string()
}

/// A category row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    /// `None` for root categories.
    pub parent_id: Option<i64>,
}

/// TV show metadata joined onto a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowInfo {
    pub title: String,
    pub tvdb: i64,
    pub trakt: i64,
    pub tvrage: i64,
    pub tvmaze: i64,
    pub imdb: i64,
    pub tmdb: i64,
}

/// TV episode metadata joined onto a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    pub series: i64,
    pub episode: i64,
    pub title: String,
    pub firstaired: Option<String>,
}

/// Movie metadata joined onto a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieInfo {
    pub imdbid: i64,
    pub tmdbid: i64,
    pub traktid: i64,
    pub title: String,
}

/// A listed release with whatever metadata its surface projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub id: i64,
    pub guid: String,
    pub searchname: String,
    pub fromname: String,
    pub size: i64,
    pub totalpart: i64,
    pub grabs: i64,
    pub comments: i64,
    pub postdate: Option<DateTime<Utc>>,
    pub adddate: Option<DateTime<Utc>>,
    pub categories_id: i64,
    pub groups_id: i64,
    pub passwordstatus: i64,
    pub videos_id: i64,
    pub tv_episodes_id: i64,
    pub anidbid: i64,
    pub imdbid: i64,
    /// `"Parent > Sub"` display label.
    pub category_name: Option<String>,
    /// `"parent,child"` id pair.
    pub category_ids: Option<String>,
    pub category_parent_id: Option<i64>,
    pub group_name: Option<String>,
    pub has_nfo: bool,
    pub has_video_data: bool,
    pub has_extra_info: bool,
    /// Number of failure reports.
    pub failed: i64,
    pub show: Option<ShowInfo>,
    pub episode: Option<EpisodeInfo>,
    pub movie: Option<MovieInfo>,
}

/// A page of releases with the capped total for the whole query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    pub items: Vec<Release>,
    pub total: u64,
}

impl ResultPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Identity fields of a release looked up by guid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSummary {
    pub id: i64,
    pub guid: String,
    pub searchname: String,
    pub categories_id: i64,
}

/// Fields changed by a bulk update. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseUpdate {
    /// `Some(-1)` also keeps the current category.
    pub category_id: Option<i64>,
    pub grabs: Option<i64>,
    pub video_id: Option<i64>,
    pub episode_id: Option<i64>,
    pub anidb_id: Option<i64>,
    pub imdb_id: Option<i64>,
}

impl ReleaseUpdate {
    /// `(column, value)` assignments this update performs.
    pub fn assignments(&self) -> Vec<(&'static str, i64)> {
        let category = self.category_id.filter(|id| *id != -1);
        [
            ("categories_id", category),
            ("grabs", self.grabs),
            ("videos_id", self.video_id),
            ("tv_episodes_id", self.episode_id),
            ("anidbid", self.anidb_id),
            ("imdbid", self.imdb_id),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.map(|v| (column, v)))
        .collect()
    }
}

/// Lookup of a TV show (and optionally its episodes) by external site ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowLookup {
    /// Matched with OR: any site id identifies the show.
    pub site_ids: Vec<(SiteId, i64)>,
    pub series: Option<u32>,
    pub episode: Option<u32>,
    /// Compared against the episode's first-aired day.
    pub airdate: Option<String>,
}

/// Result of a [`ShowLookup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowMatch {
    pub video_id: i64,
    /// Episodes matching the lookup's series/episode/airdate filters.
    pub episode_ids: Vec<i64>,
}

/// A release row as listed by the export form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    pub guid: String,
    pub searchname: String,
    pub group_name: Option<String>,
    /// `"Parent_Sub"` label.
    pub category_name: Option<String>,
}

/// Filter for the export listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFilter {
    /// Inclusive first day, `YYYY-MM-DD 00:00:00`.
    pub posted_from: Option<String>,
    /// Inclusive last day, `YYYY-MM-DD 23:59:59`.
    pub posted_to: Option<String>,
    pub group_id: Option<i64>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
