//! Caller-facing request parameters for each listing surface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Category id meaning "no restriction".
pub const ANY_CATEGORY: i64 = -1;

/// Offset/limit pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Page {
    pub offset: u32,
    /// `0` means the configured `items_per_page`.
    pub limit: u32,
}

impl Page {
    pub fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }

    pub fn first(limit: u32) -> Self {
        Self { offset: 0, limit }
    }

    /// Resolve a zero limit to the given default.
    pub fn or_default_limit(self, default_limit: u32) -> Self {
        if self.limit == 0 {
            Self {
                offset: self.offset,
                limit: default_limit,
            }
        } else {
            self
        }
    }

    /// Pagination component of a cache fingerprint.
    pub fn token(&self) -> String {
        format!("{}:{}", self.offset, self.limit)
    }
}

/// Filters shared by every surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonFilters {
    /// Category or parent-category ids; empty or `[-1]` means any.
    pub categories: Vec<i64>,
    pub excluded_categories: Vec<i64>,
    /// Only releases posted within this many days.
    pub max_age_days: Option<u32>,
    /// Absolute minimum size in bytes.
    pub min_size: Option<u64>,
    pub tags: Vec<String>,
    /// Usenet group name.
    pub group: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowseRequest {
    pub filters: CommonFilters,
    /// Sort token such as `posted_desc`.
    pub order: String,
    pub page: Page,
}

/// How the category filter of a generic search is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    /// Category ids expand through the category tree.
    #[default]
    Basic,
    /// Only the first category id applies, taken literally.
    Advanced,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Index field name to text, e.g. `searchname -> "ubuntu iso"`.
    pub terms: BTreeMap<String, String>,
    pub kind: SearchKind,
    /// Size bucket index (1..=11), exclusive lower bound.
    pub size_from: Option<u8>,
    /// Size bucket index (1..=11), exclusive upper bound.
    pub size_to: Option<u8>,
    /// Only releases posted more than this many days ago.
    pub days_new: Option<u32>,
    /// Only releases posted within this many days.
    pub days_old: Option<u32>,
    pub filters: CommonFilters,
    pub order: String,
    pub page: Page,
}

impl SearchRequest {
    /// Terms with a non-blank value.
    pub fn effective_terms(&self) -> BTreeMap<String, String> {
        self.terms
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.clone(), v.trim().to_string()))
            .collect()
    }
}

/// External sites a TV show can be identified by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteId {
    Tvdb,
    Trakt,
    Tvrage,
    Tvmaze,
    Imdb,
    Tmdb,
}

impl SiteId {
    /// Column on the `videos` table.
    pub fn column(&self) -> &'static str {
        match self {
            SiteId::Tvdb => "tvdb",
            SiteId::Trakt => "trakt",
            SiteId::Tvrage => "tvrage",
            SiteId::Tvmaze => "tvmaze",
            SiteId::Imdb => "imdb",
            SiteId::Tmdb => "tmdb",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TvSearchRequest {
    /// Ids of the show on external sites; non-positive ids are ignored.
    pub site_ids: BTreeMap<SiteId, i64>,
    /// Season token, e.g. `3` or `S03`.
    pub series: String,
    /// Episode token, e.g. `5` or `E05`.
    pub episode: String,
    /// Air date, e.g. `2019-03-01`.
    pub airdate: String,
    pub name: String,
    pub filters: CommonFilters,
    pub page: Page,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieSearchRequest {
    pub imdb_id: Option<i64>,
    pub tmdb_id: Option<i64>,
    pub trakt_id: Option<i64>,
    pub name: String,
    pub filters: CommonFilters,
    pub page: Page,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimeSearchRequest {
    pub anidb_id: Option<i64>,
    pub name: String,
    pub filters: CommonFilters,
    pub page: Page,
}

/// A user's subscription to a TV show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowSubscription {
    pub video_id: i64,
    /// Restrict to these categories; empty means any TV category.
    pub categories: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowsRequest {
    pub subscriptions: Vec<ShowSubscription>,
    pub excluded_categories: Vec<i64>,
    pub max_age_days: Option<u32>,
    pub order: String,
    pub page: Page,
}
