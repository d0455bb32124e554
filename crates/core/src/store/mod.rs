//! Relational release store.
//!
//! The query engine only reads through compiled [`Statement`]s; the few write
//! paths (delete, bulk update) are dedicated methods.

mod sqlite;
mod types;

pub use sqlite::{NewRelease, SqliteReleaseStore, PASSWORD_SETTING};
pub use types::*;

use chrono::{DateTime, Utc};

use crate::query::Statement;

/// Trait for release storage.
pub trait ReleaseStore: Send + Sync {
    /// Execute a compiled listing statement.
    fn fetch_releases(&self, statement: &Statement) -> Result<Vec<Release>, StoreError>;

    /// Execute a compiled count statement.
    fn count(&self, statement: &Statement) -> Result<u64, StoreError>;

    /// All category rows.
    fn categories(&self) -> Result<Vec<Category>, StoreError>;

    /// Resolve a usenet group name to its id.
    fn group_id_by_name(&self, name: &str) -> Result<Option<i64>, StoreError>;

    /// Find a show by site ids and collect its matching episodes.
    fn resolve_show(&self, lookup: &ShowLookup) -> Result<Option<ShowMatch>, StoreError>;

    /// Identity fields of a release, by guid.
    fn release_by_guid(&self, guid: &str) -> Result<Option<ReleaseSummary>, StoreError>;

    /// Identity fields of a release, by id.
    fn release_by_id(&self, id: i64) -> Result<Option<ReleaseSummary>, StoreError>;

    /// Delete a release row and its dependent rows. Returns rows removed.
    fn delete_by_guid(&self, guid: &str) -> Result<u64, StoreError>;

    /// Apply `update` to every release in `guids`. Returns rows affected.
    fn update_many(&self, guids: &[String], update: &ReleaseUpdate) -> Result<u64, StoreError>;

    /// Releases listed by the export form.
    fn releases_for_export(&self, filter: &ExportFilter) -> Result<Vec<ExportEntry>, StoreError>;

    /// Earliest and latest post date over all releases.
    #[allow(clippy::type_complexity)]
    fn post_date_bounds(&self)
        -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), StoreError>;

    /// Groups that have at least one release, by name.
    fn released_groups(&self) -> Result<Vec<(i64, String)>, StoreError>;
}
