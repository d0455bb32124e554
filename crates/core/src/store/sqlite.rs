//! SQLite-backed release store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::types::ToSqlOutput;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};

use super::types::{
    format_store_datetime, parse_store_datetime, Category, EpisodeInfo, ExportEntry,
    ExportFilter, MovieInfo, Release, ReleaseSummary, ReleaseUpdate, ShowInfo, ShowLookup,
    ShowMatch, StoreError, NZB_ADDED,
};
use super::ReleaseStore;
use crate::query::{SettingsSource, SiteId, SqlParam, Statement};

/// Settings key of the password visibility policy.
pub const PASSWORD_SETTING: &str = "showpasswordedrelease";

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlParam::Int(v) => v.to_sql(),
            SqlParam::Text(v) => v.to_sql(),
        }
    }
}

/// A release row to insert.
#[derive(Debug, Clone)]
pub struct NewRelease {
    pub guid: String,
    pub name: String,
    pub searchname: String,
    pub fromname: String,
    pub size: i64,
    pub totalpart: i64,
    pub grabs: i64,
    pub comments: i64,
    pub postdate: DateTime<Utc>,
    pub adddate: DateTime<Utc>,
    pub categories_id: i64,
    pub groups_id: i64,
    pub nzbstatus: i64,
    pub passwordstatus: i64,
    pub videos_id: i64,
    pub tv_episodes_id: i64,
    pub movieinfo_id: Option<i64>,
    pub anidbid: i64,
    pub imdbid: i64,
}

impl NewRelease {
    /// A processed, password-free release posted now.
    pub fn new(guid: &str, searchname: &str, categories_id: i64) -> Self {
        let now = Utc::now();
        Self {
            guid: guid.to_string(),
            name: searchname.to_string(),
            searchname: searchname.to_string(),
            fromname: "poster@example.com".to_string(),
            size: 0,
            totalpart: 0,
            grabs: 0,
            comments: 0,
            postdate: now,
            adddate: now,
            categories_id,
            groups_id: 0,
            nzbstatus: NZB_ADDED,
            passwordstatus: 0,
            videos_id: 0,
            tv_episodes_id: 0,
            movieinfo_id: None,
            anidbid: 0,
            imdbid: 0,
        }
    }
}

/// SQLite-backed release store.
pub struct SqliteReleaseStore {
    conn: Mutex<Connection>,
}

impl SqliteReleaseStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                parentid INTEGER
            );

            CREATE TABLE IF NOT EXISTS usenet_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS releases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guid TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL DEFAULT '',
                searchname TEXT NOT NULL,
                fromname TEXT NOT NULL DEFAULT '',
                size INTEGER NOT NULL DEFAULT 0,
                totalpart INTEGER NOT NULL DEFAULT 0,
                grabs INTEGER NOT NULL DEFAULT 0,
                comments INTEGER NOT NULL DEFAULT 0,
                postdate TEXT,
                adddate TEXT,
                categories_id INTEGER NOT NULL DEFAULT 10,
                groups_id INTEGER NOT NULL DEFAULT 0,
                nzbstatus INTEGER NOT NULL DEFAULT 0,
                passwordstatus INTEGER NOT NULL DEFAULT 0,
                videos_id INTEGER NOT NULL DEFAULT 0,
                tv_episodes_id INTEGER NOT NULL DEFAULT 0,
                movieinfo_id INTEGER,
                anidbid INTEGER NOT NULL DEFAULT 0,
                imdbid INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_releases_categories_id ON releases(categories_id);
            CREATE INDEX IF NOT EXISTS idx_releases_postdate ON releases(postdate);
            CREATE INDEX IF NOT EXISTS idx_releases_groups_id ON releases(groups_id);
            CREATE INDEX IF NOT EXISTS idx_releases_videos_id ON releases(videos_id, tv_episodes_id);

            CREATE TABLE IF NOT EXISTS videos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type INTEGER NOT NULL DEFAULT 0,
                title TEXT NOT NULL,
                tvdb INTEGER NOT NULL DEFAULT 0,
                trakt INTEGER NOT NULL DEFAULT 0,
                tvrage INTEGER NOT NULL DEFAULT 0,
                tvmaze INTEGER NOT NULL DEFAULT 0,
                imdb INTEGER NOT NULL DEFAULT 0,
                tmdb INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS tv_episodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                videos_id INTEGER NOT NULL,
                series INTEGER NOT NULL DEFAULT 0,
                episode INTEGER NOT NULL DEFAULT 0,
                title TEXT NOT NULL DEFAULT '',
                firstaired TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_tv_episodes_videos_id ON tv_episodes(videos_id);

            CREATE TABLE IF NOT EXISTS tv_info (
                videos_id INTEGER PRIMARY KEY,
                summary TEXT,
                publisher TEXT
            );

            CREATE TABLE IF NOT EXISTS movieinfo (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                imdbid INTEGER NOT NULL,
                tmdbid INTEGER NOT NULL DEFAULT 0,
                traktid INTEGER NOT NULL DEFAULT 0,
                title TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS release_nfos (
                releases_id INTEGER PRIMARY KEY,
                nfo BLOB
            );

            CREATE TABLE IF NOT EXISTS video_data (
                releases_id INTEGER PRIMARY KEY,
                containerformat TEXT,
                videocodec TEXT
            );

            CREATE TABLE IF NOT EXISTS releaseextrafull (
                releases_id INTEGER PRIMARY KEY,
                mediainfo TEXT
            );

            CREATE TABLE IF NOT EXISTS dnzb_failures (
                release_id INTEGER NOT NULL,
                users_id INTEGER NOT NULL,
                failed INTEGER NOT NULL DEFAULT 1,
                PRIMARY KEY (release_id, users_id)
            );

            CREATE TABLE IF NOT EXISTS release_tags (
                releases_id INTEGER NOT NULL,
                tag_name TEXT NOT NULL,
                PRIMARY KEY (releases_id, tag_name)
            );

            CREATE TABLE IF NOT EXISTS settings (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_category(
        &self,
        id: i64,
        title: &str,
        parent_id: Option<i64>,
    ) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO categories (id, title, parentid) VALUES (?, ?, ?)",
                params![id, title, parent_id],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn insert_group(&self, name: &str) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute("INSERT INTO usenet_groups (name) VALUES (?)", params![name])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_release(&self, release: &NewRelease) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO releases (guid, name, searchname, fromname, size, totalpart, grabs,
                comments, postdate, adddate, categories_id, groups_id, nzbstatus, passwordstatus,
                videos_id, tv_episodes_id, movieinfo_id, anidbid, imdbid)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                release.guid,
                release.name,
                release.searchname,
                release.fromname,
                release.size,
                release.totalpart,
                release.grabs,
                release.comments,
                format_store_datetime(&release.postdate),
                format_store_datetime(&release.adddate),
                release.categories_id,
                release.groups_id,
                release.nzbstatus,
                release.passwordstatus,
                release.videos_id,
                release.tv_episodes_id,
                release.movieinfo_id,
                release.anidbid,
                release.imdbid,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a TV show identified on the given sites.
    pub fn insert_video(
        &self,
        title: &str,
        site_ids: &[(SiteId, i64)],
    ) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute("INSERT INTO videos (title) VALUES (?)", params![title])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let id = conn.last_insert_rowid();
        for (site, site_id) in site_ids {
            conn.execute(
                &format!("UPDATE videos SET {} = ? WHERE id = ?", site.column()),
                params![site_id, id],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        Ok(id)
    }

    pub fn insert_episode(
        &self,
        video_id: i64,
        series: i64,
        episode: i64,
        title: &str,
        firstaired: Option<&str>,
    ) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO tv_episodes (videos_id, series, episode, title, firstaired)
             VALUES (?, ?, ?, ?, ?)",
            params![video_id, series, episode, title, firstaired],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_movie(
        &self,
        imdbid: i64,
        tmdbid: i64,
        traktid: i64,
        title: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO movieinfo (imdbid, tmdbid, traktid, title) VALUES (?, ?, ?, ?)",
            params![imdbid, tmdbid, traktid, title],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn tag_release(&self, release_id: i64, tag: &str) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO release_tags (releases_id, tag_name) VALUES (?, ?)",
                params![release_id, tag],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn add_nfo(&self, release_id: i64, nfo: &[u8]) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO release_nfos (releases_id, nfo) VALUES (?, ?)",
                params![release_id, nfo],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn report_failure(&self, release_id: i64, user_id: i64) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO dnzb_failures (release_id, users_id) VALUES (?, ?)",
                params![release_id, user_id],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn set_setting(&self, name: &str, value: &str) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO settings (name, value) VALUES (?, ?)
                 ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                params![name, value],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn setting(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.conn()
            .query_row(
                "SELECT value FROM settings WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn row_to_summary(row: &Row) -> rusqlite::Result<ReleaseSummary> {
        Ok(ReleaseSummary {
            id: row.get(0)?,
            guid: row.get(1)?,
            searchname: row.get(2)?,
            categories_id: row.get(3)?,
        })
    }

    fn build_export_where_clause(filter: &ExportFilter) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ref from) = filter.posted_from {
            conditions.push("r.postdate >= ?");
            params.push(Box::new(from.clone()));
        }

        if let Some(ref to) = filter.posted_to {
            conditions.push("r.postdate <= ?");
            params.push(Box::new(to.clone()));
        }

        if let Some(group_id) = filter.group_id {
            conditions.push("r.groups_id = ?");
            params.push(Box::new(group_id));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

fn int_or_zero(row: &Row, column: &str) -> rusqlite::Result<i64> {
    Ok(row.get::<_, Option<i64>>(column)?.unwrap_or(0))
}

fn date_column(row: &Row, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(row
        .get::<_, Option<String>>(column)?
        .as_deref()
        .and_then(parse_store_datetime))
}

/// Map a row produced by [`SqlCompiler::select`](crate::query::SqlCompiler::select).
fn row_to_release(row: &Row) -> rusqlite::Result<Release> {
    let show = match row.get::<_, Option<String>>("show_title")? {
        Some(title) => Some(ShowInfo {
            title,
            tvdb: int_or_zero(row, "tvdb")?,
            trakt: int_or_zero(row, "trakt")?,
            tvrage: int_or_zero(row, "tvrage")?,
            tvmaze: int_or_zero(row, "tvmaze")?,
            imdb: int_or_zero(row, "show_imdb")?,
            tmdb: int_or_zero(row, "show_tmdb")?,
        }),
        None => None,
    };

    let episode = match row.get::<_, Option<i64>>("series")? {
        Some(series) => Some(EpisodeInfo {
            series,
            episode: int_or_zero(row, "episode")?,
            title: row
                .get::<_, Option<String>>("episode_title")?
                .unwrap_or_default(),
            firstaired: row.get("firstaired")?,
        }),
        None => None,
    };

    let movie = match row.get::<_, Option<i64>>("movie_imdbid")? {
        Some(imdbid) => Some(MovieInfo {
            imdbid,
            tmdbid: int_or_zero(row, "movie_tmdbid")?,
            traktid: int_or_zero(row, "movie_traktid")?,
            title: row
                .get::<_, Option<String>>("movie_title")?
                .unwrap_or_default(),
        }),
        None => None,
    };

    Ok(Release {
        id: row.get("id")?,
        guid: row.get("guid")?,
        searchname: row.get("searchname")?,
        fromname: row.get("fromname")?,
        size: row.get("size")?,
        totalpart: row.get("totalpart")?,
        grabs: row.get("grabs")?,
        comments: row.get("comments")?,
        postdate: date_column(row, "postdate")?,
        adddate: date_column(row, "adddate")?,
        categories_id: row.get("categories_id")?,
        groups_id: row.get("groups_id")?,
        passwordstatus: row.get("passwordstatus")?,
        videos_id: row.get("videos_id")?,
        tv_episodes_id: row.get("tv_episodes_id")?,
        anidbid: row.get("anidbid")?,
        imdbid: row.get("imdbid")?,
        category_name: row.get("category_name")?,
        category_ids: row.get("category_ids")?,
        category_parent_id: row.get("category_parent_id")?,
        group_name: row.get("group_name")?,
        has_nfo: row.get::<_, Option<i64>>("nfo_id")?.is_some(),
        has_video_data: row.get::<_, Option<i64>>("video_data_id")?.is_some(),
        has_extra_info: row.get::<_, Option<i64>>("extra_id")?.is_some(),
        failed: int_or_zero(row, "failed")?,
        show,
        episode,
        movie,
    })
}

impl ReleaseStore for SqliteReleaseStore {
    fn fetch_releases(&self, statement: &Statement) -> Result<Vec<Release>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&statement.sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params_from_iter(statement.params.iter()), row_to_release)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut releases = Vec::new();
        for row in rows {
            releases.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(releases)
    }

    fn count(&self, statement: &Statement) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn()
            .query_row(
                &statement.sql,
                params_from_iter(statement.params.iter()),
                |row| row.get(0),
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn categories(&self) -> Result<Vec<Category>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, title, parentid FROM categories ORDER BY id")
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    parent_id: row.get(2)?,
                })
            })
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(categories)
    }

    fn group_id_by_name(&self, name: &str) -> Result<Option<i64>, StoreError> {
        self.conn()
            .query_row(
                "SELECT id FROM usenet_groups WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn resolve_show(&self, lookup: &ShowLookup) -> Result<Option<ShowMatch>, StoreError> {
        if lookup.site_ids.is_empty() {
            return Ok(None);
        }

        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        let site_conditions: Vec<String> = lookup
            .site_ids
            .iter()
            .map(|(site, id)| {
                params.push(Box::new(*id));
                format!("v.{} = ?", site.column())
            })
            .collect();

        let mut conditions = vec![format!("({})", site_conditions.join(" OR "))];
        if let Some(series) = lookup.series {
            conditions.push("tve.series = ?".to_string());
            params.push(Box::new(series));
        }
        if let Some(episode) = lookup.episode {
            conditions.push("tve.episode = ?".to_string());
            params.push(Box::new(episode));
        }
        if let Some(ref airdate) = lookup.airdate {
            conditions.push("date(tve.firstaired) = ?".to_string());
            params.push(Box::new(airdate.clone()));
        }

        let sql = format!(
            "SELECT v.id, GROUP_CONCAT(tve.id) FROM videos v
             LEFT JOIN tv_episodes tve ON tve.videos_id = v.id
             WHERE {} GROUP BY v.id ORDER BY v.id LIMIT 1",
            conditions.join(" AND ")
        );

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let found: Option<(i64, Option<String>)> = self
            .conn()
            .query_row(&sql, param_refs.as_slice(), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(found.map(|(video_id, episodes)| {
            let mut episode_ids: Vec<i64> = episodes
                .unwrap_or_default()
                .split(',')
                .filter_map(|id| id.trim().parse().ok())
                .collect();
            episode_ids.sort_unstable();
            ShowMatch {
                video_id,
                episode_ids,
            }
        }))
    }

    fn release_by_guid(&self, guid: &str) -> Result<Option<ReleaseSummary>, StoreError> {
        self.conn()
            .query_row(
                "SELECT id, guid, searchname, categories_id FROM releases WHERE guid = ?",
                params![guid],
                Self::row_to_summary,
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn release_by_id(&self, id: i64) -> Result<Option<ReleaseSummary>, StoreError> {
        self.conn()
            .query_row(
                "SELECT id, guid, searchname, categories_id FROM releases WHERE id = ?",
                params![id],
                Self::row_to_summary,
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn delete_by_guid(&self, guid: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let id: Option<i64> = tx
            .query_row(
                "SELECT id FROM releases WHERE guid = ?",
                params![guid],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let Some(id) = id else {
            return Ok(0);
        };

        for sql in [
            "DELETE FROM release_nfos WHERE releases_id = ?",
            "DELETE FROM video_data WHERE releases_id = ?",
            "DELETE FROM releaseextrafull WHERE releases_id = ?",
            "DELETE FROM release_tags WHERE releases_id = ?",
            "DELETE FROM dnzb_failures WHERE release_id = ?",
        ] {
            tx.execute(sql, params![id])
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        let deleted = tx
            .execute("DELETE FROM releases WHERE id = ?", params![id])
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tx.commit()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(deleted as u64)
    }

    fn update_many(&self, guids: &[String], update: &ReleaseUpdate) -> Result<u64, StoreError> {
        let assignments = update.assignments();
        if guids.is_empty() || assignments.is_empty() {
            return Err(StoreError::InvalidInput(
                "update needs at least one release and one field".to_string(),
            ));
        }

        let set_clause = assignments
            .iter()
            .map(|(column, _)| format!("{} = ?", column))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE releases SET {} WHERE guid IN ({})",
            set_clause,
            vec!["?"; guids.len()].join(", ")
        );

        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        for (_, value) in &assignments {
            params.push(Box::new(*value));
        }
        for guid in guids {
            params.push(Box::new(guid.clone()));
        }
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let updated = self
            .conn()
            .execute(&sql, param_refs.as_slice())
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(updated as u64)
    }

    fn releases_for_export(&self, filter: &ExportFilter) -> Result<Vec<ExportEntry>, StoreError> {
        let conn = self.conn();
        let (where_clause, params) = Self::build_export_where_clause(filter);

        let sql = format!(
            "SELECT r.guid, r.searchname, g.name, cp.title || '_' || c.title
             FROM releases r
             LEFT JOIN categories c ON c.id = r.categories_id
             LEFT JOIN categories cp ON cp.id = c.parentid
             LEFT JOIN usenet_groups g ON g.id = r.groups_id
             {} ORDER BY r.postdate, r.id",
            where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(ExportEntry {
                    guid: row.get(0)?,
                    searchname: row.get(1)?,
                    group_name: row.get(2)?,
                    category_name: row.get(3)?,
                })
            })
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(entries)
    }

    fn post_date_bounds(
        &self,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), StoreError> {
        let (earliest, latest): (Option<String>, Option<String>) = self
            .conn()
            .query_row(
                "SELECT MIN(postdate), MAX(postdate) FROM releases",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok((
            earliest.as_deref().and_then(parse_store_datetime),
            latest.as_deref().and_then(parse_store_datetime),
        ))
    }

    fn released_groups(&self) -> Result<Vec<(i64, String)>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT g.id, g.name FROM usenet_groups g
                 WHERE EXISTS (SELECT 1 FROM releases r WHERE r.groups_id = g.id)
                 ORDER BY g.name",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(groups)
    }
}

impl SettingsSource for SqliteReleaseStore {
    fn password_setting(&self) -> Result<Option<i64>, StoreError> {
        Ok(self
            .setting(PASSWORD_SETTING)?
            .and_then(|v| v.trim().parse().ok()))
    }
}
