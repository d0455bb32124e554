//! NZB export: bundle stored NZBs into one zip, plus the listing helpers of
//! the export form.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::artifact::ArtifactStore;
use crate::metrics;
use crate::store::{ExportEntry, ExportFilter, ReleaseStore, StoreError};

/// Date format of the export form.
pub const EXPORT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Shown when there are no releases to bound the date pickers.
pub const DEFAULT_EXPORT_DATE: &str = "01/01/2014";

/// Group selector entry meaning any group.
pub const ALL_GROUPS: (i64, &str) = (-1, "--All Groups--");

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid date {0:?}, expected dd/mm/yyyy")]
    InvalidDate(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(String),
}

fn io_error(path: &Path, source: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn parse_form_date(value: &str) -> Result<Option<NaiveDate>, ExportError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, EXPORT_DATE_FORMAT)
        .map(Some)
        .map_err(|_| ExportError::InvalidDate(value.to_string()))
}

/// Zip entry name for a release, unique within the archive.
fn entry_name(display: &str, guid: &str, used: &mut HashSet<String>) -> String {
    let stem: String = display
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let mut name = format!("{}.nzb", stem);
    if used.contains(&name) {
        name = format!("{}-{}.nzb", stem, guid);
    }
    used.insert(name.clone());
    name
}

fn write_archive(path: &Path, entries: &[(String, Vec<u8>)]) -> Result<(), ExportError> {
    let file = std::fs::File::create(path).map_err(|e| io_error(path, e))?;
    let mut zip = ZipWriter::new(file);

    for (name, content) in entries {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name.as_str(), options)
            .map_err(|e| ExportError::Archive(e.to_string()))?;
        zip.write_all(content).map_err(|e| io_error(path, e))?;
    }

    zip.finish()
        .map_err(|e| ExportError::Archive(e.to_string()))?;
    Ok(())
}

/// Collects stored NZBs into export archives.
pub struct ExportCollector {
    store: Arc<dyn ReleaseStore>,
    artifacts: Arc<dyn ArtifactStore>,
    tmp_path: PathBuf,
}

impl ExportCollector {
    pub fn new(
        store: Arc<dyn ReleaseStore>,
        artifacts: Arc<dyn ArtifactStore>,
        tmp_path: PathBuf,
    ) -> Self {
        Self {
            store,
            artifacts,
            tmp_path,
        }
    }

    /// Zip the NZBs of `guids`. Missing or unreadable NZBs are skipped.
    ///
    /// Returns the archive path, or `None` when no NZB was found.
    pub async fn collect(&self, guids: &[String]) -> Result<Option<PathBuf>, ExportError> {
        let mut used = HashSet::new();
        let mut entries = Vec::new();

        for guid in guids {
            let path = match self.artifacts.locate(guid).await {
                Ok(Some(path)) => path,
                Ok(None) => {
                    debug!(guid = %guid, "No stored NZB, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(guid = %guid, error = %e, "Failed to locate NZB");
                    continue;
                }
            };

            let content = match self.artifacts.read_decompressed(&path).await {
                Ok(Some(content)) => content,
                Ok(None) => continue,
                Err(e) => {
                    warn!(guid = %guid, error = %e, "Failed to read NZB");
                    continue;
                }
            };

            let display = match self.store.release_by_guid(guid) {
                Ok(Some(release)) if !release.searchname.trim().is_empty() => release.searchname,
                Ok(_) => guid.clone(),
                Err(e) => {
                    warn!(guid = %guid, error = %e, "Release lookup failed, naming by guid");
                    guid.clone()
                }
            };

            entries.push((entry_name(&display, guid, &mut used), content));
        }

        if entries.is_empty() {
            debug!(requested = guids.len(), "Nothing to export");
            return Ok(None);
        }

        tokio::fs::create_dir_all(&self.tmp_path)
            .await
            .map_err(|e| io_error(&self.tmp_path, e))?;
        let archive = self.tmp_path.join(format!(
            "{}-{}.nzb.zip",
            Utc::now().format("%Y%m%d%H%M%S"),
            uuid::Uuid::new_v4()
        ));

        let count = entries.len();
        let target = archive.clone();
        let written = tokio::task::spawn_blocking(move || write_archive(&target, &entries))
            .await
            .map_err(|e| ExportError::Archive(e.to_string()))?;
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&archive).await;
            return Err(e);
        }

        metrics::EXPORT_ENTRIES.inc_by(count as u64);
        info!(path = %archive.display(), count = count, "Wrote NZB export");
        Ok(Some(archive))
    }

    /// Releases posted between two `dd/mm/yyyy` days (inclusive), optionally
    /// in one group. Blank dates and group `-1` do not filter.
    pub fn listing(
        &self,
        from: &str,
        to: &str,
        group_id: Option<i64>,
    ) -> Result<Vec<ExportEntry>, ExportError> {
        let filter = ExportFilter {
            posted_from: parse_form_date(from)?.map(|d| format!("{} 00:00:00", d.format("%Y-%m-%d"))),
            posted_to: parse_form_date(to)?.map(|d| format!("{} 23:59:59", d.format("%Y-%m-%d"))),
            group_id: group_id.filter(|id| *id != ALL_GROUPS.0),
        };
        Ok(self.store.releases_for_export(&filter)?)
    }

    /// Earliest post date as `dd/mm/yyyy`.
    pub fn earliest_post_date(&self) -> Result<String, ExportError> {
        let (earliest, _) = self.store.post_date_bounds()?;
        Ok(earliest
            .map(|d| d.format(EXPORT_DATE_FORMAT).to_string())
            .unwrap_or_else(|| DEFAULT_EXPORT_DATE.to_string()))
    }

    /// Latest post date as `dd/mm/yyyy`.
    pub fn latest_post_date(&self) -> Result<String, ExportError> {
        let (_, latest) = self.store.post_date_bounds()?;
        Ok(latest
            .map(|d| d.format(EXPORT_DATE_FORMAT).to_string())
            .unwrap_or_else(|| DEFAULT_EXPORT_DATE.to_string()))
    }

    /// Groups with releases, optionally led by the "all groups" entry.
    pub fn released_groups(&self, include_all: bool) -> Result<Vec<(i64, String)>, ExportError> {
        let mut groups = Vec::new();
        if include_all {
            groups.push((ALL_GROUPS.0, ALL_GROUPS.1.to_string()));
        }
        groups.extend(self.store.released_groups()?);
        Ok(groups)
    }
}
