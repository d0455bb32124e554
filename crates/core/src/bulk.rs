//! Administrative bulk delete and update.
//!
//! Deletes are best-effort and not transactional: the NZB, images and index
//! document go first, then the row. A failed step is recorded and the rest of
//! the sequence still runs.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::artifact::ArtifactStore;
use crate::engine::EngineError;
use crate::metrics;
use crate::search::SearchIndex;
use crate::store::{ReleaseStore, ReleaseUpdate};

/// What happened when deleting one release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub guid: String,
    pub artifact_removed: bool,
    pub images_removed: u32,
    pub index_removed: bool,
    pub rows_deleted: u64,
    /// One message per failed step.
    pub errors: Vec<String>,
}

impl DeleteOutcome {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    fn result_label(&self) -> &'static str {
        if !self.errors.is_empty() {
            "partial"
        } else if self.rows_deleted == 0 {
            "missing"
        } else {
            "deleted"
        }
    }
}

/// Per-identifier outcomes of a multi-delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub outcomes: Vec<DeleteOutcome>,
}

impl DeleteReport {
    /// Rows removed across the batch.
    pub fn rows_deleted(&self) -> u64 {
        self.outcomes.iter().map(|o| o.rows_deleted).sum()
    }

    /// Outcomes with at least one failed step.
    pub fn failures(&self) -> Vec<&DeleteOutcome> {
        self.outcomes.iter().filter(|o| !o.is_complete()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(DeleteOutcome::is_complete)
    }
}

/// Bulk delete and update of releases.
pub struct BulkOps {
    store: Arc<dyn ReleaseStore>,
    index: Option<Arc<dyn SearchIndex>>,
    artifacts: Arc<dyn ArtifactStore>,
    concurrency: usize,
}

impl BulkOps {
    pub fn new(
        store: Arc<dyn ReleaseStore>,
        index: Option<Arc<dyn SearchIndex>>,
        artifacts: Arc<dyn ArtifactStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            index,
            artifacts,
            concurrency: concurrency.max(1),
        }
    }

    /// Delete one release and everything stored for it.
    ///
    /// Never fails: each step's error lands in the outcome. The NZB and
    /// image removals run whether or not the row exists. Index documents are
    /// keyed by release id, which only the row carries, so without a row the
    /// index step is skipped and `index_removed` stays false.
    pub async fn delete_single(&self, guid: &str) -> DeleteOutcome {
        let mut outcome = DeleteOutcome {
            guid: guid.to_string(),
            ..Default::default()
        };

        let release = match self.store.release_by_guid(guid) {
            Ok(release) => release,
            Err(e) => {
                outcome.errors.push(format!("lookup: {}", e));
                None
            }
        };

        match self.artifacts.locate(guid).await {
            Ok(Some(path)) => match self.artifacts.delete(&path).await {
                Ok(()) => outcome.artifact_removed = true,
                Err(e) => outcome.errors.push(format!("nzb: {}", e)),
            },
            Ok(None) => debug!(guid = guid, "No stored NZB"),
            Err(e) => outcome.errors.push(format!("nzb: {}", e)),
        }

        match self.artifacts.delete_images(guid).await {
            Ok(removed) => outcome.images_removed = removed,
            Err(e) => outcome.errors.push(format!("images: {}", e)),
        }

        match (&self.index, &release) {
            (Some(index), Some(release)) => match index.delete_document(release.id).await {
                Ok(()) => outcome.index_removed = true,
                Err(e) => outcome.errors.push(format!("index: {}", e)),
            },
            (Some(_), None) => debug!(guid = guid, "Release row missing, index entry skipped"),
            (None, _) => {}
        }

        match self.store.delete_by_guid(guid) {
            Ok(rows) => outcome.rows_deleted = rows,
            Err(e) => outcome.errors.push(format!("row: {}", e)),
        }

        metrics::RELEASES_DELETED
            .with_label_values(&[outcome.result_label()])
            .inc();
        if outcome.is_complete() {
            info!(guid = guid, rows = outcome.rows_deleted, "Deleted release");
        } else {
            warn!(guid = guid, errors = ?outcome.errors, "Release only partially deleted");
        }
        outcome
    }

    /// Delete many releases; one failing identifier never stops the rest.
    pub async fn delete_multiple(&self, guids: &[String]) -> DeleteReport {
        let outcomes: Vec<DeleteOutcome> = stream::iter(guids)
            .map(|guid| self.delete_single(guid))
            .buffered(self.concurrency)
            .collect()
            .await;

        let report = DeleteReport { outcomes };
        info!(
            count = report.outcomes.len(),
            rows = report.rows_deleted(),
            failed = report.failures().len(),
            "Bulk delete finished"
        );
        report
    }

    /// Apply `update` to the given releases. Returns rows affected.
    pub fn update_many(&self, guids: &[String], update: &ReleaseUpdate) -> Result<u64, EngineError> {
        if guids.is_empty() {
            return Err(EngineError::InvalidInput("no release identifiers".to_string()));
        }
        if guids.iter().any(|g| g.trim().is_empty()) {
            return Err(EngineError::InvalidInput("blank release identifier".to_string()));
        }

        let rows = self.store.update_many(guids, update)?;
        info!(count = guids.len(), rows = rows, "Bulk update finished");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactError;
    use crate::search::SearchError;
    use crate::store::SqliteReleaseStore;
    use crate::testing::{fixtures, MockArtifactStore, MockSearchIndex};
    use std::path::PathBuf;

    struct TestBulk {
        store: Arc<SqliteReleaseStore>,
        index: Arc<MockSearchIndex>,
        artifacts: Arc<MockArtifactStore>,
        ops: BulkOps,
    }

    fn create_test_bulk() -> TestBulk {
        let store = fixtures::seeded_store();
        let index = Arc::new(MockSearchIndex::new());
        let artifacts = Arc::new(MockArtifactStore::new());
        let ops = BulkOps::new(store.clone(), Some(index.clone()), artifacts.clone(), 2);
        TestBulk {
            store,
            index,
            artifacts,
            ops,
        }
    }

    #[tokio::test]
    async fn test_delete_single_removes_everything() {
        let t = create_test_bulk();
        let id = t
            .store
            .insert_release(&fixtures::release("g1", "Some.Movie.2020", 2040))
            .unwrap();
        t.artifacts.add_nzb("g1", b"<nzb/>").await;
        t.artifacts.add_images("g1", 2).await;

        let outcome = t.ops.delete_single("g1").await;

        assert!(outcome.is_complete());
        assert!(outcome.artifact_removed);
        assert_eq!(outcome.images_removed, 2);
        assert!(outcome.index_removed);
        assert_eq!(outcome.rows_deleted, 1);
        assert_eq!(t.index.deleted_documents().await, vec![id]);
        assert!(t.store.release_by_guid("g1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_row_still_cleans_artifacts() {
        let t = create_test_bulk();
        t.artifacts.add_nzb("orphan", b"<nzb/>").await;

        let outcome = t.ops.delete_single("orphan").await;

        assert!(outcome.is_complete());
        assert!(outcome.artifact_removed);
        assert_eq!(outcome.rows_deleted, 0);
        assert!(!outcome.index_removed);
        assert_eq!(t.artifacts.image_deletes().await, vec!["orphan".to_string()]);
        assert!(!t.artifacts.has_nzb("orphan").await);
    }

    #[tokio::test]
    async fn test_failed_step_does_not_stop_row_delete() {
        let t = create_test_bulk();
        t.store
            .insert_release(&fixtures::release("g1", "Some.Movie.2020", 2040))
            .unwrap();
        t.index.set_next_error(SearchError::Timeout).await;

        let outcome = t.ops.delete_single("g1").await;

        assert!(!outcome.is_complete());
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].starts_with("index"));
        assert_eq!(outcome.rows_deleted, 1);
    }

    #[tokio::test]
    async fn test_delete_multiple_continues_past_failures() {
        let t = create_test_bulk();
        for guid in ["a", "b", "c"] {
            t.store
                .insert_release(&fixtures::release(guid, guid, 7010))
                .unwrap();
        }
        t.artifacts
            .set_next_error(ArtifactError::Io {
                path: PathBuf::from("mock/a.nzb.gz"),
                source: std::io::Error::other("disk gone"),
            })
            .await;

        let guids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let report = t.ops.delete_multiple(&guids).await;

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.rows_deleted(), 3);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(
            report.outcomes.iter().map(|o| o.guid.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_update_many_rejects_empty_input() {
        let t = create_test_bulk();
        let update = ReleaseUpdate {
            grabs: Some(5),
            ..Default::default()
        };
        assert!(matches!(
            t.ops.update_many(&[], &update),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            t.ops.update_many(&[" ".to_string()], &update),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_update_many_counts_rows() {
        let t = create_test_bulk();
        t.store
            .insert_release(&fixtures::release("a", "a", 7010))
            .unwrap();
        t.store
            .insert_release(&fixtures::release("b", "b", 7010))
            .unwrap();
        let update = ReleaseUpdate {
            category_id: Some(5040),
            ..Default::default()
        };
        let guids = vec!["a".to_string(), "b".to_string(), "zzz".to_string()];
        assert_eq!(t.ops.update_many(&guids, &update).unwrap(), 2);
        assert_eq!(
            t.store.release_by_guid("a").unwrap().unwrap().categories_id,
            5040
        );
    }
}
