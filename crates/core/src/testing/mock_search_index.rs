//! Mock search index for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::search::{IndexQuery, SearchError, SearchIndex};

/// A recorded index query for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    /// The query that was run.
    pub query: IndexQuery,
    /// When the query was made.
    pub timestamp: Instant,
}

/// A query handler that produces ids dynamically based on the query.
type QueryHandler = Box<dyn Fn(&IndexQuery) -> Option<Vec<i64>> + Send + Sync>;

/// Mock implementation of the SearchIndex trait.
///
/// Holds `(release id, name)` documents and matches a query when every word
/// of its text and field terms appears in the name, case-insensitively.
///
/// # Example
///
/// ```rust,ignore
/// use nzbdex_core::testing::MockSearchIndex;
///
/// let index = MockSearchIndex::new();
/// index.add_document(1, "Ubuntu 24.04 Desktop ISO").await;
///
/// let ids = index.search(&IndexQuery::text("releases_rt", "ubuntu", &[], 100)).await?;
/// assert_eq!(ids, vec![1]);
/// ```
pub struct MockSearchIndex {
    /// Indexed documents.
    documents: Arc<RwLock<Vec<(i64, String)>>>,
    /// Recorded queries.
    queries: Arc<RwLock<Vec<RecordedQuery>>>,
    /// Ids passed to `delete_document`.
    deleted: Arc<RwLock<Vec<i64>>>,
    /// If set, the next call will fail with this error.
    next_error: Arc<RwLock<Option<SearchError>>>,
    /// Query handler overriding document matching.
    query_handler: Arc<RwLock<Option<QueryHandler>>>,
}

impl std::fmt::Debug for MockSearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSearchIndex")
            .field("documents", &"<documents>")
            .field("queries", &"<queries>")
            .field("deleted", &"<deleted>")
            .field("next_error", &"<next_error>")
            .field("query_handler", &"<handler>")
            .finish()
    }
}

impl Default for MockSearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_document(query: &IndexQuery, name: &str) -> bool {
    let name = name.to_lowercase();
    let words: Vec<String> = std::iter::once(query.text.as_str())
        .chain(query.field_terms.values().map(String::as_str))
        .flat_map(str::split_whitespace)
        .map(str::to_lowercase)
        .collect();
    !words.is_empty() && words.iter().all(|w| name.contains(w.as_str()))
}

impl MockSearchIndex {
    /// Create a new, empty mock index.
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(Vec::new())),
            queries: Arc::new(RwLock::new(Vec::new())),
            deleted: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            query_handler: Arc::new(RwLock::new(None)),
        }
    }

    /// Index a release name under its id.
    pub async fn add_document(&self, release_id: i64, name: &str) {
        self.documents
            .write()
            .await
            .push((release_id, name.to_string()));
    }

    /// Get recorded queries.
    pub async fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.queries.read().await.clone()
    }

    /// Get the number of queries performed.
    pub async fn query_count(&self) -> usize {
        self.queries.read().await.len()
    }

    /// Ids removed through `delete_document`.
    pub async fn deleted_documents(&self) -> Vec<i64> {
        self.deleted.read().await.clone()
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: SearchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set a handler returning `Some(ids)` to override document matching.
    pub async fn set_query_handler<F>(&self, handler: F)
    where
        F: Fn(&IndexQuery) -> Option<Vec<i64>> + Send + Sync + 'static,
    {
        *self.query_handler.write().await = Some(Box::new(handler));
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<SearchError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl SearchIndex for MockSearchIndex {
    async fn search(&self, query: &IndexQuery) -> Result<Vec<i64>, SearchError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        self.queries.write().await.push(RecordedQuery {
            query: query.clone(),
            timestamp: Instant::now(),
        });

        let handler = self.query_handler.read().await;
        if let Some(ref h) = *handler {
            if let Some(ids) = h(query) {
                return Ok(ids);
            }
        }
        drop(handler);

        let limit = if query.limit == 0 {
            usize::MAX
        } else {
            query.limit as usize
        };
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .filter(|(_, name)| matches_document(query, name))
            .map(|(id, _)| *id)
            .take(limit)
            .collect())
    }

    async fn delete_document(&self, release_id: i64) -> Result<(), SearchError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.deleted.write().await.push(release_id);
        self.documents
            .write()
            .await
            .retain(|(id, _)| *id != release_id);
        Ok(())
    }
}
