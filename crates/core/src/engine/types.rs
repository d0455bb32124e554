//! Error types for the query engine.

use thiserror::Error;

use crate::search::SearchError;
use crate::store::StoreError;

/// A collaborator failure surfaced to the caller.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("search index: {0}")]
    SearchIndex(SearchError),

    #[error("release store: {0}")]
    Store(StoreError),
}

/// Errors returned by the query engine and bulk operations.
///
/// A lookup that finds nothing is an empty result, not an error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input with no safe default.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The search index or store could not answer.
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(CollaboratorError),
}

impl From<SearchError> for EngineError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::InvalidQuery(msg) => EngineError::InvalidInput(msg),
            other => EngineError::CollaboratorUnavailable(CollaboratorError::SearchIndex(other)),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidInput(msg) => EngineError::InvalidInput(msg),
            other => EngineError::CollaboratorUnavailable(CollaboratorError::Store(other)),
        }
    }
}
