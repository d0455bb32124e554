//! Full-text search index abstraction.
//!
//! The index is an opaque collaborator: it maps free-text and fielded terms to
//! release ids. Ranking and tokenization are its own business.

mod manticore;

pub use manticore::ManticoreIndex;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the search index.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("Search index connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Search index API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// A query against the release index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexQuery {
    /// Index name.
    pub index: String,
    /// Free text matched against `fields` (or every field when empty).
    pub text: String,
    pub fields: Vec<String>,
    /// Field name to text, each matched against its own field.
    pub field_terms: BTreeMap<String, String>,
    /// Maximum number of ids returned.
    pub limit: u32,
}

/// Characters with a meaning in the extended query syntax.
const SPECIAL_CHARS: &[char] = &[
    '\\', '(', ')', '|', '-', '!', '@', '~', '"', '&', '/', '^', '$', '=', '<', '>',
];

/// Escape user text so it is matched literally.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn is_field_name(field: &str) -> bool {
    !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl IndexQuery {
    /// Free text matched against the given fields.
    pub fn text(index: &str, text: &str, fields: &[&str], limit: u32) -> Self {
        Self {
            index: index.to_string(),
            text: text.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            field_terms: BTreeMap::new(),
            limit,
        }
    }

    /// One term per field.
    pub fn fielded(index: &str, field_terms: BTreeMap<String, String>, limit: u32) -> Self {
        Self {
            index: index.to_string(),
            text: String::new(),
            fields: Vec::new(),
            field_terms,
            limit,
        }
    }

    /// Whether there is anything to match.
    pub fn has_terms(&self) -> bool {
        !self.text.trim().is_empty() || self.field_terms.values().any(|v| !v.trim().is_empty())
    }

    /// Render to the extended query syntax, e.g. `@searchname ubuntu`.
    pub fn to_query_string(&self) -> Result<String, SearchError> {
        let mut clauses = Vec::new();

        for (field, value) in &self.field_terms {
            if value.trim().is_empty() {
                continue;
            }
            if !is_field_name(field) {
                return Err(SearchError::InvalidQuery(format!("bad field name {:?}", field)));
            }
            clauses.push(format!("@{} {}", field, escape_text(value.trim())));
        }

        let text = self.text.trim();
        if !text.is_empty() {
            if let Some(bad) = self.fields.iter().find(|f| !is_field_name(f)) {
                return Err(SearchError::InvalidQuery(format!("bad field name {:?}", bad)));
            }
            if self.fields.is_empty() {
                clauses.push(escape_text(text));
            } else {
                clauses.push(format!("@({}) {}", self.fields.join(","), escape_text(text)));
            }
        }

        Ok(clauses.join(" "))
    }
}

/// Trait for the full-text release index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Ids of matching releases, best match first.
    async fn search(&self, query: &IndexQuery) -> Result<Vec<i64>, SearchError>;

    /// Remove a release document.
    async fn delete_document(&self, release_id: i64) -> Result<(), SearchError>;
}
