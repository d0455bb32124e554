//! Release query engine.
//!
//! Resolves search index candidates, builds the relational query, consults the
//! result cache and attaches a capped total count to each page.

mod query_engine;
mod types;

pub use query_engine::ReleaseQueryEngine;
pub use types::{CollaboratorError, EngineError};
