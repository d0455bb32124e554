//! Stored NZB files and generated release images.

mod fs;

pub use fs::FsArtifactStore;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from artifact storage.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored content could not be decompressed.
    #[error("Corrupt artifact {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Trait for artifact storage.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Path of the stored NZB for `guid`, if one exists.
    async fn locate(&self, guid: &str) -> Result<Option<PathBuf>, ArtifactError>;

    /// Remove a stored file. A missing file is not an error.
    async fn delete(&self, path: &Path) -> Result<(), ArtifactError>;

    /// Decompressed content, or `None` when the file is gone.
    async fn read_decompressed(&self, path: &Path) -> Result<Option<Vec<u8>>, ArtifactError>;

    /// Remove every generated image of a release. Returns files removed.
    async fn delete_images(&self, guid: &str) -> Result<u32, ArtifactError>;
}
