//! Filesystem artifact store.

use async_trait::async_trait;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::{ArtifactError, ArtifactStore};
use crate::config::StorageConfig;

/// Image directories holding `<guid>_thumb.jpg` files.
const THUMB_DIRS: [&str; 3] = ["preview", "sample", "jpg"];

/// NZBs live under `<nzb_path>/<c1>/<c2>/.../<guid>.nzb.gz`, one directory
/// per leading guid character up to the split level.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    nzb_path: PathBuf,
    covers_path: PathBuf,
    split_level: usize,
}

fn io_error(path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl FsArtifactStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            nzb_path: config.nzb_path.clone(),
            covers_path: config.covers_path.clone(),
            split_level: config.nzb_split_level,
        }
    }

    /// Where the NZB for `guid` is stored.
    pub fn nzb_path_for(&self, guid: &str) -> PathBuf {
        let mut path = self.nzb_path.clone();
        for c in guid.chars().take(self.split_level) {
            path.push(c.to_string());
        }
        path.push(format!("{}.nzb.gz", guid));
        path
    }

    fn image_paths(&self, guid: &str) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = THUMB_DIRS
            .iter()
            .map(|dir| self.covers_path.join(dir).join(format!("{}_thumb.jpg", guid)))
            .collect();
        paths.push(self.covers_path.join("video").join(format!("{}.ogv", guid)));
        paths
    }

    /// Gzip and write an NZB for `guid`, creating parent directories.
    pub async fn store_nzb(&self, guid: &str, content: &[u8]) -> Result<PathBuf, ArtifactError> {
        let path = self.nzb_path_for(guid);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(content)
            .map_err(|e| io_error(&path, e))?;
        let compressed = encoder.finish().map_err(|e| io_error(&path, e))?;

        fs::write(&path, compressed)
            .await
            .map_err(|e| io_error(&path, e))?;
        Ok(path)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn locate(&self, guid: &str) -> Result<Option<PathBuf>, ArtifactError> {
        let path = self.nzb_path_for(guid);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn delete(&self, path: &Path) -> Result<(), ArtifactError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(path, e)),
        }
    }

    async fn read_decompressed(&self, path: &Path) -> Result<Option<Vec<u8>>, ArtifactError> {
        let compressed = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(path, e)),
        };

        let mut content = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut content)
            .map_err(|e| ArtifactError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Some(content))
    }

    async fn delete_images(&self, guid: &str) -> Result<u32, ArtifactError> {
        let mut removed = 0;
        for path in self.image_paths(guid) {
            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Removed release image");
                    removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(&path, e)),
            }
        }
        Ok(removed)
    }
}
