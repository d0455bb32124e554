//! Mock artifact store for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::artifact::{ArtifactError, ArtifactStore};

/// Mock implementation of the ArtifactStore trait.
///
/// NZBs are kept in memory under `mock/<guid>.nzb.gz` paths. Images are a
/// per-guid count.
pub struct MockArtifactStore {
    /// Stored NZB content by path.
    nzbs: Arc<RwLock<HashMap<PathBuf, Vec<u8>>>>,
    /// Image files per guid.
    images: Arc<RwLock<HashMap<String, u32>>>,
    /// Paths passed to `delete`.
    deleted: Arc<RwLock<Vec<PathBuf>>>,
    /// Guids passed to `delete_images`.
    image_deletes: Arc<RwLock<Vec<String>>>,
    /// Paths whose content fails to decompress.
    corrupt: Arc<RwLock<HashSet<PathBuf>>>,
    /// If set, the next call will fail with this error.
    next_error: Arc<RwLock<Option<ArtifactError>>>,
}

impl std::fmt::Debug for MockArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockArtifactStore")
            .field("nzbs", &"<nzbs>")
            .field("images", &"<images>")
            .field("deleted", &"<deleted>")
            .field("image_deletes", &"<image_deletes>")
            .field("next_error", &"<next_error>")
            .finish()
    }
}

impl Default for MockArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockArtifactStore {
    pub fn new() -> Self {
        Self {
            nzbs: Arc::new(RwLock::new(HashMap::new())),
            images: Arc::new(RwLock::new(HashMap::new())),
            deleted: Arc::new(RwLock::new(Vec::new())),
            image_deletes: Arc::new(RwLock::new(Vec::new())),
            corrupt: Arc::new(RwLock::new(HashSet::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Path a guid's NZB is stored under.
    pub fn path_for(guid: &str) -> PathBuf {
        PathBuf::from("mock").join(format!("{}.nzb.gz", guid))
    }

    /// Store NZB content for a guid.
    pub async fn add_nzb(&self, guid: &str, content: &[u8]) {
        self.nzbs
            .write()
            .await
            .insert(Self::path_for(guid), content.to_vec());
    }

    /// Mark a guid's stored NZB as undecodable.
    pub async fn mark_corrupt(&self, guid: &str) {
        self.corrupt.write().await.insert(Self::path_for(guid));
    }

    /// Give a guid some generated images.
    pub async fn add_images(&self, guid: &str, count: u32) {
        self.images.write().await.insert(guid.to_string(), count);
    }

    /// Whether an NZB is stored for the guid.
    pub async fn has_nzb(&self, guid: &str) -> bool {
        self.nzbs.read().await.contains_key(&Self::path_for(guid))
    }

    /// Get paths passed to `delete`.
    pub async fn deleted_paths(&self) -> Vec<PathBuf> {
        self.deleted.read().await.clone()
    }

    /// Get guids passed to `delete_images`.
    pub async fn image_deletes(&self) -> Vec<String> {
        self.image_deletes.read().await.clone()
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: ArtifactError) {
        *self.next_error.write().await = Some(error);
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<ArtifactError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl ArtifactStore for MockArtifactStore {
    async fn locate(&self, guid: &str) -> Result<Option<PathBuf>, ArtifactError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        let path = Self::path_for(guid);
        Ok(self.nzbs.read().await.contains_key(&path).then_some(path))
    }

    async fn delete(&self, path: &Path) -> Result<(), ArtifactError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.deleted.write().await.push(path.to_path_buf());
        self.nzbs.write().await.remove(path);
        Ok(())
    }

    async fn read_decompressed(&self, path: &Path) -> Result<Option<Vec<u8>>, ArtifactError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        if self.corrupt.read().await.contains(path) {
            return Err(ArtifactError::Corrupt {
                path: path.to_path_buf(),
                reason: "invalid gzip header".to_string(),
            });
        }
        Ok(self.nzbs.read().await.get(path).cloned())
    }

    async fn delete_images(&self, guid: &str) -> Result<u32, ArtifactError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.image_deletes.write().await.push(guid.to_string());
        Ok(self.images.write().await.remove(guid).unwrap_or(0))
    }
}
