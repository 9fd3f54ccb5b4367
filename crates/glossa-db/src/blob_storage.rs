//! Blob storage for document artifacts.
//!
//! Each job owns up to two artifacts: the uploaded original and the rendered
//! translation. This module provides:
//! - a `StorageBackend` trait abstracting over storage providers
//! - a filesystem backend with atomic writes and idempotent deletes
//! - `BlobStore`, which maps job ids onto the artifact layout
//!
//! Layout under the backend root: `original/{job_id}.pdf` and
//! `translated/{job_id}.pdf`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use glossa_db::blob_storage::{BlobStore, FilesystemBackend};
//!
//! let backend = FilesystemBackend::new("/data");
//! let blobs = BlobStore::new(Arc::new(backend));
//!
//! let locator = blobs.save_original(job_id, &data).await?;
//! let bytes = blobs.read_original(job_id).await?;
//! ```

use async_trait::async_trait;
use glossa_core::{defaults, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Storage backend trait for different storage providers.
///
/// Allows abstracting over filesystem, S3, or other stores. The backend
/// variant is selected by configuration at startup, never at runtime.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data to the specified path. The payload must be fully
    /// materialized before any later `read` can observe the path.
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Read data from the specified path.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete data at the specified path. Deleting an absent path is a
    /// no-op, not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if data exists at the specified path.
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Filesystem storage backend rooted at a configurable directory.
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }

    /// Validate that the storage backend can write, read, and delete files.
    ///
    /// Performs a full round-trip test at startup to catch filesystem issues
    /// (overlayfs quirks, permission errors, missing directories) early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("test.bin");

        // Step 1: Create directory
        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        // Step 2: Write file
        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        // Step 3: Read file
        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        // Step 4: Delete file and directory
        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await; // Best-effort cleanup

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);
        debug!(storage_path = %path, full_path = %full_path.display(), bytes = data.len(), "blob_storage: write");

        // Create parent directories
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "blob_storage: create_dir_all failed");
                e
            })?;
        }

        // Atomic write: temp file + rename, so readers never see a partial
        // artifact.
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "blob_storage: File::create failed");
            e
        })?;
        file.write_all(data).await.map_err(|e| {
            warn!(error = %e, "blob_storage: write_all failed");
            e
        })?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "blob_storage: rename failed");
            e
        })?;

        // Set permissions to 0644 (rw-r--r--, no execute)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path);
        Ok(fs::read(full_path).await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path);
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.full_path(path);
        Ok(fs::try_exists(full_path).await?)
    }
}

// =============================================================================
// ARTIFACT LAYOUT
// =============================================================================

/// The two artifact roles a job can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Original,
    Translated,
}

impl ArtifactKind {
    /// Subdirectory under the storage root for this artifact kind.
    pub fn dir(&self) -> &'static str {
        match self {
            ArtifactKind::Original => defaults::ORIGINAL_DIR,
            ArtifactKind::Translated => defaults::TRANSLATED_DIR,
        }
    }
}

/// Generate the storage path (locator) for a job's artifact.
///
/// Example: `original/0194a7e8-8b2a-4c3d-9e4f-5a6b7c8d9e0f.pdf`
pub fn artifact_path(job_id: Uuid, kind: ArtifactKind) -> String {
    format!("{}/{}.pdf", kind.dir(), job_id)
}

/// Maps job ids onto the artifact layout over a pluggable backend.
#[derive(Clone)]
pub struct BlobStore {
    backend: Arc<dyn StorageBackend>,
}

impl BlobStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Locator for the original artifact, without asserting existence.
    pub fn original_path(&self, job_id: Uuid) -> String {
        artifact_path(job_id, ArtifactKind::Original)
    }

    /// Locator for the translated artifact, without asserting existence.
    pub fn translated_path(&self, job_id: Uuid) -> String {
        artifact_path(job_id, ArtifactKind::Translated)
    }

    /// Persist the uploaded original. Returns its locator.
    pub async fn save_original(&self, job_id: Uuid, data: &[u8]) -> Result<String> {
        let path = self.original_path(job_id);
        self.backend.write(&path, data).await?;
        Ok(path)
    }

    /// Persist the rendered translation. Returns its locator.
    pub async fn save_translated(&self, job_id: Uuid, data: &[u8]) -> Result<String> {
        let path = self.translated_path(job_id);
        self.backend.write(&path, data).await?;
        Ok(path)
    }

    pub async fn read_original(&self, job_id: Uuid) -> Result<Vec<u8>> {
        self.backend.read(&self.original_path(job_id)).await
    }

    pub async fn read_translated(&self, job_id: Uuid) -> Result<Vec<u8>> {
        self.backend.read(&self.translated_path(job_id)).await
    }

    pub async fn original_exists(&self, job_id: Uuid) -> Result<bool> {
        self.backend.exists(&self.original_path(job_id)).await
    }

    pub async fn translated_exists(&self, job_id: Uuid) -> Result<bool> {
        self.backend.exists(&self.translated_path(job_id)).await
    }

    /// Delete the original artifact; a no-op when already absent.
    pub async fn delete_original(&self, job_id: Uuid) -> Result<()> {
        self.backend.delete(&self.original_path(job_id)).await
    }

    /// Delete the translated artifact; a no-op when already absent.
    pub async fn delete_translated(&self, job_id: Uuid) -> Result<()> {
        self.backend.delete(&self.translated_path(job_id)).await
    }
}
