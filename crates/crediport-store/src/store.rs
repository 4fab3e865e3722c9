use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::io::Write;
use tokio::fs;

use crate::keys::ArtifactKey;
use crate::{StoreError, StoreResult};

/// Metadata of one persisted artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRef {
    pub filename: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Filesystem-backed artifact store.
///
/// Owns the artifact directory: creation, safe lookup, listing, and age-based
/// eviction. Every public entry point takes an [`ArtifactKey`], never a raw
/// filename, and writes are temp-file-then-rename so a concurrent reader never
/// observes a partially written file.
#[derive(Clone)]
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    pub async fn new(base_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_dir = base_dir.into();

        fs::create_dir_all(&base_dir).await.map_err(|e| {
            StoreError::ConfigError(format!(
                "Failed to create artifact directory {}: {}",
                base_dir.display(),
                e
            ))
        })?;

        Ok(ArtifactStore { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Deterministic key-to-path mapping. Private: the key type is the only
    /// way in, so the result is always inside the store directory.
    fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.base_dir.join(key.filename())
    }

    /// Persist an artifact atomically, replacing any prior artifact for the
    /// same key. The bytes land in a temp file in the same directory first and
    /// are renamed over the final name after a sync.
    pub async fn write(&self, key: &ArtifactKey, data: Vec<u8>) -> StoreResult<ArtifactRef> {
        let path = self.path_for(key);
        let dir = self.base_dir.clone();
        let start = std::time::Instant::now();

        let target = path.clone();
        tokio::task::spawn_blocking(move || -> StoreResult<()> {
            let mut tmp = tempfile::Builder::new()
                .prefix(".reporte-")
                .suffix(".tmp")
                .tempfile_in(&dir)
                .map_err(|e| StoreError::WriteFailed(format!("Failed to create temp file: {}", e)))?;
            tmp.write_all(&data)
                .map_err(|e| StoreError::WriteFailed(format!("Failed to write temp file: {}", e)))?;
            tmp.as_file()
                .sync_all()
                .map_err(|e| StoreError::WriteFailed(format!("Failed to sync temp file: {}", e)))?;
            tmp.persist(&target).map_err(|e| {
                StoreError::WriteFailed(format!(
                    "Failed to rename into {}: {}",
                    target.display(),
                    e
                ))
            })?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::WriteFailed(format!("Write task failed: {}", e)))??;

        let artifact = self.stat(key).await?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = artifact.size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Artifact write successful"
        );

        Ok(artifact)
    }

    /// Metadata for one artifact.
    pub async fn stat(&self, key: &ArtifactKey) -> StoreResult<ArtifactRef> {
        let path = self.path_for(key);
        let meta = fs::metadata(&path)
            .await
            .map_err(|_| StoreError::NotFound(key.filename()))?;
        Ok(ArtifactRef {
            filename: key.filename(),
            size_bytes: meta.len(),
            created_at: DateTime::<Utc>::from(meta.modified()?),
        })
    }

    pub async fn exists(&self, key: &ArtifactKey) -> bool {
        fs::try_exists(self.path_for(key)).await.unwrap_or(false)
    }

    pub async fn read(&self, key: &ArtifactKey) -> StoreResult<Vec<u8>> {
        let path = self.path_for(key);

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StoreError::NotFound(key.filename()));
        }

        fs::read(&path)
            .await
            .map_err(|e| StoreError::ReadFailed(format!("Failed to read {}: {}", path.display(), e)))
    }

    /// Stream an artifact's bytes without loading it fully into memory.
    pub async fn read_stream(
        &self,
        key: &ArtifactKey,
    ) -> StoreResult<(
        ArtifactRef,
        Pin<Box<dyn Stream<Item = Result<Bytes, StoreError>> + Send>>,
    )> {
        let artifact = self.stat(key).await?;
        let path = self.path_for(key);

        let file = fs::File::open(&path).await.map_err(|e| {
            StoreError::ReadFailed(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let stream = tokio_util::io::ReaderStream::new(file).map(|result| {
            result.map_err(|e| StoreError::ReadFailed(format!("Failed to read chunk: {}", e)))
        });

        Ok((artifact, Box::pin(stream)))
    }

    /// List all artifacts by enumerating the store directory. Entries that do
    /// not match the artifact naming pattern are ignored; caller input plays
    /// no part. Newest first.
    pub async fn list(&self) -> StoreResult<Vec<ArtifactRef>> {
        let mut entries = fs::read_dir(&self.base_dir).await.map_err(|e| {
            StoreError::ReadFailed(format!(
                "Failed to list {}: {}",
                self.base_dir.display(),
                e
            ))
        })?;

        let mut artifacts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if ArtifactKey::from_filename(name).is_err() {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            artifacts.push(ArtifactRef {
                filename: name.to_string(),
                size_bytes: meta.len(),
                created_at: DateTime::<Utc>::from(meta.modified()?),
            });
        }

        artifacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(artifacts)
    }

    /// Delete every artifact whose creation time is older than `max_age`.
    /// Per-file failures are logged and skipped so one bad entry never aborts
    /// the sweep. Returns the filenames that were removed.
    pub async fn evict_older_than(&self, max_age: Duration) -> StoreResult<Vec<String>> {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = Vec::new();
        for artifact in self.list().await? {
            let created: SystemTime = artifact.created_at.into();
            if created >= cutoff {
                continue;
            }
            let path = self.base_dir.join(&artifact.filename);
            match fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::info!(
                        filename = %artifact.filename,
                        size_bytes = artifact.size_bytes,
                        "Evicted expired artifact"
                    );
                    removed.push(artifact.filename);
                }
                Err(e) => {
                    tracing::warn!(
                        filename = %artifact.filename,
                        error = %e,
                        "Failed to evict artifact, skipping"
                    );
                }
            }
        }

        Ok(removed)
    }
}
