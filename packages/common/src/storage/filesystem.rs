use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncReadExt;

use super::error::StorageError;
use super::signer::UrlSigner;
use super::traits::{ArtifactStore, BoxReader};

/// Filesystem-backed path-addressed artifact store.
///
/// Keys map directly onto relative paths under `base_path`, so
/// `"{design}/v{version}.json"` lands in one directory per design and
/// prefix deletion removes a design's whole artifact history.
pub struct FilesystemArtifactStore {
    base_path: PathBuf,
    max_size: u64,
    signer: UrlSigner,
}

impl FilesystemArtifactStore {
    pub async fn new(
        base_path: PathBuf,
        max_size: u64,
        signer: UrlSigner,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
            signer,
        })
    }

    /// Resolve a key to its filesystem path, rejecting traversal attempts.
    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

/// Reject keys that are empty, absolute, or contain `.`/`..`/empty segments.
fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.contains('\\') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
    }
    Ok(())
}

#[async_trait]
impl ArtifactStore for FilesystemArtifactStore {
    async fn read_text(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.object_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_stream(&self, key: &str, mut reader: BoxReader) -> Result<(), StorageError> {
        let object_path = self.object_path(key)?;
        let temp_path = self.temp_path();

        let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer
        let mut total_bytes: u64 = 0;
        let mut temp_file = fs::File::create(&temp_path).await?;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                drop(temp_file);
                let _ = fs::remove_file(&temp_path).await;
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            tokio::io::AsyncWriteExt::write_all(&mut temp_file, &buf[..n]).await?;
        }

        tokio::io::AsyncWriteExt::flush(&mut temp_file).await?;
        drop(temp_file);

        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn delete_key(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StorageError> {
        let trimmed = prefix.trim_end_matches('/');
        if !trimmed.is_empty() {
            validate_key(trimmed)?;
        }

        let mut removed = 0u64;
        let mut stack = vec![self.base_path.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;

                if file_type.is_dir() {
                    if path != self.base_path.join(".tmp") {
                        stack.push(path);
                    }
                    continue;
                }

                let relative = path
                    .strip_prefix(&self.base_path)
                    .map_err(|_| StorageError::InvalidKey(path.display().to_string()))?;
                let key: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                if key.join("/").starts_with(prefix) {
                    fs::remove_file(&path).await?;
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }

    fn signed_read_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        validate_key(key)?;
        Ok(self.signer.sign(key, ttl))
    }
}
