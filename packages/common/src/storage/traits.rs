use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Path-addressed artifact storage.
///
/// Keys are plain relative paths such as `"{design_id}/v{version}.json"`.
/// The store has no versioning semantics of its own; callers impose
/// versioning through key naming and never overwrite a prior version's key.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Read an artifact as UTF-8 text. Returns `None` if the key is absent.
    async fn read_text(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write bytes under the given key, replacing any existing artifact.
    async fn write_bytes(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.write_stream(key, reader).await
    }

    /// Write data from an async reader under the given key.
    async fn write_stream(&self, key: &str, reader: BoxReader) -> Result<(), StorageError>;

    /// Delete a single artifact.
    ///
    /// Returns `true` if the artifact was deleted, `false` if it did not exist.
    async fn delete_key(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete every artifact whose key starts with `prefix`.
    ///
    /// Returns the number of artifacts removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StorageError>;

    /// Generate a time-limited signed read URL for the given key.
    fn signed_read_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;
}
