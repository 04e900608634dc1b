pub mod storage;

pub use storage::{ArtifactStore, BoxReader, StorageError};
