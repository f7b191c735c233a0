//! Object storage behind the gallery.
//!
//! The server keeps no state of its own: everything it lists, writes or links
//! to goes through an [`ObjectStore`].

mod local;
mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

pub use local::LocalDiskStore;
pub use s3::S3Store;

use crate::config::StorageConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: Option<i64>,
    pub content_type: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("failed to generate read URL: {0}")]
    Presign(String),
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every object, optionally restricted to keys starting with `prefix`.
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<StoredObject>, StorageError>;

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Returns `None` when the key does not exist.
    async fn head(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;

    /// A URL a browser can load the object from.
    async fn read_url(&self, key: &str) -> Result<String, StorageError>;
}

pub fn from_config(config: &StorageConfig) -> Arc<dyn ObjectStore> {
    match config {
        StorageConfig::S3(s3) => Arc::new(S3Store::new(s3)),
        StorageConfig::LocalDisk(local) => Arc::new(LocalDiskStore::new(local)),
    }
}

/// Percent-encodes each path segment of `key`, keeping `/` separators.
pub(crate) fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
