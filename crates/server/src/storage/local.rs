use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;

use super::{ObjectStore, StorageError, StoredObject, encode_key_path};
use crate::config::LocalDiskConfig;

/// Serves objects straight from a directory on the server's disk.
///
/// Keys are flat file names; URLs are static paths under `public_path` that the
/// router maps onto the same directory.
#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    root: PathBuf,
    public_path: String,
}

impl LocalDiskStore {
    pub fn new(config: &LocalDiskConfig) -> Self {
        Self {
            root: config.root.clone(),
            public_path: config.public_path.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_path(&self) -> &str {
        &self.public_path
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || key == "."
            || key == ".."
            || key.contains(['/', '\\'])
            || key.chars().any(char::is_control)
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalDiskStore {
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<StoredObject>, StorageError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Ok(key) = entry.file_name().into_string() else {
                tracing::warn!(path = ?entry.path(), "skipping non UTF-8 file name");
                continue;
            };
            if prefix.is_some_and(|p| !key.starts_with(p)) {
                continue;
            }
            objects.push(stored_object(key, &metadata));
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn put(&self, key: &str, body: Bytes, _content_type: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        fs::create_dir_all(&self.root).await?;
        fs::write(path, &body).await?;
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let path = match self.object_path(key) {
            Ok(path) => path,
            Err(StorageError::InvalidKey(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(stored_object(key.to_string(), &metadata))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_url(&self, key: &str) -> Result<String, StorageError> {
        self.object_path(key)?;
        Ok(format!("{}/{}", self.public_path, encode_key_path(key)))
    }
}

fn stored_object(key: String, metadata: &std::fs::Metadata) -> StoredObject {
    let content_type = mime_guess::from_path(&key)
        .first()
        .map(|mime| mime.essence_str().to_string());

    StoredObject {
        last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        size: i64::try_from(metadata.len()).ok(),
        content_type,
        key,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store(dir: &TempDir) -> LocalDiskStore {
        LocalDiskStore::new(&LocalDiskConfig {
            root: dir.path().to_path_buf(),
            public_path: "/files".to_string(),
        })
    }

    #[tokio::test]
    async fn put_then_list_reports_content_type() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .put("1700000000000-photo.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        store
            .put("image_1700000000001.jpg", Bytes::from_static(b"jpg"), "image/jpeg")
            .await
            .unwrap();

        let objects = store.list(None).await.unwrap();
        let keys: Vec<_> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, ["1700000000000-photo.png", "image_1700000000001.jpg"]);
        assert_eq!(objects[0].content_type.as_deref(), Some("image/png"));
        assert_eq!(objects[1].content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(objects[0].size, Some(3));
        assert!(objects[0].last_modified.is_some());
    }

    #[tokio::test]
    async fn list_filters_by_prefix_and_tolerates_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = LocalDiskStore::new(&LocalDiskConfig {
            root: dir.path().join("not-yet-created"),
            public_path: "/files".to_string(),
        });
        assert!(missing.list(None).await.unwrap().is_empty());

        let store = store(&dir);
        store.put("a-1.png", Bytes::new(), "image/png").await.unwrap();
        store.put("b-1.png", Bytes::new(), "image/png").await.unwrap();

        let objects = store.list(Some("b-")).await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "b-1.png");
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_root() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let err = store
            .put("../outside.png", Bytes::new(), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
        assert!(store.head("../outside.png").await.unwrap().is_none());
        assert!(store.read_url("..").await.is_err());
    }

    #[tokio::test]
    async fn read_url_is_a_static_path() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let url = store.read_url("wallpaperflare.com_wallpaper (1).jpg").await.unwrap();
        assert_eq!(url, "/files/wallpaperflare.com_wallpaper%20%281%29.jpg");
    }

    #[tokio::test]
    async fn head_distinguishes_missing_objects() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.put("here.gif", Bytes::from_static(b"gif"), "image/gif").await.unwrap();

        let found = store.head("here.gif").await.unwrap().unwrap();
        assert_eq!(found.content_type.as_deref(), Some("image/gif"));
        assert!(store.head("gone.gif").await.unwrap().is_none());
    }
}
