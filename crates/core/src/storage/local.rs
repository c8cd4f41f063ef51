//! Local filesystem storage backend.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::backend::StorageBackend;
use super::error::StorageError;

/// Storage backend that keeps every object under one base directory.
///
/// Names are resolved lexically: absolute names and any `..` component are
/// rejected before touching the filesystem, so no resolved path can escape
/// the base directory. Canonical keys use forward slashes regardless of
/// platform.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a local backend rooted at `base_path`, served from `base_url`.
    ///
    /// The base directory is created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the base directory cannot be created.
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        tokio::fs::create_dir_all(&base_path)
            .await
            .map_err(|e| StorageError::configuration(e.to_string()))?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        base_url.push('/');

        Ok(Self {
            base_path,
            base_url,
        })
    }

    /// Root directory of this backend.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a caller-supplied name to an on-disk path and canonical key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] for empty or absolute names and
    /// for any name containing a `..` component.
    fn resolve(&self, name: &str) -> Result<(PathBuf, String), StorageError> {
        let mut parts: Vec<&str> = Vec::new();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => {
                    parts.push(
                        part.to_str()
                            .ok_or_else(|| StorageError::invalid_path(name))?,
                    );
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::invalid_path(name));
                }
            }
        }
        if parts.is_empty() {
            return Err(StorageError::invalid_path(name));
        }

        let key = parts.join("/");
        let mut path = self.base_path.clone();
        path.extend(&parts);
        Ok((path, key))
    }
}

impl StorageBackend for LocalStorage {
    async fn save(
        &self,
        name: &str,
        content: Bytes,
        overwrite: bool,
    ) -> Result<String, StorageError> {
        let (path, key) = self.resolve(name)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::from_io(&key, &e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .create_new(!overwrite)
            .truncate(true)
            .open(&path)
            .await
            .map_err(|e| StorageError::from_io(&key, &e))?;
        file.write_all(&content)
            .await
            .map_err(|e| StorageError::from_io(&key, &e))?;
        file.flush()
            .await
            .map_err(|e| StorageError::from_io(&key, &e))?;

        debug!(key = %key, bytes = content.len(), "stored object on local disk");
        Ok(key)
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let (path, key) = self.resolve(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::from_io(&key, &e))
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let (path, key) = self.resolve(name)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::from_io(&key, &e))
    }

    async fn url(&self, name: &str) -> Result<String, StorageError> {
        let (_, key) = self.resolve(name)?;
        Ok(format!("{}{}", self.base_url, key))
    }

    async fn signed_url(&self, name: &str, _expires_secs: u64) -> Result<String, StorageError> {
        // No native signing on local disk; the public URL is the fallback.
        self.url(name).await
    }

    async fn size(&self, name: &str) -> Result<u64, StorageError> {
        let (path, key) = self.resolve(name)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| StorageError::from_io(&key, &e))?;
        Ok(meta.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn backend(dir: &tempfile::TempDir) -> LocalStorage {
        LocalStorage::new(dir.path(), "/media/")
            .await
            .expect("should create backend")
    }

    #[tokio::test]
    async fn test_save_and_size_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = backend(&dir).await;

        let key = storage
            .save("a/b.txt", Bytes::from_static(b"hi"), false)
            .await
            .expect("save should succeed");
        assert_eq!(key, "a/b.txt");
        assert_eq!(storage.size("a/b.txt").await.expect("size"), 2);
        assert!(storage.exists("a/b.txt").await.expect("exists"));
    }

    #[tokio::test]
    async fn test_save_without_overwrite_fails_on_occupied_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = backend(&dir).await;

        storage
            .save("a/b.txt", Bytes::from_static(b"hi"), false)
            .await
            .expect("first save");
        let err = storage
            .save("a/b.txt", Bytes::from_static(b"bye"), false)
            .await
            .expect_err("second save should fail");
        assert!(matches!(err, StorageError::AlreadyExists { key } if key == "a/b.txt"));
    }

    #[tokio::test]
    async fn test_save_with_overwrite_replaces_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = backend(&dir).await;

        storage
            .save("a/b.txt", Bytes::from_static(b"hi"), false)
            .await
            .expect("first save");
        storage
            .save("a/b.txt", Bytes::from_static(b"bye"), true)
            .await
            .expect("overwrite save");
        assert_eq!(storage.size("a/b.txt").await.expect("size"), 3);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = backend(&dir).await;

        let err = storage
            .delete("nope.txt")
            .await
            .expect_err("delete should fail");
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_removes_object() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = backend(&dir).await;

        storage
            .save("x.txt", Bytes::from_static(b"x"), false)
            .await
            .expect("save");
        storage.delete("x.txt").await.expect("delete");
        assert!(!storage.exists("x.txt").await.expect("exists"));
    }

    #[tokio::test]
    async fn test_size_missing_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = backend(&dir).await;

        let err = storage.size("nope.txt").await.expect_err("size");
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_parent_traversal_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = backend(&dir).await;

        for name in ["../escape.txt", "a/../../escape.txt", "/etc/passwd", ""] {
            let err = storage
                .save(name, Bytes::from_static(b"x"), false)
                .await
                .expect_err("traversal should be rejected");
            assert!(
                matches!(err, StorageError::InvalidPath { .. }),
                "{name} should be an invalid path"
            );
        }
    }

    #[tokio::test]
    async fn test_dot_segments_are_normalized() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = backend(&dir).await;

        let key = storage
            .save("./a/./b.txt", Bytes::from_static(b"x"), false)
            .await
            .expect("save");
        assert_eq!(key, "a/b.txt");
    }

    #[tokio::test]
    async fn test_url_and_signed_url_join_base() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path(), "https://cdn.example.com/media")
            .await
            .expect("backend");

        assert_eq!(
            storage.url("a/b.png").await.expect("url"),
            "https://cdn.example.com/media/a/b.png"
        );
        // Signing is not supported locally; same URL comes back.
        assert_eq!(
            storage.signed_url("a/b.png", 60).await.expect("signed"),
            "https://cdn.example.com/media/a/b.png"
        );
    }
}
