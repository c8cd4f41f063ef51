//! S3-compatible object storage backend using Apache OpenDAL.

use std::time::Duration;

use bytes::Bytes;
use opendal::{Operator, services};
use tracing::debug;

use super::backend::StorageBackend;
use super::config::S3Config;
use super::error::StorageError;

/// Storage backend over any S3-compatible object store.
///
/// Every name is stored under the configured key prefix (`public`/`private`
/// by default). The canned ACL is derived once from configuration and
/// reported at write time; reads never re-derive it.
#[derive(Debug, Clone)]
pub struct ObjectStorage {
    operator: Operator,
    config: S3Config,
    prefix: String,
    acl: &'static str,
}

impl ObjectStorage {
    /// Create an object-store backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the OpenDAL operator cannot be initialized.
    pub fn new(config: S3Config) -> Result<Self, StorageError> {
        let mut builder = services::S3::default()
            .bucket(&config.bucket)
            .access_key_id(&config.access_key)
            .secret_access_key(&config.secret_key)
            .region(config.region_or_default());

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();

        let prefix = config.prefix_or_default().to_string();
        let acl = config.acl();

        Ok(Self {
            operator,
            config,
            prefix,
            acl,
        })
    }

    /// Canned ACL applied to written objects (`public-read` or `private`).
    #[must_use]
    pub const fn acl(&self) -> &'static str {
        self.acl
    }

    /// Key prefix all objects are stored under.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Resolve a caller-supplied name to its canonical bucket key.
    ///
    /// Leading slashes are stripped and `.` segments dropped; `..` segments
    /// are rejected so a name can never climb out of the prefix.
    fn full_key(&self, name: &str) -> Result<String, StorageError> {
        let mut parts: Vec<&str> = if self.prefix.is_empty() {
            Vec::new()
        } else {
            self.prefix.split('/').collect()
        };

        let mut any = false;
        for segment in name.split('/') {
            match segment {
                "" | "." => {}
                ".." => return Err(StorageError::invalid_path(name)),
                part => {
                    parts.push(part);
                    any = true;
                }
            }
        }
        if !any {
            return Err(StorageError::invalid_path(name));
        }

        Ok(parts.join("/"))
    }
}

impl StorageBackend for ObjectStorage {
    async fn save(
        &self,
        name: &str,
        content: Bytes,
        overwrite: bool,
    ) -> Result<String, StorageError> {
        let key = self.full_key(name)?;
        let content_type = mime_guess::from_path(name)
            .first_or_octet_stream()
            .to_string();

        let write = self
            .operator
            .write_with(&key, content)
            .content_type(&content_type);
        let write = if overwrite {
            write
        } else {
            // The conditional write is the race arbiter between concurrent
            // writers of the same key.
            write.if_not_exists(true)
        };
        write
            .await
            .map_err(|e| StorageError::from_opendal(&key, &e))?;

        debug!(key = %key, acl = self.acl, "stored object in bucket");
        Ok(key)
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let key = self.full_key(name)?;
        // OpenDAL deletes are idempotent; stat first so an absent key
        // surfaces as NotFound.
        self.operator
            .stat(&key)
            .await
            .map_err(|e| StorageError::from_opendal(&key, &e))?;
        self.operator
            .delete(&key)
            .await
            .map_err(|e| StorageError::from_opendal(&key, &e))
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let key = self.full_key(name)?;
        self.operator
            .exists(&key)
            .await
            .map_err(|e| StorageError::from_opendal(&key, &e))
    }

    async fn url(&self, name: &str) -> Result<String, StorageError> {
        let key = self.full_key(name)?;
        let url = match &self.config.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.config.bucket,
                key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.config.bucket,
                self.config.region_or_default(),
                key
            ),
        };
        Ok(url)
    }

    async fn signed_url(&self, name: &str, expires_secs: u64) -> Result<String, StorageError> {
        let key = self.full_key(name)?;
        match self
            .operator
            .presign_read(&key, Duration::from_secs(expires_secs))
            .await
        {
            Ok(presigned) => Ok(presigned.uri().to_string()),
            Err(e) if e.kind() == opendal::ErrorKind::Unsupported => self.url(name).await,
            Err(e) => Err(StorageError::from_opendal(&key, &e)),
        }
    }

    async fn size(&self, name: &str) -> Result<u64, StorageError> {
        let key = self.full_key(name)?;
        let meta = self
            .operator
            .stat(&key)
            .await
            .map_err(|e| StorageError::from_opendal(&key, &e))?;
        Ok(meta.content_length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn private_backend() -> ObjectStorage {
        ObjectStorage::new(
            S3Config::new("ak", "sk", "media").with_endpoint("https://s3.example.com"),
        )
        .expect("should create backend")
    }

    #[test]
    fn test_private_prefix_and_acl() {
        let storage = private_backend();
        assert_eq!(storage.prefix(), "private");
        assert_eq!(storage.acl(), "private");
    }

    #[test]
    fn test_public_prefix_and_acl() {
        let storage = ObjectStorage::new(S3Config::new("ak", "sk", "media").with_public(true))
            .expect("backend");
        assert_eq!(storage.prefix(), "public");
        assert_eq!(storage.acl(), "public-read");
    }

    #[test]
    fn test_full_key_normalization() {
        let storage = private_backend();
        assert_eq!(
            storage.full_key("a/b.txt").expect("key"),
            "private/a/b.txt"
        );
        assert_eq!(
            storage.full_key("//a//b.txt").expect("key"),
            "private/a/b.txt"
        );
        assert_eq!(
            storage.full_key("./a/./b.txt").expect("key"),
            "private/a/b.txt"
        );
    }

    #[test]
    fn test_full_key_rejects_parent_segments() {
        let storage = private_backend();
        assert!(matches!(
            storage.full_key("../a.txt"),
            Err(StorageError::InvalidPath { .. })
        ));
        assert!(matches!(
            storage.full_key("a/../../b.txt"),
            Err(StorageError::InvalidPath { .. })
        ));
        assert!(matches!(
            storage.full_key(""),
            Err(StorageError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_custom_prefix() {
        let storage = ObjectStorage::new(
            S3Config::new("ak", "sk", "media")
                .with_endpoint("https://s3.example.com")
                .with_prefix("uploads/2026"),
        )
        .expect("backend");
        assert_eq!(
            storage.full_key("a.txt").expect("key"),
            "uploads/2026/a.txt"
        );
    }

    #[tokio::test]
    async fn test_url_with_custom_endpoint() {
        let storage = private_backend();
        assert_eq!(
            storage.url("a/b.png").await.expect("url"),
            "https://s3.example.com/media/private/a/b.png"
        );
    }

    #[tokio::test]
    async fn test_url_without_endpoint_uses_virtual_host_form() {
        let storage = ObjectStorage::new(S3Config::new("ak", "sk", "media").with_region("eu-west-1"))
            .expect("backend");
        assert_eq!(
            storage.url("a.png").await.expect("url"),
            "https://media.s3.eu-west-1.amazonaws.com/private/a.png"
        );
    }
}
