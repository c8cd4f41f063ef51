//! The storage backend contract.

use bytes::Bytes;

use super::error::StorageError;

/// A pluggable blob store.
///
/// Implementations resolve caller-supplied names to canonical stored keys
/// (prefixing, normalization) and must reject names that would escape their
/// configured root or prefix.
pub trait StorageBackend: Send + Sync {
    /// Save `content` under `name` and return the canonical stored key.
    ///
    /// With `overwrite = false`, writing onto an occupied key fails with
    /// [`StorageError::AlreadyExists`]; this failure is the sole arbiter
    /// between two concurrent writers of the same key.
    fn save(
        &self,
        name: &str,
        content: Bytes,
        overwrite: bool,
    ) -> impl std::future::Future<Output = Result<String, StorageError>> + Send;

    /// Remove the object stored under `name`.
    ///
    /// Fails with [`StorageError::NotFound`] if the object is absent.
    fn delete(&self, name: &str)
    -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Whether an object exists under `name`.
    fn exists(&self, name: &str)
    -> impl std::future::Future<Output = Result<bool, StorageError>> + Send;

    /// Public-facing URL for the object.
    fn url(&self, name: &str)
    -> impl std::future::Future<Output = Result<String, StorageError>> + Send;

    /// Time-limited access URL.
    ///
    /// Backends without native signing fall back to [`StorageBackend::url`].
    fn signed_url(
        &self,
        name: &str,
        expires_secs: u64,
    ) -> impl std::future::Future<Output = Result<String, StorageError>> + Send;

    /// Size of the stored object in bytes.
    ///
    /// Fails with [`StorageError::NotFound`] if the object is absent.
    fn size(&self, name: &str)
    -> impl std::future::Future<Output = Result<u64, StorageError>> + Send;
}
