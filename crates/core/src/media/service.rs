//! Media service implementation.

use std::path::Path;

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::types::MediaMetadata;
use crate::storage::{StorageBackend, StorageError};

/// Extension used when neither the filename nor the MIME type yields one.
const FALLBACK_EXTENSION: &str = "bin";

/// Upload service with content-hash deduplication.
///
/// The storage key is `{sha256}.{ext}` under the caller's folder, so two
/// uploads of identical bytes with the same extension collide on the same
/// key. Saves go to the backend with `overwrite = false`; the second
/// identical upload surfaces [`StorageError::AlreadyExists`], which callers
/// are expected to treat as an idempotent "already stored" outcome.
pub struct MediaService<S> {
    storage: S,
    max_file_size: Option<u64>,
}

impl<S: StorageBackend> MediaService<S> {
    /// Create a media service over a storage backend.
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            max_file_size: None,
        }
    }

    /// Enforce a maximum content size in bytes.
    #[must_use]
    pub fn with_max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = Some(max);
        self
    }

    /// The wrapped storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Store content and return its metadata.
    ///
    /// `suggested_filename` contributes the extension and title;
    /// `mime_hint` takes precedence over guessing from the filename.
    ///
    /// # Errors
    ///
    /// - [`StorageError::FileTooLarge`] when a size limit is configured and
    ///   exceeded
    /// - [`StorageError::AlreadyExists`] when identical content is already
    ///   stored under the derived key
    /// - any backend failure from the underlying save
    pub async fn save(
        &self,
        content: Bytes,
        suggested_filename: &str,
        mime_hint: Option<&str>,
        folder: &str,
    ) -> Result<MediaMetadata, StorageError> {
        let size = content.len() as u64;
        if let Some(max) = self.max_file_size
            && size > max
        {
            return Err(StorageError::FileTooLarge { size, max });
        }

        let mime_type = resolve_mime(mime_hint, suggested_filename);
        let content_hash = hash_content(&content);
        let ext = extension_for(suggested_filename, &mime_type);
        let filename = format!("{content_hash}.{ext}");
        let name = join_folder(folder, &filename);

        let key = self.storage.save(&name, content.clone(), false).await?;
        debug!(key = %key, size, mime = %mime_type, "stored media object");

        let (width, height) = if mime_type.starts_with("image/") {
            let (w, h) = probe_dimensions(&content);
            (Some(w), Some(h))
        } else {
            (None, None)
        };

        Ok(MediaMetadata {
            key,
            title: file_stem(suggested_filename),
            size,
            content_hash,
            mime_type,
            width,
            height,
        })
    }

    /// Delete a stored blob by key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when the key is absent.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.storage.delete(key).await
    }
}

/// Hex SHA-256 digest of the content.
fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Resolve the MIME type: explicit hint, else filename guess, else
/// `application/octet-stream`.
fn resolve_mime(hint: Option<&str>, filename: &str) -> String {
    match hint {
        Some(mime) if !mime.is_empty() => mime.to_string(),
        _ => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string(),
    }
}

/// Extension from the filename, falling back to one guessed from the MIME
/// type, falling back to `bin`.
fn extension_for(filename: &str, mime_type: &str) -> String {
    if let Some(ext) = Path::new(filename).extension().and_then(|e| e.to_str()) {
        return ext.to_ascii_lowercase();
    }
    mime_guess::get_mime_extensions_str(mime_type)
        .and_then(|exts| exts.first())
        .map_or_else(|| FALLBACK_EXTENSION.to_string(), ToString::to_string)
}

/// Filename stem used as the display title.
fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string()
}

/// Join an optional folder onto a filename with forward slashes.
fn join_folder(folder: &str, filename: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        filename.to_string()
    } else {
        format!("{folder}/{filename}")
    }
}

/// Best-effort pixel dimensions; decode failure yields `(0, 0)`.
fn probe_dimensions(content: &[u8]) -> (u32, u32) {
    match imagesize::blob_size(content) {
        Ok(dim) => (
            u32::try_from(dim.width).unwrap_or(0),
            u32::try_from(dim.height).unwrap_or(0),
        ),
        Err(_) => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;

    /// Minimal PNG header with the given IHDR dimensions.
    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        // bit depth, color type, compression, filter, interlace + dummy CRC
        bytes.extend_from_slice(&[8, 6, 0, 0, 0, 0, 0, 0, 0]);
        bytes
    }

    async fn service(dir: &tempfile::TempDir) -> MediaService<LocalStorage> {
        let storage = LocalStorage::new(dir.path(), "/media/")
            .await
            .expect("backend");
        MediaService::new(storage)
    }

    #[tokio::test]
    async fn test_save_returns_content_addressed_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let media = service(&dir).await;

        let meta = media
            .save(Bytes::from_static(b"hello"), "notes.txt", None, "")
            .await
            .expect("save");

        assert_eq!(meta.key, format!("{}.txt", meta.content_hash));
        assert_eq!(meta.title, "notes");
        assert_eq!(meta.size, 5);
        assert_eq!(meta.mime_type, "text/plain");
        assert!(meta.width.is_none());
        assert!(meta.height.is_none());
    }

    #[tokio::test]
    async fn test_identical_content_collides_on_same_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let media = service(&dir).await;
        let content = Bytes::from_static(b"same bytes");

        let first = media
            .save(content.clone(), "a.txt", None, "")
            .await
            .expect("first save");
        let err = media
            .save(content, "b.txt", None, "")
            .await
            .expect_err("second save should conflict");

        assert!(matches!(err, StorageError::AlreadyExists { key } if key == first.key));
    }

    #[tokio::test]
    async fn test_folder_is_part_of_the_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let media = service(&dir).await;

        let meta = media
            .save(Bytes::from_static(b"x"), "a.txt", None, "/uploads/")
            .await
            .expect("save");
        assert!(meta.key.starts_with("uploads/"));
    }

    #[tokio::test]
    async fn test_extension_falls_back_to_mime_then_bin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let media = service(&dir).await;

        let from_mime = media
            .save(
                Bytes::from(png_bytes(1, 1)),
                "shot",
                Some("image/png"),
                "",
            )
            .await
            .expect("save");
        assert!(from_mime.key.ends_with(".png"), "key: {}", from_mime.key);

        let fallback = media
            .save(Bytes::from_static(b"??"), "mystery", Some("application/x-unknowable"), "")
            .await
            .expect("save");
        assert!(fallback.key.ends_with(".bin"), "key: {}", fallback.key);
    }

    #[tokio::test]
    async fn test_image_dimensions_extracted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let media = service(&dir).await;

        let meta = media
            .save(Bytes::from(png_bytes(640, 480)), "photo.png", None, "")
            .await
            .expect("save");
        assert_eq!(meta.mime_type, "image/png");
        assert_eq!(meta.width, Some(640));
        assert_eq!(meta.height, Some(480));
    }

    #[tokio::test]
    async fn test_undecodable_image_yields_zero_dimensions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let media = service(&dir).await;

        let meta = media
            .save(
                Bytes::from_static(b"not an image"),
                "broken.png",
                Some("image/png"),
                "",
            )
            .await
            .expect("save must not fail on decode errors");
        assert_eq!(meta.width, Some(0));
        assert_eq!(meta.height, Some(0));
    }

    #[tokio::test]
    async fn test_max_file_size_enforced() {
        let dir = tempfile::tempdir().expect("tempdir");
        let media = service(&dir).await.with_max_file_size(4);

        let err = media
            .save(Bytes::from_static(b"too big"), "big.txt", None, "")
            .await
            .expect_err("should exceed limit");
        assert!(matches!(err, StorageError::FileTooLarge { size: 7, max: 4 }));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let media = service(&dir).await;

        let err = media.delete("nope.bin").await.expect_err("delete");
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn test_resolve_mime_prefers_hint() {
        assert_eq!(resolve_mime(Some("image/webp"), "a.png"), "image/webp");
        assert_eq!(resolve_mime(None, "a.png"), "image/png");
        assert_eq!(resolve_mime(None, "unknown"), "application/octet-stream");
    }

    #[test]
    fn test_extension_for_lowercases() {
        assert_eq!(extension_for("PHOTO.JPG", "image/jpeg"), "jpg");
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let a = hash_content(b"abc");
        let b = hash_content(b"abc");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Identical bytes always derive identical keys, independent of the
        // suggested filename stem.
        #[test]
        fn prop_key_depends_only_on_content_and_extension(
            content in proptest::collection::vec(any::<u8>(), 0..256),
            stem_a in "[a-z]{1,12}",
            stem_b in "[a-z]{1,12}",
        ) {
            let hash = hash_content(&content);
            let ext_a = extension_for(&format!("{stem_a}.txt"), "text/plain");
            let ext_b = extension_for(&format!("{stem_b}.txt"), "text/plain");
            prop_assert_eq!(format!("{hash}.{ext_a}"), format!("{hash}.{ext_b}"));
        }

        // Dimension probing never panics on arbitrary bytes.
        #[test]
        fn prop_probe_dimensions_total(content in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = probe_dimensions(&content);
        }
    }
}
