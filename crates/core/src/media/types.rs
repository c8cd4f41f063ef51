//! Media metadata types.

use serde::{Deserialize, Serialize};

/// Metadata describing a stored blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Canonical storage key the blob lives under.
    pub key: String,
    /// Display title, taken from the suggested filename's stem.
    pub title: String,
    /// Content size in bytes.
    pub size: u64,
    /// Hex digest of the content, also the basis of the storage key.
    pub content_hash: String,
    /// Resolved MIME type.
    pub mime_type: String,
    /// Pixel width, present for images; `0` when decoding failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height, present for images; `0` when decoding failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}
