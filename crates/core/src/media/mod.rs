//! Content-addressed media uploads.
//!
//! The media service layers deduplication and metadata extraction on top of
//! any [`crate::storage::StorageBackend`]: content is stored under a key
//! derived from its hash, so identical bytes are only ever stored once.

mod service;
mod types;

pub use service::MediaService;
pub use types::MediaMetadata;
