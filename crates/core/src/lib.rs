//! Core storage logic for Papyra.
//!
//! This crate contains the pluggable blob-storage layer with ZERO web or
//! database dependencies.
//!
//! # Modules
//!
//! - `storage` - The storage backend contract and its local / object-store
//!   implementations
//! - `media` - Content-addressed uploads with deduplication and metadata
//!   extraction

pub mod media;
pub mod storage;
