//! Pluggable blob storage.
//!
//! Every backend implements the same six-operation [`StorageBackend`]
//! contract; the concrete backend is chosen at wiring time from
//! configuration, never by runtime type inspection.
//!
//! - [`LocalStorage`] - files under one base directory, served from a base
//!   URL (development and single-node deployments)
//! - [`ObjectStorage`] - S3-compatible object stores via Apache OpenDAL
//!   (Cloudflare R2, Supabase Storage, AWS S3, DigitalOcean Spaces, MinIO)

mod backend;
mod config;
mod error;
mod local;
mod s3;

pub use backend::StorageBackend;
pub use config::S3Config;
pub use error::StorageError;
pub use local::LocalStorage;
pub use s3::ObjectStorage;
