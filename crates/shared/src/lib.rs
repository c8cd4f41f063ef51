//! Shared building blocks for the Papyra content-management backend.
//!
//! This crate carries the pieces every other crate needs but that belong to
//! no single domain:
//!
//! - `config` - Layered application configuration
//! - `telemetry` - One-time tracing initialization for the process entry point
//! - `ids` - Sortable 26-character record keys
//! - `text` - Small text utilities (slug generation)

pub mod config;
pub mod ids;
pub mod telemetry;
pub mod text;

pub use config::{AppConfig, DatabaseConfig, MediaSettings, StorageSettings};
pub use ids::new_key;
pub use text::slugify;
