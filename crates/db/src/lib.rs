//! Persistence layer: connection handling, dynamic filtering and the
//! generic record service.
//!
//! Entities are ordinary SeaORM derive entities; the service detects
//! mixin-style columns by name:
//!
//! - `id` - string primary key, 26 characters, generated client-side and
//!   immutable once assigned
//! - `created_at` / `updated_at` - `DateTimeUtc`, maintained by
//!   `create`/`update`
//! - `is_deleted` (`bool`) + `deleted_at` (`Option<DateTimeUtc>`) - opt-in
//!   soft deletion; a tombstoned row always has `deleted_at` set
//! - `slug` - unique, served by `one_by_slug`

pub mod error;
pub mod filter;
pub mod policy;
pub mod relations;
pub mod service;

#[cfg(test)]
pub(crate) mod test_entities;

pub use error::RecordError;
pub use filter::{FilterMode, Filters, OPERATORS};
pub use policy::DeleteMode;
pub use relations::{Loaded, RelationInsertFn, RelationLoadFn, RelationSpec};
pub use service::{DEFAULT_PAGE_SIZE, Query, RecordService};

use sea_orm::{Database, DatabaseConnection, DbErr};

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}
