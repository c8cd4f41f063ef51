//! Soft-delete policy.
//!
//! Entities opt into soft deletion by declaring an `is_deleted` boolean
//! column (and usually a `deleted_at` timestamp). Read paths then exclude
//! tombstoned rows; delete flips the flag instead of removing the row.

use std::str::FromStr;

use sea_orm::{ColumnTrait, Condition, EntityTrait};

/// Column flipped by a soft delete.
pub(crate) const SOFT_DELETE_FLAG: &str = "is_deleted";
/// Timestamp column stamped alongside the flag, when declared.
pub(crate) const SOFT_DELETE_AT: &str = "deleted_at";

/// Whether deletes tombstone rows or remove them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Flip `is_deleted` and stamp `deleted_at`; reads skip flagged rows.
    #[default]
    Soft,
    /// Remove rows outright; reads see everything.
    Hard,
}

/// Whether entity `E` declares the soft-delete flag column.
pub(crate) fn supports_soft_delete<E: EntityTrait>() -> bool {
    E::Column::from_str(SOFT_DELETE_FLAG).is_ok()
}

/// Condition that hides tombstoned rows, or always-true when the mode is
/// hard or the entity has no flag column.
pub(crate) fn visibility<E: EntityTrait>(mode: DeleteMode) -> Condition {
    match mode {
        DeleteMode::Soft => match E::Column::from_str(SOFT_DELETE_FLAG) {
            Ok(column) => Condition::all().add(column.eq(false)),
            Err(_) => Condition::all(),
        },
        DeleteMode::Hard => Condition::all(),
    }
}
