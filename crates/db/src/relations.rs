//! Static relation descriptors.
//!
//! Instead of discovering relationships at runtime, each service is wired
//! with a table of [`RelationSpec`]s: one entry per named relation, holding
//! the functions that insert nested child payloads on create and batch-load
//! children for prefetch. The table is built once per entity, typically as
//! a `const` next to the entity definition.

use std::collections::HashMap;
use std::ops::Deref;

use futures::future::BoxFuture;
use sea_orm::{DatabaseConnection, DatabaseTransaction};
use serde_json::Value as JsonValue;

use crate::error::RecordError;

/// Inserts one child payload under the given parent key.
///
/// Runs inside the transaction of the parent's create, so a failed child
/// insert rolls the whole aggregate back.
pub type RelationInsertFn = for<'a> fn(
    &'a DatabaseTransaction,
    &'a str,
    JsonValue,
) -> BoxFuture<'a, Result<(), RecordError>>;

/// Loads children for a batch of parent keys, grouped by parent key.
pub type RelationLoadFn = for<'a> fn(
    &'a DatabaseConnection,
    &'a [String],
) -> BoxFuture<'a, Result<HashMap<String, Vec<JsonValue>>, RecordError>>;

/// One named relation of an entity.
#[derive(Clone, Copy)]
pub struct RelationSpec {
    /// Name used in create payloads and prefetch lists.
    pub name: &'static str,
    /// Nested-create handler.
    pub insert: RelationInsertFn,
    /// Prefetch handler.
    pub load: RelationLoadFn,
}

impl std::fmt::Debug for RelationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationSpec").field("name", &self.name).finish()
    }
}

/// A record together with its prefetched relations.
///
/// Derefs to the record, so existing field access keeps working; related
/// rows are JSON documents keyed by relation name.
#[derive(Debug, Clone)]
pub struct Loaded<M> {
    /// The record itself.
    pub record: M,
    /// Prefetched children, keyed by relation name. Parents with no
    /// children still get an entry with an empty list.
    pub related: HashMap<String, Vec<JsonValue>>,
}

impl<M> Loaded<M> {
    /// Wrap a record with no prefetched relations.
    pub fn bare(record: M) -> Self {
        Self { record, related: HashMap::new() }
    }

    /// Discard the prefetched relations.
    pub fn into_record(self) -> M {
        self.record
    }
}

impl<M> Deref for Loaded<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.record
    }
}
