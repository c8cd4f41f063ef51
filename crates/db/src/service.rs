//! Generic record service.
//!
//! [`RecordService`] wraps one SeaORM entity with the read/write surface
//! the rest of the application talks to: dynamic filtering, soft-delete
//! aware reads, JSON-payload create/update, and relation prefetching via
//! static [`RelationSpec`] tables.

use std::marker::PhantomData;
use std::str::FromStr;

use chrono::Utc;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, IdenStatic, IntoActiveModel, Iterable, ModelTrait, Order, PaginatorTrait,
    PrimaryKeyToColumn, PrimaryKeyTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, Value,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::RecordError;
use crate::filter::{self, FilterMode, Filters, entity_name};
use crate::policy::{self, DeleteMode, SOFT_DELETE_AT, SOFT_DELETE_FLAG};
use crate::relations::{Loaded, RelationSpec};

/// Applied when a [`Query`] does not set its own limit.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// A list query: filters plus ordering, paging and prefetch directives.
#[derive(Debug, Clone)]
pub struct Query {
    filters: Filters,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    prefetch: Vec<String>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filters: Filters::new(),
            order_by: Vec::new(),
            limit: Some(DEFAULT_PAGE_SIZE),
            offset: None,
            prefetch: Vec::new(),
        }
    }
}

impl Query {
    /// A query with no filters and the default page size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the filter set.
    #[must_use]
    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// Add one filter criterion.
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.filters.insert(key, value);
        self
    }

    /// Add an ordering on a field; a `-` prefix sorts descending.
    /// Orderings apply in insertion order.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by.push(field.into());
        self
    }

    /// Cap the number of returned records.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Remove the page-size cap.
    #[must_use]
    pub fn no_limit(mut self) -> Self {
        self.limit = None;
        self
    }

    /// Skip the first `offset` records.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Request a named relation to be loaded alongside the records.
    #[must_use]
    pub fn prefetch(mut self, relation: impl Into<String>) -> Self {
        self.prefetch.push(relation.into());
        self
    }
}

/// CRUD surface over one entity.
pub struct RecordService<E: EntityTrait> {
    db: DatabaseConnection,
    delete_mode: DeleteMode,
    filter_mode: FilterMode,
    relations: &'static [RelationSpec],
    entity: PhantomData<E>,
}

impl<E: EntityTrait> std::fmt::Debug for RecordService<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordService")
            .field("entity", &entity_name::<E>())
            .field("delete_mode", &self.delete_mode)
            .field("filter_mode", &self.filter_mode)
            .finish_non_exhaustive()
    }
}

impl<E> RecordService<E>
where
    E: EntityTrait,
    E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel> + Send + Sync,
    E::ActiveModel: ActiveModelBehavior + Send,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<String>,
{
    /// A service with soft deletes, permissive filtering and no relations.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            delete_mode: DeleteMode::default(),
            filter_mode: FilterMode::default(),
            relations: &[],
            entity: PhantomData,
        }
    }

    /// Override the delete mode.
    #[must_use]
    pub fn with_delete_mode(mut self, mode: DeleteMode) -> Self {
        self.delete_mode = mode;
        self
    }

    /// Override the filter mode.
    #[must_use]
    pub fn with_filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter_mode = mode;
        self
    }

    /// Register the entity's relation table.
    #[must_use]
    pub fn with_relations(mut self, relations: &'static [RelationSpec]) -> Self {
        self.relations = relations;
        self
    }

    /// List records matching a query, with ordering, paging and prefetch.
    ///
    /// Order-by fields that do not resolve to a column are ignored with a
    /// warning; a bad prefetch name is a caller error.
    ///
    /// # Errors
    ///
    /// Fails on invalid filters, unknown prefetch names, or database
    /// errors.
    pub async fn filter(&self, query: &Query) -> Result<Vec<Loaded<E::Model>>, RecordError> {
        let mut select = E::find()
            .filter(policy::visibility::<E>(self.delete_mode))
            .filter(filter::parse::<E>(&query.filters, self.filter_mode)?);
        for spec in &query.order_by {
            let (field, order) = match spec.strip_prefix('-') {
                Some(field) => (field, Order::Desc),
                None => (spec.as_str(), Order::Asc),
            };
            match E::Column::from_str(field) {
                Ok(column) => select = select.order_by(column, order),
                Err(_) => {
                    warn!(entity = %entity_name::<E>(), field, "ignoring unknown order-by field");
                }
            }
        }
        let records = select
            .limit(query.limit)
            .offset(query.offset)
            .all(&self.db)
            .await?;
        self.attach_related(records, &query.prefetch).await
    }

    /// Count records matching a filter set, honoring visibility.
    ///
    /// # Errors
    ///
    /// Fails on invalid filters or database errors.
    pub async fn count(&self, filters: &Filters) -> Result<u64, RecordError> {
        let n = E::find()
            .filter(policy::visibility::<E>(self.delete_mode))
            .filter(filter::parse::<E>(filters, self.filter_mode)?)
            .count(&self.db)
            .await?;
        Ok(n)
    }

    /// Fetch a record by primary key, tombstoned or not.
    ///
    /// Key lookups are the one read that bypasses soft-delete visibility:
    /// a caller holding a key is entitled to see the tombstone.
    ///
    /// # Errors
    ///
    /// Fails on database errors.
    pub async fn get_by_key(&self, key: &str) -> Result<Option<E::Model>, RecordError> {
        let value = <E::PrimaryKey as PrimaryKeyTrait>::ValueType::from(key.to_owned());
        Ok(E::find_by_id(value).one(&self.db).await?)
    }

    /// Fetch the single record matching a query's filters, with optional
    /// prefetch. Visibility applies; a point lookup that should see
    /// tombstones belongs to [`Self::get_by_key`]. A key criterion is just
    /// another filter: `Query::new().filter("id", key)`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MultipleResults`] when more than one record
    /// matches; invalid filters, unknown prefetch names and database
    /// errors also fail.
    pub async fn one(&self, query: &Query) -> Result<Option<Loaded<E::Model>>, RecordError> {
        let condition = filter::parse::<E>(&query.filters, self.filter_mode)?;
        let Some(record) = self.one_by_condition(condition).await? else {
            return Ok(None);
        };
        let mut loaded = self.attach_related(vec![record], &query.prefetch).await?;
        Ok(loaded.pop())
    }

    /// Fetch the single record where `field` equals `value`.
    ///
    /// # Errors
    ///
    /// Entities that do not declare `field` fail with
    /// [`RecordError::UnsupportedField`]; otherwise same failure modes as
    /// [`Self::one`].
    pub async fn one_by_unique_field(
        &self,
        field: &str,
        value: impl Into<JsonValue>,
    ) -> Result<Option<Loaded<E::Model>>, RecordError> {
        if E::Column::from_str(field).is_err() {
            return Err(RecordError::unsupported_field(field, entity_name::<E>()));
        }
        self.one(&Query::new().filter(field, value)).await
    }

    /// Fetch the single record with the given slug.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::one_by_unique_field`].
    pub async fn one_by_slug(&self, slug: &str) -> Result<Option<Loaded<E::Model>>, RecordError> {
        self.one_by_unique_field("slug", slug).await
    }

    /// Fetch the single record matching a prebuilt condition.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::one`].
    pub async fn one_by_condition(
        &self,
        condition: Condition,
    ) -> Result<Option<E::Model>, RecordError> {
        let mut rows = E::find()
            .filter(policy::visibility::<E>(self.delete_mode))
            .filter(condition)
            .limit(2)
            .all(&self.db)
            .await?;
        if rows.len() > 1 {
            return Err(RecordError::multiple_results(entity_name::<E>()));
        }
        Ok(rows.pop())
    }

    /// List all records matching a prebuilt condition, honoring visibility.
    ///
    /// # Errors
    ///
    /// Fails on database errors.
    pub async fn all_by_condition(
        &self,
        condition: Condition,
    ) -> Result<Vec<E::Model>, RecordError> {
        Ok(E::find()
            .filter(policy::visibility::<E>(self.delete_mode))
            .filter(condition)
            .all(&self.db)
            .await?)
    }

    /// List every visible record matching a query, without paging.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::filter`].
    pub async fn all(&self, query: &Query) -> Result<Vec<Loaded<E::Model>>, RecordError> {
        let unbounded = Query {
            limit: None,
            offset: None,
            ..query.clone()
        };
        self.filter(&unbounded).await
    }

    /// Create a record from a JSON document.
    ///
    /// The primary key, `created_at`/`updated_at` and the soft-delete flag
    /// are generated here and override anything the caller sent. Keys that
    /// name a registered relation are pulled out and inserted as child
    /// records after the parent, one handler call per child document. The
    /// parent and all children commit in one transaction; a failed child
    /// insert rolls the parent back.
    ///
    /// # Errors
    ///
    /// - [`RecordError::Payload`] when the payload is not a JSON object
    /// - [`RecordError::UnsupportedField`] for keys that are neither a
    ///   column nor a registered relation
    /// - [`RecordError::Conflict`] on unique-constraint violations
    pub async fn create(&self, payload: JsonValue) -> Result<E::Model, RecordError> {
        let JsonValue::Object(mut fields) = payload else {
            return Err(RecordError::Payload("create payload must be a JSON object".to_owned()));
        };

        let mut nested: Vec<(&RelationSpec, JsonValue)> = Vec::new();
        for spec in self.relations {
            if let Some(value) = fields.remove(spec.name) {
                nested.push((spec, value));
            }
        }
        for key in fields.keys() {
            if E::Column::from_str(key).is_err() {
                return Err(RecordError::unsupported_field(key, entity_name::<E>()));
            }
        }

        let pk_name = self.pk_column()?.as_str().to_owned();
        fields.insert(pk_name, JsonValue::String(papyra_shared::ids::new_key()));
        if policy::supports_soft_delete::<E>() {
            fields.insert(SOFT_DELETE_FLAG.to_owned(), JsonValue::Bool(false));
        }
        let now = json_timestamp()?;
        for stamp in ["created_at", "updated_at"] {
            if E::Column::from_str(stamp).is_ok() {
                fields.insert(stamp.to_owned(), now.clone());
            }
        }

        let active = E::ActiveModel::from_json(JsonValue::Object(fields))
            .map_err(RecordError::from_persistence)?;

        // Dropping the transaction on an early return rolls everything back.
        let txn = self.db.begin().await?;
        let model = active.insert(&txn).await.map_err(RecordError::from_persistence)?;

        if !nested.is_empty() {
            let parent_key = self.key_of(&model)?;
            for (spec, value) in nested {
                let children = match value {
                    JsonValue::Array(items) => items,
                    JsonValue::Null => Vec::new(),
                    single => vec![single],
                };
                debug!(
                    entity = %entity_name::<E>(),
                    relation = spec.name,
                    count = children.len(),
                    "inserting nested records"
                );
                for child in children {
                    (spec.insert)(&txn, &parent_key, child).await?;
                }
            }
        }
        txn.commit().await?;

        Ok(model)
    }

    /// Apply a partial JSON document to an existing record.
    ///
    /// The payload's fields are merged over the stored record; the primary
    /// key cannot be changed and is stripped from the payload. `updated_at`
    /// is refreshed. Returns `None` when no record has the key.
    ///
    /// # Errors
    ///
    /// - [`RecordError::UnsupportedField`] for keys that are not columns
    /// - [`RecordError::Conflict`] on unique-constraint violations
    pub async fn update(
        &self,
        key: &str,
        payload: JsonValue,
    ) -> Result<Option<E::Model>, RecordError> {
        let JsonValue::Object(fields) = payload else {
            return Err(RecordError::Payload("update payload must be a JSON object".to_owned()));
        };
        let pk_name = self.pk_column()?.as_str().to_owned();
        for name in fields.keys() {
            if name != &pk_name && E::Column::from_str(name).is_err() {
                return Err(RecordError::unsupported_field(name, entity_name::<E>()));
            }
        }

        let Some(existing) = self.get_by_key(key).await? else {
            return Ok(None);
        };
        let mut merged = record_document(&existing)?;
        for (name, value) in fields {
            if name == pk_name {
                continue;
            }
            merged.insert(name, value);
        }
        if E::Column::from_str("updated_at").is_ok() {
            merged.insert("updated_at".to_owned(), json_timestamp()?);
        }

        let active = E::ActiveModel::from_json(JsonValue::Object(merged))
            .map_err(RecordError::from_persistence)?;
        let model = active.update(&self.db).await.map_err(RecordError::from_persistence)?;
        Ok(Some(model))
    }

    /// Delete a record by key.
    ///
    /// In soft mode the record is tombstoned: the flag is set and
    /// `deleted_at` stamped, and subsequent filtered reads skip it. Passing
    /// `force`, running in [`DeleteMode::Hard`], or deleting an entity
    /// without a soft-delete flag removes the row outright. Returns whether
    /// a record existed.
    ///
    /// # Errors
    ///
    /// Fails on database errors.
    pub async fn delete(&self, key: &str, force: bool) -> Result<bool, RecordError> {
        let Some(existing) = self.get_by_key(key).await? else {
            return Ok(false);
        };

        let hard = force
            || self.delete_mode == DeleteMode::Hard
            || !policy::supports_soft_delete::<E>();
        if hard {
            debug!(entity = %entity_name::<E>(), key, "deleting record");
            existing
                .into_active_model()
                .delete(&self.db)
                .await
                .map_err(RecordError::from_persistence)?;
            return Ok(true);
        }

        debug!(entity = %entity_name::<E>(), key, "tombstoning record");
        let mut active = existing.into_active_model();
        let flag = E::Column::from_str(SOFT_DELETE_FLAG)
            .map_err(|_| RecordError::unsupported_field(SOFT_DELETE_FLAG, entity_name::<E>()))?;
        active.set(flag, true.into());
        if let Ok(stamp) = E::Column::from_str(SOFT_DELETE_AT) {
            active.set(stamp, Utc::now().into());
        }
        if let Ok(stamp) = E::Column::from_str("updated_at") {
            active.set(stamp, Utc::now().into());
        }
        active.update(&self.db).await.map_err(RecordError::from_persistence)?;
        Ok(true)
    }

    async fn attach_related(
        &self,
        records: Vec<E::Model>,
        prefetch: &[String],
    ) -> Result<Vec<Loaded<E::Model>>, RecordError> {
        if prefetch.is_empty() || records.is_empty() {
            return Ok(records.into_iter().map(Loaded::bare).collect());
        }
        let keys = records
            .iter()
            .map(|record| self.key_of(record))
            .collect::<Result<Vec<_>, _>>()?;
        let mut loaded: Vec<Loaded<E::Model>> =
            records.into_iter().map(Loaded::bare).collect();
        for name in prefetch {
            let spec = self
                .relations
                .iter()
                .find(|spec| spec.name == name)
                .ok_or_else(|| RecordError::invalid_relation(name, entity_name::<E>()))?;
            let mut grouped = (spec.load)(&self.db, &keys).await?;
            for (key, item) in keys.iter().zip(loaded.iter_mut()) {
                let children = grouped.remove(key).unwrap_or_default();
                item.related.insert(spec.name.to_owned(), children);
            }
        }
        Ok(loaded)
    }

    fn pk_column(&self) -> Result<E::Column, RecordError> {
        E::PrimaryKey::iter()
            .next()
            .map(PrimaryKeyToColumn::into_column)
            .ok_or_else(|| {
                RecordError::Payload(format!("{} has no primary key column", entity_name::<E>()))
            })
    }

    fn key_of(&self, record: &E::Model) -> Result<String, RecordError> {
        let pk = self.pk_column()?;
        match record.get(pk) {
            Value::String(Some(key)) => Ok(*key),
            other => Err(RecordError::Payload(format!(
                "primary key of {} is not a string: {other:?}",
                entity_name::<E>()
            ))),
        }
    }
}

/// The current time as a JSON value models can deserialize.
fn json_timestamp() -> Result<JsonValue, RecordError> {
    serde_json::to_value(Utc::now()).map_err(|err| RecordError::Payload(err.to_string()))
}

/// A record's stored state as a JSON object.
fn record_document<M: Serialize>(record: &M) -> Result<serde_json::Map<String, JsonValue>, RecordError> {
    match serde_json::to_value(record) {
        Ok(JsonValue::Object(fields)) => Ok(fields),
        Ok(_) => Err(RecordError::Payload("record did not serialize to an object".to_owned())),
        Err(err) => Err(RecordError::Payload(err.to_string())),
    }
}
