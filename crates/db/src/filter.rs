//! Dynamic filter parsing.
//!
//! Web callers hand criteria through as `field[__operator]: value` pairs;
//! this module turns them into a SeaORM [`Condition`] over a typed entity.
//! Field names are validated against the entity's declared columns, so a
//! typo in a field is always a caller error. What happens to an unknown
//! *operator* depends on [`FilterMode`].

use std::str::FromStr;

use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition, EntityTrait, IdenStatic, Value};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::error::RecordError;

/// Supported filter operators.
pub const OPERATORS: &[&str] = &[
    "eq", "ne", "lt", "lte", "gt", "gte", "like", "ilike", "in", "notin", "isnull",
];

/// How the parser treats a filter clause whose operator (or multi-underscore
/// field spelling) cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Drop the clause with a warning. Matches the historical behavior
    /// callers may depend on: `age__gth` silently filters nothing.
    #[default]
    Permissive,
    /// Reject the whole filter set with [`RecordError::InvalidOperator`].
    Strict,
}

/// An ordered set of `field[__operator] -> value` criteria.
#[derive(Debug, Clone, Default)]
pub struct Filters(Vec<(String, JsonValue)>);

impl Filters {
    /// Create an empty filter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criterion, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add a criterion.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.push((key.into(), value.into()));
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of criteria.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over criteria in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Parse a filter set into an AND-combined condition over entity `E`.
///
/// An empty set yields an always-true condition. The top-level field (the
/// segment before the first `__`) must name a declared column; the operator
/// is the segment after the last `__`, defaulting to `eq`.
///
/// # Errors
///
/// - [`RecordError::InvalidField`] when the top-level field is unknown
/// - [`RecordError::InvalidOperator`] for unknown operators in strict mode
/// - [`RecordError::Payload`] when an operator gets a value of the wrong
///   shape (`like` without a string pattern)
pub fn parse<E: EntityTrait>(filters: &Filters, mode: FilterMode) -> Result<Condition, RecordError> {
    let mut condition = Condition::all();

    for (key, value) in filters.iter() {
        let head = key.split("__").next().unwrap_or(key);
        if E::Column::from_str(head).is_err() {
            return Err(RecordError::invalid_field(head, entity_name::<E>()));
        }

        let (field, operator) = match key.rsplit_once("__") {
            None => (key, "eq"),
            Some((field, op)) if OPERATORS.contains(&op) => (field, op),
            Some((_, op)) => match mode {
                FilterMode::Strict => {
                    return Err(RecordError::invalid_operator(op, key));
                }
                FilterMode::Permissive => {
                    warn!(key, operator = op, "dropping filter clause with unknown operator");
                    continue;
                }
            },
        };

        // A multi-underscore spelling can pass head validation yet not
        // resolve as a whole ("age__x__gt"); it gets the operator treatment.
        let Ok(column) = E::Column::from_str(field) else {
            match mode {
                FilterMode::Strict => {
                    return Err(RecordError::invalid_field(field, entity_name::<E>()));
                }
                FilterMode::Permissive => {
                    warn!(key, field, "dropping filter clause with unresolvable field");
                    continue;
                }
            }
        };

        condition = condition.add(clause::<E>(column, operator, value)?);
    }

    Ok(condition)
}

/// Build one comparison expression.
fn clause<E: EntityTrait>(
    column: E::Column,
    operator: &str,
    value: &JsonValue,
) -> Result<SimpleExpr, RecordError> {
    let expr = match operator {
        // A bare `= NULL` matches nothing in SQL; null comparisons mean
        // null checks.
        "eq" if value.is_null() => column.is_null(),
        "ne" if value.is_null() => column.is_not_null(),
        "eq" => column.eq(to_value(value)),
        "ne" => column.ne(to_value(value)),
        "lt" => column.lt(to_value(value)),
        "lte" => column.lte(to_value(value)),
        "gt" => column.gt(to_value(value)),
        "gte" => column.gte(to_value(value)),
        "like" => column.like(pattern(operator, value)?),
        "ilike" => Expr::col((E::default(), column)).ilike(pattern(operator, value)?),
        "in" => column.is_in(to_list(value)),
        "notin" => column.is_not_in(to_list(value)),
        "isnull" => {
            if is_truthy(value) {
                column.is_null()
            } else {
                column.is_not_null()
            }
        }
        // parse() only forwards operators from OPERATORS
        other => {
            return Err(RecordError::invalid_operator(other, column.as_str()));
        }
    };
    Ok(expr)
}

/// Table name of entity `E`, for error messages.
pub(crate) fn entity_name<E: EntityTrait>() -> String {
    E::default().table_name().to_string()
}

/// Convert a JSON scalar into a database value.
fn to_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::String(None),
        JsonValue::Bool(b) => (*b).into(),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(u) = n.as_u64() {
                u.into()
            } else {
                n.as_f64().unwrap_or(0.0).into()
            }
        }
        JsonValue::String(s) => s.clone().into(),
        other => Value::Json(Some(Box::new(other.clone()))),
    }
}

/// Coerce a value into a membership list; scalars become one-element lists.
fn to_list(value: &JsonValue) -> Vec<Value> {
    match value {
        JsonValue::Array(items) => items.iter().map(to_value).collect(),
        scalar => vec![to_value(scalar)],
    }
}

/// `like`/`ilike` patterns must be strings.
fn pattern<'v>(operator: &str, value: &'v JsonValue) -> Result<&'v str, RecordError> {
    value
        .as_str()
        .ok_or_else(|| RecordError::Payload(format!("'{operator}' requires a string pattern")))
}

/// Python-style truthiness for the `isnull` operator.
fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
    }
}
