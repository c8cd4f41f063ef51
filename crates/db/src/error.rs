//! Record service error types.

use thiserror::Error;

/// Errors surfaced by the generic record service.
///
/// Validation kinds (`InvalidField`, `InvalidOperator`, `InvalidRelation`,
/// `UnsupportedField`) are caller mistakes and never retried; `Conflict`
/// carries the offending column when the backing error exposes it.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Filter key names a field the entity does not declare.
    #[error("invalid field '{field}' for entity '{entity}'")]
    InvalidField {
        /// The unknown field name.
        field: String,
        /// The entity (table) name.
        entity: String,
    },

    /// Filter key carries an unknown operator (strict mode only).
    #[error("invalid operator '{operator}' in filter key '{key}'")]
    InvalidOperator {
        /// The unknown operator suffix.
        operator: String,
        /// The full filter key.
        key: String,
    },

    /// Prefetch names a relation the entity does not declare.
    #[error("invalid relation '{relation}' for entity '{entity}'")]
    InvalidRelation {
        /// The unknown relation name.
        relation: String,
        /// The entity (table) name.
        entity: String,
    },

    /// Unique-field lookup on an entity that lacks the field.
    #[error("entity '{entity}' does not declare a '{field}' field")]
    UnsupportedField {
        /// The missing field name.
        field: String,
        /// The entity (table) name.
        entity: String,
    },

    /// Uniqueness violation at persistence time.
    #[error("{message}")]
    Conflict {
        /// Offending column, when extractable from the backing error.
        field: Option<String>,
        /// Human-readable conflict description.
        message: String,
    },

    /// A single-record query matched more than one row.
    #[error("multiple records match a single-record query on '{entity}'")]
    MultipleResults {
        /// The entity (table) name.
        entity: String,
    },

    /// Malformed create/update payload.
    #[error("malformed payload: {0}")]
    Payload(String),

    /// Any other database failure.
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl RecordError {
    /// Create an invalid-field error.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            entity: entity.into(),
        }
    }

    /// Create an invalid-operator error.
    #[must_use]
    pub fn invalid_operator(operator: impl Into<String>, key: impl Into<String>) -> Self {
        Self::InvalidOperator {
            operator: operator.into(),
            key: key.into(),
        }
    }

    /// Create an invalid-relation error.
    #[must_use]
    pub fn invalid_relation(relation: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::InvalidRelation {
            relation: relation.into(),
            entity: entity.into(),
        }
    }

    /// Create an unsupported-field error.
    #[must_use]
    pub fn unsupported_field(field: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::UnsupportedField {
            field: field.into(),
            entity: entity.into(),
        }
    }

    /// Create a multiple-results error.
    #[must_use]
    pub fn multiple_results(entity: impl Into<String>) -> Self {
        Self::MultipleResults {
            entity: entity.into(),
        }
    }

    /// Translate a persistence error, turning unique violations into
    /// structured conflicts.
    #[must_use]
    pub(crate) fn from_persistence(err: sea_orm::DbErr) -> Self {
        if let Some(sea_orm::SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            let field = conflict_field(&detail);
            let message = match &field {
                Some(f) => format!("{} already exists.", capitalize(f)),
                None => format!("integrity error: {detail}"),
            };
            return Self::Conflict { field, message };
        }
        Self::Database(err)
    }
}

/// Extract the offending column from a Postgres unique-violation DETAIL
/// message of the form `Key (column)=(value) already exists.`
pub(crate) fn conflict_field(message: &str) -> Option<String> {
    let start = message.find("Key (")? + "Key (".len();
    let rest = &message[start..];
    let end = rest.find(")=(")?;
    let field = &rest[..end];
    (!field.is_empty()).then(|| field.to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_field_extracted_from_postgres_detail() {
        let detail = r#"duplicate key value violates unique constraint "authors_slug_key": Key (slug)=(hello-world) already exists."#;
        assert_eq!(conflict_field(detail).as_deref(), Some("slug"));
    }

    #[test]
    fn test_conflict_field_absent_for_other_messages() {
        assert!(conflict_field("some unrelated failure").is_none());
        assert!(conflict_field("Key ()=() already exists.").is_none());
    }

    #[test]
    fn test_from_persistence_passes_through_other_errors() {
        let err = RecordError::from_persistence(sea_orm::DbErr::Custom("boom".into()));
        assert!(matches!(err, RecordError::Database(_)));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("slug"), "Slug");
        assert_eq!(capitalize(""), "");
    }
}
