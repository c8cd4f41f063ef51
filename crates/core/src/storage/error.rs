//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
///
/// Each kind is distinct so callers can branch: `AlreadyExists` maps to an
/// idempotent success for deduplicated uploads, `NotFound` to a 404-style
/// response. The core never retries any of these.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object not found in storage.
    #[error("object not found: {key}")]
    NotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// Save without overwrite onto an occupied key.
    #[error("object already exists: {key}")]
    AlreadyExists {
        /// Storage key that is already occupied.
        key: String,
    },

    /// Backend denied access.
    #[error("permission denied: {key}")]
    PermissionDenied {
        /// Storage key the backend refused.
        key: String,
    },

    /// Name resolves outside the backend's root or prefix.
    #[error("invalid storage path: {name}")]
    InvalidPath {
        /// The offending name.
        name: String,
    },

    /// Content exceeds the configured size limit.
    #[error("content size {size} bytes exceeds maximum allowed {max} bytes")]
    FileTooLarge {
        /// Actual content size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// Operation not supported by this backend.
    #[error("operation not supported by storage backend: {0}")]
    Unsupported(String),

    /// Backend configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Any other backend failure.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an already-exists error.
    #[must_use]
    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::AlreadyExists { key: key.into() }
    }

    /// Create an invalid-path error.
    #[must_use]
    pub fn invalid_path(name: impl Into<String>) -> Self {
        Self::InvalidPath { name: name.into() }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Translate an OpenDAL error for the object stored under `key`.
    #[must_use]
    pub(crate) fn from_opendal(key: &str, err: &opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound { key: key.into() },
            opendal::ErrorKind::ConditionNotMatch | opendal::ErrorKind::AlreadyExists => {
                Self::AlreadyExists { key: key.into() }
            }
            opendal::ErrorKind::PermissionDenied => Self::PermissionDenied { key: key.into() },
            opendal::ErrorKind::Unsupported => Self::Unsupported(err.to_string()),
            opendal::ErrorKind::ConfigInvalid => Self::Configuration(err.to_string()),
            _ => Self::Operation(err.to_string()),
        }
    }

    /// Translate a filesystem error for the object stored under `key`.
    #[must_use]
    pub(crate) fn from_io(key: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { key: key.into() },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { key: key.into() },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { key: key.into() },
            _ => Self::Operation(err.to_string()),
        }
    }
}
