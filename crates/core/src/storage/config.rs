//! Storage backend configuration types.

use serde::{Deserialize, Serialize};

/// Configuration for S3-compatible object storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// Access key ID.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Bucket name.
    pub bucket: String,
    /// Region. Defaults to `us-east-1` when omitted.
    pub region: Option<String>,
    /// Custom endpoint for non-AWS providers (R2, Spaces, MinIO).
    pub endpoint: Option<String>,
    /// Whether stored objects are publicly readable.
    pub public: bool,
    /// Custom key prefix. Defaults to `public`/`private` from the flag.
    pub prefix: Option<String>,
}

impl S3Config {
    /// Default region when none is configured.
    pub const DEFAULT_REGION: &'static str = "us-east-1";

    /// Create a private-by-default S3 configuration.
    #[must_use]
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            bucket: bucket.into(),
            region: None,
            endpoint: None,
            public: false,
            prefix: None,
        }
    }

    /// Set the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set a custom endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Mark stored objects publicly readable.
    #[must_use]
    pub fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    /// Set a custom key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Region to use, falling back to the default.
    #[must_use]
    pub fn region_or_default(&self) -> &str {
        self.region.as_deref().unwrap_or(Self::DEFAULT_REGION)
    }

    /// Key prefix to use: custom when set, else `public`/`private` from the
    /// visibility flag.
    #[must_use]
    pub fn prefix_or_default(&self) -> &str {
        match self.prefix.as_deref() {
            Some(prefix) => prefix.trim_matches('/'),
            None if self.public => "public",
            None => "private",
        }
    }

    /// Canned ACL reported at write time.
    #[must_use]
    pub const fn acl(&self) -> &'static str {
        if self.public { "public-read" } else { "private" }
    }
}
