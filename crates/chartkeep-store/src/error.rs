//! Error types for chartkeep-store

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while reading or writing stored objects
#[derive(Debug, Error)]
pub enum StoreError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Nothing stored under the requested name or selector
    #[error("{kind} '{name}' not found in namespace '{namespace}'")]
    NotFound {
        kind: &'static str,
        name: String,
        namespace: String,
    },

    /// Object already exists
    #[error("{kind} '{name}' already exists in namespace '{namespace}'")]
    AlreadyExists {
        kind: &'static str,
        name: String,
        namespace: String,
    },

    /// Attempt to modify an immutable object in place
    #[error("object '{name}' is immutable and must be replaced")]
    Immutable { name: String },

    /// Artifact payload exceeds the object size limit
    #[error("artifact '{name}' too large ({size} bytes, max {max} bytes)")]
    ArtifactTooLarge { name: String, size: usize, max: usize },

    /// Stored object is missing expected content
    #[error("invalid object '{name}': {message}")]
    InvalidObject { name: String, message: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>, namespace: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
            namespace: namespace.to_string(),
        }
    }

    pub(crate) fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidObject {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<chartkeep_core::CoreError> for StoreError {
    fn from(e: chartkeep_core::CoreError) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
