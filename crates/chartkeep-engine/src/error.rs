//! Error types for chartkeep-engine

use chartkeep_store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while composing values or assembling a bundle
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Store access failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No chart record matches the request
    #[error("chart '{chart}' not found in {selector}")]
    ChartNotFound { chart: String, selector: String },

    /// No stored version satisfies the constraint
    #[error("no version of chart '{chart}' matches '{constraint}'")]
    VersionNotFound { chart: String, constraint: String },

    /// A pinned dependency version is absent from the dependency's record
    #[error("dependency '{dependency}' is pinned to {version}, which is not stored (available: {available})")]
    VersionMismatch {
        dependency: String,
        version: String,
        available: String,
    },

    /// A declared dependency has no chart record in the repository
    #[error("dependency '{dependency}' of chart '{chart}' is not available in {selector}")]
    DependencyUnavailable {
        chart: String,
        dependency: String,
        selector: String,
    },

    /// Dependency tree nests deeper than allowed
    #[error("dependency depth exceeds maximum of {max}: {path}")]
    DepthExceeded { max: usize, path: String },

    /// A chart depends on itself through its dependency tree
    #[error("circular chart dependency: {path}")]
    DependencyCycle { path: String },

    /// Fetching or merging configuration documents failed
    #[error("values composition failed: {message}")]
    Composition { message: String },

    /// Structural check of the assembled bundle failed
    #[error("bundle validation failed for chart '{chart}': {message}")]
    Validation { chart: String, message: String },

    /// Deadline elapsed
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid values input
    #[error("invalid values: {0}")]
    Values(String),
}

impl EngineError {
    pub(crate) fn composition(message: impl Into<String>) -> Self {
        Self::Composition {
            message: message.into(),
        }
    }

    /// Check if this error means something requested is not stored
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Store(e) => e.is_not_found(),
            Self::ChartNotFound { .. } | Self::VersionNotFound { .. } => true,
            _ => false,
        }
    }
}

impl From<chartkeep_core::CoreError> for EngineError {
    fn from(e: chartkeep_core::CoreError) -> Self {
        EngineError::Values(e.to_string())
    }
}
