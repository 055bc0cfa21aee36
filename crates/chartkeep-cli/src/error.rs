//! CLI error types with exit code handling
//!
//! Library errors are mapped onto a small set of CLI errors, each with its
//! own exit code and optional help text.

use chartkeep_engine::EngineError;
use chartkeep_repo::RepoError;
use chartkeep_store::StoreError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Something requested is not stored
    #[error("{message}")]
    #[diagnostic(code(chartkeep::cli::not_found))]
    NotFound {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Bundle or input failed a structural check
    #[error("Validation failed: {message}")]
    #[diagnostic(code(chartkeep::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Values documents could not be composed
    #[error("{message}")]
    #[diagnostic(code(chartkeep::cli::composition))]
    Composition { message: String },

    /// Deadline elapsed
    #[error("{message}")]
    #[diagnostic(
        code(chartkeep::cli::timeout),
        help("raise assembleTimeout or fetchTimeout in the settings file")
    )]
    Timeout { message: String },

    /// Download or cluster connection failed
    #[error("{message}")]
    #[diagnostic(code(chartkeep::cli::network))]
    Network { message: String },

    /// Invalid command-line input
    #[error("Invalid input: {message}")]
    #[diagnostic(code(chartkeep::cli::usage))]
    Usage { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartkeep::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(chartkeep::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Composition { .. } => exit_codes::COMPOSITION_ERROR,
            CliError::Timeout { .. } => exit_codes::TIMEOUT,
            CliError::Network { .. } => exit_codes::NETWORK_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    fn not_found(message: String) -> Self {
        Self::NotFound {
            message,
            help: Some("run `chartkeep import` to store the chart first".to_string()),
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            e if e.is_not_found() => CliError::not_found(message),
            EngineError::DependencyUnavailable { .. } | EngineError::VersionMismatch { .. } => {
                CliError::not_found(message)
            }
            EngineError::Validation { .. } => CliError::Validation {
                message,
                help: Some("every chart needs at least one template".to_string()),
            },
            EngineError::Composition { .. } => CliError::Composition { message },
            EngineError::Timeout(_) => CliError::Timeout { message },
            EngineError::Store(StoreError::Api(_)) => CliError::Network { message },
            _ => CliError::Other { message },
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            e if e.is_not_found() => CliError::not_found(message),
            StoreError::Api(_) => CliError::Network { message },
            _ => CliError::Other { message },
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Store(e) => e.into(),
            RepoError::Engine(e) => e.into(),
            RepoError::Timeout { .. } => CliError::Timeout {
                message: err.to_string(),
            },
            RepoError::HttpError { .. } | RepoError::NetworkError { .. } => CliError::Network {
                message: err.to_string(),
            },
            RepoError::ChartNotFound { .. } | RepoError::UnsatisfiableConstraint { .. } => CliError::NotFound {
                message: err.to_string(),
                help: None,
            },
            RepoError::InvalidRepositoryUrl { .. } => CliError::Usage {
                message: err.to_string(),
            },
            other => CliError::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
