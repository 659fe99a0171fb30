//! Error types for cachegate
//!
//! All modules use `CachegateResult<T>` as their return type. Artifact store
//! failures have their own type (`crate::store::StoreError`) and only become
//! a `CachegateError` once the error classifier has decided they are fatal.

use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cachegate operations
pub type CachegateResult<T> = Result<T, CachegateError>;

/// All errors that can abort a pipeline step
#[derive(Error, Debug)]
pub enum CachegateError {
    // Configuration errors
    #[error("Input required and not supplied: {0}")]
    ConfigMissing(String),

    #[error("Invalid input {name}: {reason}")]
    InputInvalid { name: String, reason: String },

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Cache errors
    #[error("Cache not found for input keys: {}", keys.join(", "))]
    CacheMiss { keys: Vec<String> },

    #[error("{0}")]
    Validation(String),

    #[error("Artifact store error: {0}")]
    Store(String),

    // Run state errors
    #[error("Run state for {run_id} already records {name} = {existing}")]
    RunStateConflict {
        run_id: String,
        name: String,
        existing: String,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CachegateError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid input error
    pub fn input_invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InputInvalid {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error comes from missing or malformed configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigMissing(_) | Self::InputInvalid { .. } | Self::ConfigInvalid { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigMissing(name) if name == "key" => Some(
                "Pass --key or set INPUT_KEY, or run `cachegate restore` for the same paths first",
            ),
            Self::ConfigMissing(name) if name == "path" => {
                Some("Pass --path (repeatable) or set INPUT_PATH to a newline-separated list")
            }
            Self::CacheMiss { .. } => {
                Some("Set `required: false` (INPUT_REQUIRED=false) to continue on a cache miss")
            }
            Self::RunStateConflict { .. } => Some("Pass a distinct --run-id per run"),
            _ => None,
        }
    }
}

impl From<StoreError> for CachegateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(message) => Self::Validation(message),
            other => Self::Store(other.to_string()),
        }
    }
}
