//! Error types for mynlu
//!
//! [`NluError`] is the crate-level error. Assembly and execution problems
//! keep their structured pipeline errors ([`PipelineSpecError`],
//! [`PipelineRuntimeError`]) wrapped inside it.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pipeline::errors::{PipelineRuntimeError, PipelineSpecError};

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, NluError>;

/// Main error type for mynlu
#[derive(Error, Debug)]
pub enum NluError {
    /// Configuration could not be resolved (malformed file, unknown pipeline
    /// template, bad option type). Raised before any component runs.
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// The pipeline could not be assembled.
    #[error(transparent)]
    Spec(#[from] PipelineSpecError),

    /// A component failed while running.
    #[error(transparent)]
    Runtime(#[from] PipelineRuntimeError),

    /// Training data file is structurally unusable.
    #[error("Invalid training data: {message}")]
    InvalidTrainingData { message: String },

    /// Filesystem access failed.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl NluError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid training data error
    pub fn invalid_training_data(message: impl Into<String>) -> Self {
        Self::InvalidTrainingData {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Check if this error was raised while resolving configuration
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

impl From<serde_json::Error> for NluError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error_code::ErrorCode;

    #[test]
    fn test_error_display() {
        let err = NluError::config("unknown pipeline template 'x'");
        assert!(err.to_string().contains("Invalid configuration"));
        assert!(err.to_string().contains("'x'"));
        assert!(err.is_config());

        let err = NluError::io(
            "models/metadata.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("models/metadata.json"));
        assert!(!err.is_config());
    }

    #[test]
    fn test_spec_error_is_transparent() {
        let spec = PipelineSpecError::new(ErrorCode::UnknownComponent, "/pipeline/0", "nope");
        let err: NluError = spec.clone().into();
        assert_eq!(err.to_string(), spec.to_string());
    }
}
