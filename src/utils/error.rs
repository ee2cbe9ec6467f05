//! Error Handling Module
//!
//! Defines the error type shared by the dataset, model and uncertainty
//! layers. Numeric edge cases are never reported here: they are absorbed by
//! clamping inside the loss functions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the uncertainty experiments
#[derive(Error, Debug)]
pub enum UncertaintyError {
    /// A dataset file is missing, truncated or malformed
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Downloading or extracting a dataset archive failed
    #[error("Download error: {0}")]
    Download(String),

    /// Error with model construction or checkpoint I/O
    #[error("Model error: {0}")]
    Model(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Ensemble aggregation was asked to average zero members
    #[error("Ensemble has no members")]
    EmptyEnsemble,

    /// Probability rows of different widths were combined
    #[error("Shape mismatch: expected {expected} classes, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

impl From<serde_json::Error> for UncertaintyError {
    fn from(err: serde_json::Error) -> Self {
        UncertaintyError::Serialization(err.to_string())
    }
}

/// Convenience Result type
pub type Result<T> = std::result::Result<T, UncertaintyError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| UncertaintyError::Dataset(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| UncertaintyError::Dataset(format!("{}: {}", f(), e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| UncertaintyError::Dataset(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| UncertaintyError::Dataset(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UncertaintyError::Dataset("truncated batch".to_string());
        assert_eq!(format!("{}", err), "Dataset error: truncated batch");
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = UncertaintyError::ShapeMismatch {
            expected: 10,
            actual: 100,
        };
        assert_eq!(err.to_string(), "Shape mismatch: expected 10 classes, got 100");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: UncertaintyError = io_err.into();
        assert!(matches!(err, UncertaintyError::Io(_)));
    }

    #[test]
    fn test_option_context() {
        let opt: Option<i32> = None;
        let with_context = opt.context("Value was None");
        assert!(matches!(with_context, Err(UncertaintyError::Dataset(_))));
    }
}
