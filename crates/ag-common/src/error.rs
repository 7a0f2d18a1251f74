//! Error types for Anomaly Grid.
//!
//! The detector contract has three failure kinds, all raised synchronously and
//! never retried:
//! - `InvalidParameter`: a constructor or call argument is out of range
//! - `InvalidInput`: the training corpus is empty or contains an empty sequence
//! - `NotFitted`: scoring or metrics were requested before a successful fit
//!
//! Numeric edge cases (unseen symbols, zero-probability contexts) are not
//! errors; the scorer absorbs them through backoff and smoothing.
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 10,
//!   "category": "parameter",
//!   "message": "invalid parameter: max_order must be a positive integer, got 0"
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Anomaly Grid operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Out-of-range constructor or call arguments.
    Parameter,
    /// Malformed training or scoring input.
    Input,
    /// Operation invoked in the wrong model state.
    State,
    /// Persisted model could not be loaded.
    Snapshot,
    /// Configuration file errors.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Parameter => write!(f, "parameter"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::State => write!(f, "state"),
            ErrorCategory::Snapshot => write!(f, "snapshot"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Anomaly Grid.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("detector is not fitted; call fit() before scoring or reading metrics")]
    NotFitted,

    #[error("invalid model snapshot: {0}")]
    Snapshot(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: parameter and input contract violations
    /// - 20-29: model state errors
    /// - 30-39: snapshot and configuration errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidParameter(_) => 10,
            Error::InvalidInput(_) => 11,
            Error::NotFitted => 20,
            Error::Snapshot(_) => 30,
            Error::Config(_) => 31,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidParameter(_) => ErrorCategory::Parameter,
            Error::InvalidInput(_) => ErrorCategory::Input,
            Error::NotFitted => ErrorCategory::State,
            Error::Snapshot(_) => ErrorCategory::Snapshot,
            Error::Config(_) => ErrorCategory::Config,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::InvalidParameter(_) => "Invalid Parameter",
            Error::InvalidInput(_) => "Invalid Input",
            Error::NotFitted => "Detector Not Fitted",
            Error::Snapshot(_) => "Invalid Model Snapshot",
            Error::Config(_) => "Configuration Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::InvalidParameter(_) => {
                "Use a positive max_order and a threshold within [0, 1]."
            }
            Error::InvalidInput(_) => {
                "Provide at least one training sequence and make sure no sequence is empty."
            }
            Error::NotFitted => "Train the detector with 'anomaly-grid fit' before scoring.",
            Error::Snapshot(_) => {
                "Re-create the model file with 'anomaly-grid fit'; it is corrupted or from an incompatible version."
            }
            Error::Config(_) => "Check the detector.toml syntax and value ranges.",
            Error::Io(_) => "Check that the file exists and is readable or writable.",
            Error::Json(_) => "Check the JSON syntax of the input file.",
        }
    }

    /// Shorthand for an `InvalidParameter` error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Error::InvalidParameter(message.into())
    }

    /// Shorthand for an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Remediation hint.
    pub remediation: String,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            remediation: err.remediation().to_string(),
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_category() {
        assert_eq!(Error::invalid_parameter("x").code(), 10);
        assert_eq!(Error::invalid_input("x").code(), 11);
        assert_eq!(Error::NotFitted.code(), 20);
        assert_eq!(Error::Snapshot("x".into()).code(), 30);
        assert_eq!(Error::Config("x".into()).code(), 31);

        let io = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.code(), 60);
        assert_eq!(io.category(), ErrorCategory::Io);
    }

    #[test]
    fn categories() {
        assert_eq!(
            Error::invalid_parameter("x").category(),
            ErrorCategory::Parameter
        );
        assert_eq!(Error::invalid_input("x").category(), ErrorCategory::Input);
        assert_eq!(Error::NotFitted.category(), ErrorCategory::State);
    }

    #[test]
    fn display_messages() {
        let err = Error::invalid_parameter("max_order must be positive");
        assert_eq!(
            err.to_string(),
            "invalid parameter: max_order must be positive"
        );
        assert!(Error::NotFitted.to_string().contains("not fitted"));
    }

    #[test]
    fn structured_error_json() {
        let err = Error::NotFitted;
        let structured = StructuredError::from(&err);
        let json: serde_json::Value = serde_json::from_str(&structured.to_json()).unwrap();
        assert_eq!(json["code"], 20);
        assert_eq!(json["category"], "state");
        assert!(json["remediation"].as_str().unwrap().contains("fit"));
    }

    #[test]
    fn category_display() {
        assert_eq!(ErrorCategory::Parameter.to_string(), "parameter");
        assert_eq!(ErrorCategory::Snapshot.to_string(), "snapshot");
    }
}
