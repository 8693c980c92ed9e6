//! Error types for the releval core library.
//!
//! Uses `thiserror` for public API error types. Every error is a caller-input
//! problem detected before any partial structure is exposed, so none of them
//! are retried internally.

use std::fmt;
use std::path::PathBuf;

/// Top-level error type for the releval core library.
#[derive(Debug, thiserror::Error)]
pub enum RelevalError {
    #[error("Invalid argument type: {message}")]
    InvalidArgumentType { message: String },

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("Unable to resolve all measures: {}", unresolved.join(", "))]
    MeasureResolution { unresolved: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelevalError {
    pub fn invalid_type(message: impl Into<String>) -> Self {
        Self::InvalidArgumentType {
            message: message.into(),
        }
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }

    /// Builds the error for a shape violation found while marshalling a
    /// nested mapping.
    pub fn shape(violation: ShapeViolation, context: impl fmt::Display) -> Self {
        Self::InvalidArgumentType {
            message: format!("{violation} (at {context})"),
        }
    }
}

/// The specific constraint a host mapping broke during marshalling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeViolation {
    /// The top-level argument was not a mapping.
    NotMapping,
    /// An outer value was not itself a mapping.
    ValueNotMapping,
    /// An inner value failed the variant's type constraint.
    InnerValueWrongType { expected: &'static str },
}

impl fmt::Display for ShapeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotMapping => write!(f, "expected mapping of query id to documents"),
            Self::ValueNotMapping => write!(f, "expected mapping as value"),
            Self::InnerValueWrongType { expected } => write!(f, "expected {expected}"),
        }
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `RelevalError`.
pub type Result<T> = std::result::Result<T, RelevalError>;
