//! Configuration Error Types
//!
//! Errors raised while loading and validating the scoring configuration. Messages name the
//! offending field so a bad override can be fixed without reading code.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Configuration directory does not exist
    #[error("Configuration directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Configuration sources could not be read or merged
    #[error("Failed to build configuration from '{source_description}': {error}")]
    SourceError {
        source_description: String,
        error: String,
    },

    /// Merged configuration could not be deserialized into the typed structure
    #[error("Failed to deserialize configuration: {error}")]
    DeserializationError { error: String },

    /// Missing required configuration field
    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// Weights that must add up to a fixed total do not
    #[error("Weights for {context} sum to {actual}, expected {expected}")]
    WeightSumMismatch {
        context: String,
        expected: f64,
        actual: f64,
    },
}

impl ConfigurationError {
    /// Create a source error
    pub fn source_error<S: Into<String>, E: std::fmt::Display>(source: S, error: E) -> Self {
        Self::SourceError {
            source_description: source.into(),
            error: error.to_string(),
        }
    }

    /// Create a deserialization error
    pub fn deserialization_error<E: std::fmt::Display>(error: E) -> Self {
        Self::DeserializationError {
            error: error.to_string(),
        }
    }

    /// Create a missing required field error
    pub fn missing_required_field<F: Into<String>, C: Into<String>>(field: F, context: C) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value<F: Into<String>, V: Into<String>, C: Into<String>>(
        field: F,
        value: V,
        context: C,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    pub fn weight_sum_mismatch<C: Into<String>>(context: C, expected: f64, actual: f64) -> Self {
        Self::WeightSumMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigurationError>;
