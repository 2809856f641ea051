//! Error types for the encryption provider
//!
//! Errors carry enough context (field paths, task names) to be
//! actionable from a log line alone.

use thiserror::Error;

/// Main error type for encryption provider operations
#[derive(Debug, Error)]
pub enum Error {
    /// Static configuration is missing or inconsistent
    #[error("configuration error: {message}")]
    Config {
        /// Description of what's invalid
        message: String,
        /// The offending field (e.g., "targetNamespace")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// A background task the operator depends on stopped
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Task where the error occurred (e.g., "secret-cache")
        context: String,
    },
}

impl Error {
    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a configuration error pointing at a specific field
    pub fn config_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Get the offending configuration field, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::Config { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    /// Get the task context if this error has one
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::Internal { context, .. } => Some(context),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_without_field() {
        let err = Error::config("annotation key must not be empty");
        assert!(err.to_string().contains("configuration error"));
        assert_eq!(err.field(), None);
        assert_eq!(err.context(), None);
    }

    #[test]
    fn config_field_errors_name_the_field() {
        let err = Error::config_field("targetNamespace", "must not be empty");
        assert_eq!(err.field(), Some("targetNamespace"));
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn serialization_error_display() {
        let err = Error::serialization("invalid YAML");
        assert_eq!(err.to_string(), "serialization error: invalid YAML");
    }

    #[test]
    fn internal_errors_carry_context() {
        let err = Error::internal_with_context("secret-cache", "watch task panicked");
        assert_eq!(
            err.to_string(),
            "internal error [secret-cache]: watch task panicked"
        );
        assert_eq!(err.context(), Some("secret-cache"));
        assert_eq!(err.field(), None);
    }
}
