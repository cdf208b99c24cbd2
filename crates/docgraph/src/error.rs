//! Error types for docgraph operations.
//!
//! Unresolvable imports and other recoverable conditions are reported as
//! [`Diagnostic`](crate::Diagnostic)s rather than errors; [`DocError`] covers
//! the failures that stop an operation.

use thiserror::Error;

/// Result type alias for docgraph operations.
pub type Result<T> = std::result::Result<T, DocError>;

/// Error type for record, cache and option handling.
#[derive(Error, Debug)]
pub enum DocError {
    /// Snapshot storage failure (file I/O, missing directory, ...)
    #[error("Storage error: {message}")]
    Storage {
        /// Detailed error message
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error details
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Unrecognized display option or option value
    #[error("Invalid option '{option}': {message}")]
    InvalidOption {
        /// Option name as given by the caller
        option: String,
        /// What was wrong with it
        message: String,
    },

    /// Object id not present in the object store
    #[error("Object not found: {id}")]
    ObjectNotFound {
        /// Dotted id that was looked up
        id: String,
    },
}

impl DocError {
    /// Create a storage error from a message and optional source.
    pub fn storage<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create a serialization error from a message and optional source.
    pub fn serialization<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Serialization {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create an invalid option error.
    pub fn invalid_option(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            message: message.into(),
        }
    }
}
