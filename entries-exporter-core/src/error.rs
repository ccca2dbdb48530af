//! Error types with credential-free messages.
//!
//! Connection parameters, consumer secrets and CA certificate text never
//! appear in any message produced here. Per-form schema mismatches and
//! per-row write failures are not errors at this level: they are tallied in
//! [`crate::results`] and the run continues.

use thiserror::Error;

/// Main error type for exporter operations.
#[derive(Debug, Error)]
pub enum ExporterError {
    /// Target database connection or authentication failed
    #[error("Database connection failed: {context}")]
    Connection {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Settings are missing, malformed or inconsistent
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The entry source rejected or failed a request
    #[error("Entry source request failed: {context}")]
    Source {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A query against the target failed outside the per-row write path
    #[error("Query execution failed: {context}")]
    Query {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience type alias for Results with ExporterError
pub type Result<T> = std::result::Result<T, ExporterError>;

impl ExporterError {
    /// Creates a connection error without echoing connection parameters
    pub fn connection_failed<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            context: "Unable to connect to MySQL".to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a source error wrapping an underlying failure
    pub fn source_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Source {
            context: context.into(),
            source: Some(Box::new(error)),
        }
    }

    /// Creates a source error from a status or payload problem
    pub fn source_rejected(context: impl Into<String>) -> Self {
        Self::Source {
            context: context.into(),
            source: None,
        }
    }

    /// Creates a query error with context
    pub fn query_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Query {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a serialization error with context
    pub fn serialization<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Serialization {
            context: context.into(),
            source: Box::new(error),
        }
    }
}
