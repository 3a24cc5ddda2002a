//! Error types for the query service.
//!
//! Defines the main error enum used throughout the pipeline.

use thiserror::Error;

/// Main error type for query service operations.
#[derive(Error, Debug)]
pub enum NlqError {
    /// Database connection errors (host unreachable, auth failed, pool exhausted, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Metadata and health-check query errors (schema introspection, health checks).
    #[error("Query error: {0}")]
    Query(String),

    /// Generated SQL failed to execute. Carries the statement that was attempted.
    #[error("Execution error: {message}")]
    Execution { sql: String, message: String },

    /// LLM API errors (missing client, rate limits, timeouts, empty output, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, task failures, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NlqError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an execution error for the given SQL statement.
    pub fn execution(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Execution { .. } => "Execution Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the underlying message without the category prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::Connection(msg)
            | Self::Query(msg)
            | Self::Llm(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg,
            Self::Execution { message, .. } => message,
        }
    }

    /// Returns the attempted SQL, if this error carries one.
    pub fn attempted_sql(&self) -> Option<&str> {
        match self {
            Self::Execution { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

/// Result type alias using NlqError.
pub type Result<T> = std::result::Result<T, NlqError>;
