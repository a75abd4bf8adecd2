//! Error types for trino-eda.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for trino-eda operations.
#[derive(Error, Debug)]
pub enum EdaError {
    /// Engine connection errors (host unreachable, TLS failure, bad status, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Credentials rejected by the engine.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Query execution errors reported by the engine (syntax errors, missing tables, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration errors (missing credentials, invalid config file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EdaError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an authentication error with the given message.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
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
            Self::Auth(_) => "Authentication Error",
            Self::Query(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using EdaError.
pub type Result<T> = std::result::Result<T, EdaError>;
