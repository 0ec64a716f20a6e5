//! Error types for the sorrel crate.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SorrelError>;

/// Errors surfaced by host-facing surfaces: schema construction, query
/// parsing, and document ingestion.
///
/// Errors discovered *during* query evaluation travel on the sticky error
/// string of [`crate::search::SearchResult`] instead, so that a deep
/// evaluator never unwinds past the public boundary.
#[derive(Debug, Error)]
pub enum SorrelError {
    /// An argument failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A schema or index configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A named entity (field, parameter, document) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A query string failed to parse.
    #[error("query parse error: {0}")]
    Parse(String),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SorrelError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        SorrelError::InvalidArgument(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        SorrelError::InvalidConfig(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        SorrelError::NotFound(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        SorrelError::Parse(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        SorrelError::Internal(msg.into())
    }
}
