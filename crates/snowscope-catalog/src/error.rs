//! Operation-level errors

use crate::adapter::WarehouseError;

/// Errors surfaced by connection, catalog and stage operations
///
/// Every variant keeps the underlying cause as text; no error codes exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnowscopeError {
    /// Opening the session failed; the driver message is kept verbatim
    #[error("{0}")]
    ConnectionError(String),

    /// An enumeration query failed; the whole traversal is abandoned
    #[error("{context}: {message}")]
    CatalogError { context: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Retrieving staged file content failed
    #[error("{context}: {message}")]
    FetchError { context: String, message: String },

    #[error("IO error: {0}")]
    IoError(String),
}

impl SnowscopeError {
    pub fn catalog(context: impl Into<String>, cause: impl ToString) -> Self {
        Self::CatalogError {
            context: context.into(),
            message: cause.to_string(),
        }
    }

    pub fn fetch(context: impl Into<String>, cause: impl ToString) -> Self {
        Self::FetchError {
            context: context.into(),
            message: cause.to_string(),
        }
    }
}

impl From<WarehouseError> for SnowscopeError {
    fn from(e: WarehouseError) -> Self {
        Self::catalog("Warehouse query failed", e)
    }
}

pub type Result<T> = std::result::Result<T, SnowscopeError>;
