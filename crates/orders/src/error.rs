//! Error types for order retrieval
//!
//! Every failure a retrieval can report falls into one of three classes:
//! configuration (rejected before any query runs), storage (the database
//! collaborator failed, including rows that cannot be decoded) and timeout.

use thiserror::Error;

/// Result type alias for retrieval operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for order retrieval
#[derive(Debug, Clone, Error)]
pub enum OrmError {
    /// Incompatible strategy/pagination combination or invalid settings
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Query execution failed in the storage collaborator
    #[error("Database error: {0}")]
    Database(String),
    /// A projected column is missing from a returned row
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),
    /// A column value could not be decoded into the expected type
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A flat projection returned more rows than the configured ceiling
    #[error("Flat projection exceeded the row ceiling of {ceiling} rows")]
    RowCeilingExceeded { ceiling: usize },
    /// The caller's deadline passed or the caller cancelled the retrieval
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl OrmError {
    /// Rejected before any query was issued
    pub fn is_configuration(&self) -> bool {
        matches!(self, OrmError::Configuration(_))
    }

    /// Raised by (or while reading from) the storage collaborator
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            OrmError::Database(_)
                | OrmError::ColumnNotFound(_)
                | OrmError::Serialization(_)
                | OrmError::RowCeilingExceeded { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, OrmError::Timeout(_))
    }
}

impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        OrmError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Serialization(err.to_string())
    }
}

impl From<crate::config::ConfigError> for OrmError {
    fn from(err: crate::config::ConfigError) -> Self {
        OrmError::Configuration(err.to_string())
    }
}
