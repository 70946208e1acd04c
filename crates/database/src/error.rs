//! Database error types.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Client input is missing or malformed (missing shop id, or missing
    /// fields required to create a new store).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Record not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A payload value does not match the declared type of a field, or the
    /// field is not part of the schema.
    #[error("schema violation on `{field}`: {reason}")]
    SchemaViolation { field: String, reason: String },

    /// SQLx error (connection, pool timeout, rejected write, etc.)
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DatabaseError {
    pub(crate) fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DatabaseError::SchemaViolation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
