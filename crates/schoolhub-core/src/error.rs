//! # Error Type
//!
//! One error enum for every core operation. The HTTP layer maps each
//! variant to a status code; the message text is shown to clients as-is.

use thiserror::Error;

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors from SchoolHub core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced record does not exist.
    #[error("{entity} not found with {field} : '{value}'")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// Input failed a business rule (missing field, bad range, bad reference).
    #[error("{0}")]
    Validation(String),

    /// The change collides with existing data (duplicate key, record in use,
    /// state that no longer allows the transition).
    #[error("{0}")]
    Conflict(String),

    /// Credentials were rejected.
    #[error("{0}")]
    Unauthorized(String),

    /// The redb database failed.
    #[error("Storage error: {0}")]
    Storage(#[from] redb::Error),

    /// A stored record could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] postcard::Error),
}

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// `Entity not found with field : 'value'`.
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

macro_rules! storage_from {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for CoreError {
                fn from(err: $err) -> Self {
                    Self::Storage(redb::Error::from(err))
                }
            }
        )*
    };
}

storage_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Require a non-blank string field.
pub(crate) fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(format!("{field} is required")));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
