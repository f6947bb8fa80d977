use thiserror::Error;

use crate::{SagaId, Sequence};

/// Errors that can occur when reading or writing the journal.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Another writer appended to the saga stream first.
    #[error("Sequence conflict for saga {saga_id}: expected {expected}, found {actual}")]
    SequenceConflict {
        saga_id: SagaId,
        expected: Sequence,
        actual: Sequence,
    },

    /// The batch handed to `append` is not a valid contiguous run.
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for journal operations.
pub type Result<T> = std::result::Result<T, JournalError>;
