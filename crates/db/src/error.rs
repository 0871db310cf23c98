use pantry_core::error::CoreError;
use pantry_core::types::{DocId, Timestamp};

/// Failure of a document store operation.
///
/// Callers that only need "the write failed" can treat every variant alike;
/// `NotFound` and `Conflict` are split out for those that want to react.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: DocId },

    #[error("Write conflict on {collection}/{id}: expected update time {expected}, found {actual}")]
    Conflict {
        collection: String,
        id: DocId,
        expected: Timestamp,
        actual: Timestamp,
    },

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience alias for store and repository results.
pub type StoreResult<T> = Result<T, StoreError>;
