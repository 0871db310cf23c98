use pantry_core::types::DocId;
use pantry_db::StoreError;

/// Error returned by cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The repository call failed; local state was left as it was.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The id is not in the local list.
    #[error("No {entity} with id {id} in the local list")]
    UnknownItem { entity: &'static str, id: DocId },
}
