use crate::record::SearchId;

/// All errors that can be returned by a SearchStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No search record with the given id -- readings can only be attached
    /// to a search that already exists.
    #[error("search not found: {id}")]
    SearchNotFound { id: SearchId },

    /// A backend-specific storage error (DB connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
