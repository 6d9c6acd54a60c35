/// All errors that can be returned by an InventoryStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No resource with the given identifier exists.
    #[error("resource not found: {id}")]
    ResourceNotFound { id: String },

    /// A backend-specific storage error (connectivity, serialization, write conflict).
    #[error("storage backend error: {0}")]
    Backend(String),
}
