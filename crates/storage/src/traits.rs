use async_trait::async_trait;

use crate::error::StorageError;
use crate::query::{ResourceField, ResourcePatch, ResourceQuery, UpdateCounts};
use crate::record::{ConversationRecord, NewResource, ResourceId, ResourceRecord};

/// The storage trait for inventory backends.
///
/// An `InventoryStore` is a document store keyed on resources and
/// conversation records, exposing predicate-based find/count/update/delete
/// primitives.
///
/// ## Atomicity
///
/// `update_resources` and `delete_resources` are atomic per record only.
/// Concurrent bulk mutations with overlapping queries may interleave; the
/// last write to a record wins.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be shared behind an
/// `Arc` in axum application state and across async task boundaries.
#[async_trait]
pub trait InventoryStore: Send + Sync + 'static {
    // ── Resources ────────────────────────────────────────────────────────────

    /// Insert a resource and return its newly assigned identifier.
    async fn insert_resource(&self, resource: NewResource) -> Result<ResourceId, StorageError>;

    /// Read a single resource.
    ///
    /// Returns `Err(StorageError::ResourceNotFound)` if it does not exist.
    async fn get_resource(&self, id: &ResourceId) -> Result<ResourceRecord, StorageError>;

    /// Find resources matching `query`, in insertion order.
    ///
    /// - `limit`: maximum number of results (0 = no limit)
    async fn find_resources(
        &self,
        query: &ResourceQuery,
        limit: usize,
    ) -> Result<Vec<ResourceRecord>, StorageError>;

    /// Count resources matching `query`.
    async fn count_resources(&self, query: &ResourceQuery) -> Result<u64, StorageError>;

    /// Apply `patch` to every resource matching `query`.
    ///
    /// `modified` counts only records whose stored values changed.
    async fn update_resources(
        &self,
        query: &ResourceQuery,
        patch: &ResourcePatch,
    ) -> Result<UpdateCounts, StorageError>;

    /// Delete every resource matching `query`. Returns the number deleted.
    async fn delete_resources(&self, query: &ResourceQuery) -> Result<u64, StorageError>;

    /// Sorted distinct values of one field across all resources.
    async fn distinct_values(&self, field: ResourceField) -> Result<Vec<String>, StorageError>;

    // ── Conversations ────────────────────────────────────────────────────────

    /// Append a conversation record.
    async fn insert_conversation(&self, record: ConversationRecord) -> Result<(), StorageError>;

    /// List a user's conversation records, newest first.
    ///
    /// - `skip`: number of records to skip
    /// - `limit`: maximum number of results (0 = no limit)
    async fn list_conversations(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, StorageError>;
}
