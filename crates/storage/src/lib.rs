pub mod conformance;
mod error;
mod memory;
mod query;
mod record;
mod traits;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use query::{
    record_value, FieldValue, Filter, FilterField, Matcher, ResourceField, ResourcePatch,
    ResourceQuery, UpdateCounts,
};
pub use record::{
    now_rfc3339, ConversationRecord, MalformedId, NewResource, ResourceId, ResourceRecord,
};
pub use traits::InventoryStore;
