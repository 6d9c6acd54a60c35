//! In-memory `InventoryStore` backed by tokio locks.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::query::{record_value, ResourceField, ResourcePatch, ResourceQuery, UpdateCounts};
use crate::record::{ConversationRecord, NewResource, ResourceId, ResourceRecord};
use crate::traits::InventoryStore;

/// Reference store holding every record in process memory.
///
/// Resources are kept in insertion order. A patch is applied to a copy of
/// each record and swapped in only on success, so a failing patch never
/// leaves a record half-written.
#[derive(Default)]
pub struct MemoryStore {
    resources: RwLock<Vec<ResourceRecord>>,
    conversations: RwLock<Vec<ConversationRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with resources (e.g. from a seed file).
    pub fn with_resources(resources: Vec<NewResource>) -> Self {
        let records = resources
            .into_iter()
            .map(|new| ResourceRecord::from_new(ResourceId::generate(), new))
            .collect();
        MemoryStore {
            resources: RwLock::new(records),
            conversations: RwLock::new(Vec::new()),
        }
    }
}

fn take_limit<T>(items: impl Iterator<Item = T>, limit: usize) -> Vec<T> {
    if limit == 0 {
        items.collect()
    } else {
        items.take(limit).collect()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn insert_resource(&self, resource: NewResource) -> Result<ResourceId, StorageError> {
        let id = ResourceId::generate();
        let mut resources = self.resources.write().await;
        resources.push(ResourceRecord::from_new(id.clone(), resource));
        Ok(id)
    }

    async fn get_resource(&self, id: &ResourceId) -> Result<ResourceRecord, StorageError> {
        let resources = self.resources.read().await;
        resources
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| StorageError::ResourceNotFound { id: id.to_string() })
    }

    async fn find_resources(
        &self,
        query: &ResourceQuery,
        limit: usize,
    ) -> Result<Vec<ResourceRecord>, StorageError> {
        let resources = self.resources.read().await;
        let matching = resources.iter().filter(|r| query.matches(r)).cloned();
        Ok(take_limit(matching, limit))
    }

    async fn count_resources(&self, query: &ResourceQuery) -> Result<u64, StorageError> {
        let resources = self.resources.read().await;
        Ok(resources.iter().filter(|r| query.matches(r)).count() as u64)
    }

    async fn update_resources(
        &self,
        query: &ResourceQuery,
        patch: &ResourcePatch,
    ) -> Result<UpdateCounts, StorageError> {
        let mut resources = self.resources.write().await;
        let mut counts = UpdateCounts::default();
        for record in resources.iter_mut().filter(|r| query.matches(r)) {
            counts.matched += 1;
            let mut updated = record.clone();
            if patch.apply(&mut updated)? {
                *record = updated;
                counts.modified += 1;
            }
        }
        Ok(counts)
    }

    async fn delete_resources(&self, query: &ResourceQuery) -> Result<u64, StorageError> {
        let mut resources = self.resources.write().await;
        let before = resources.len();
        resources.retain(|r| !query.matches(r));
        Ok((before - resources.len()) as u64)
    }

    async fn distinct_values(&self, field: ResourceField) -> Result<Vec<String>, StorageError> {
        let resources = self.resources.read().await;
        let values: BTreeSet<String> = resources
            .iter()
            .map(|r| record_value(r, field).render())
            .collect();
        Ok(values.into_iter().collect())
    }

    async fn insert_conversation(&self, record: ConversationRecord) -> Result<(), StorageError> {
        self.conversations.write().await.push(record);
        Ok(())
    }

    async fn list_conversations(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, StorageError> {
        let conversations = self.conversations.read().await;
        let newest_first = conversations
            .iter()
            .rev()
            .filter(|c| c.user_id == user_id)
            .skip(skip)
            .cloned();
        Ok(take_limit(newest_first, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance::run_conformance_suite;

    #[tokio::test]
    async fn memory_store_passes_conformance() {
        let report = run_conformance_suite(|| async { MemoryStore::new() }).await;
        assert_eq!(report.failed, 0, "{report}");
        assert!(report.total > 0);
    }

    #[tokio::test]
    async fn seeded_store_assigns_ids() {
        let seed: Vec<NewResource> = serde_json::from_value(serde_json::json!([
            {
                "sl_no": "1", "description": "Laptop", "service_tag": "ST-1",
                "identification_number": "ID-1", "procurement_date": "2024-01-01",
                "cost": 55000, "location": "Lab 1", "department": "CSE"
            },
            {
                "sl_no": "2", "description": "Printer", "service_tag": "ST-2",
                "identification_number": "ID-2", "procurement_date": "2024-01-02",
                "cost": 12000, "location": "Office", "department": "EEE"
            }
        ]))
        .unwrap();
        let store = MemoryStore::with_resources(seed);
        let all = store.find_resources(&ResourceQuery::all(), 0).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_ne!(all[0].id, all[1].id);
        assert_eq!(all[0].description, "Laptop");
    }
}
