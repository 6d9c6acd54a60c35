//! Chat responder: answers questions about the inventory and keeps history.

use std::sync::Arc;

use assetdesk_storage::{
    now_rfc3339, ConversationRecord, InventoryStore, ResourceField, ResourceQuery, StorageError,
};
use serde::Serialize;
use thiserror::Error;

use crate::caller::Caller;
use crate::gateway::{CompletionGateway, GatewayError};

/// Records included in the context sample.
pub const CONTEXT_SAMPLE_SIZE: usize = 5;

/// History page size when the caller does not ask for one.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Sent in place of the context summary when the store cannot produce one.
pub const NO_CONTEXT: &str = "No resource context available";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Access denied")]
    Forbidden,
    #[error("Message is required")]
    EmptyQuestion,
    #[error("Failed to get response")]
    Gateway(#[source] GatewayError),
    #[error(transparent)]
    Store(#[from] StorageError),
}

impl ChatError {
    pub fn status_code(&self) -> u16 {
        match self {
            ChatError::Unauthenticated => 401,
            ChatError::Forbidden => 403,
            ChatError::EmptyQuestion => 400,
            ChatError::Gateway(_) | ChatError::Store(_) => 500,
        }
    }
}

/// A model answer, already persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatAnswer {
    pub response: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
struct ResourceContext {
    total_resources: u64,
    locations: Vec<String>,
    departments: Vec<String>,
    sample_resources: Vec<ContextSample>,
}

#[derive(Debug, Serialize)]
struct ContextSample {
    description: String,
    location: String,
    department: String,
    cost: f64,
}

/// Read-only question answering over the inventory.
pub struct ChatResponder {
    store: Arc<dyn InventoryStore>,
    gateway: Arc<dyn CompletionGateway>,
}

impl ChatResponder {
    pub fn new(store: Arc<dyn InventoryStore>, gateway: Arc<dyn CompletionGateway>) -> Self {
        Self { store, gateway }
    }

    /// Answer `question` for `caller` and record the exchange.
    pub async fn answer(
        &self,
        question: &str,
        caller: Option<&Caller>,
    ) -> Result<ChatAnswer, ChatError> {
        let caller = caller.ok_or(ChatError::Unauthenticated)?;
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyQuestion);
        }

        let context = self.context_summary().await;
        let prompt = build_chat_prompt(&context, question);
        let response = self
            .gateway
            .complete(&prompt)
            .await
            .map_err(ChatError::Gateway)?;

        let timestamp = now_rfc3339();
        self.store
            .insert_conversation(ConversationRecord {
                user_id: caller.uid.clone(),
                question: question.to_string(),
                answer: response.clone(),
                timestamp: timestamp.clone(),
            })
            .await?;
        tracing::info!(user_id = %caller.uid, "chat answered");

        Ok(ChatAnswer {
            response,
            timestamp,
        })
    }

    /// Conversation history, newest first.
    ///
    /// `user_id` defaults to the caller. Only administrators may read another
    /// user's history. `page` starts at 1; a zero `limit` means the default.
    pub async fn history(
        &self,
        caller: Option<&Caller>,
        user_id: Option<&str>,
        page: usize,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, ChatError> {
        let caller = caller.ok_or(ChatError::Unauthenticated)?;
        let user_id = user_id
            .filter(|id| !id.is_empty())
            .unwrap_or(caller.uid.as_str());
        if !caller.is_admin() && user_id != caller.uid {
            return Err(ChatError::Forbidden);
        }

        let limit = if limit == 0 { DEFAULT_HISTORY_LIMIT } else { limit };
        let skip = page.saturating_sub(1).saturating_mul(limit);
        Ok(self.store.list_conversations(user_id, skip, limit).await?)
    }

    /// JSON summary of the inventory, or [`NO_CONTEXT`] if the store fails.
    pub async fn context_summary(&self) -> String {
        match self.build_context().await {
            Ok(context) => {
                serde_json::to_string_pretty(&context).unwrap_or_else(|_| NO_CONTEXT.to_string())
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not build chat context");
                NO_CONTEXT.to_string()
            }
        }
    }

    async fn build_context(&self) -> Result<ResourceContext, StorageError> {
        let all = ResourceQuery::all();
        let total_resources = self.store.count_resources(&all).await?;
        let sample = self.store.find_resources(&all, CONTEXT_SAMPLE_SIZE).await?;
        let locations = self.store.distinct_values(ResourceField::Location).await?;
        let departments = self.store.distinct_values(ResourceField::Department).await?;

        Ok(ResourceContext {
            total_resources,
            locations,
            departments,
            sample_resources: sample
                .into_iter()
                .map(|r| ContextSample {
                    description: r.description,
                    location: r.location,
                    department: r.department,
                    cost: r.cost,
                })
                .collect(),
        })
    }
}

fn build_chat_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a resource management assistant. Answer questions about the resources based on the following context:\n\
         \n\
         Context: {context}\n\
         \n\
         User question: {question}\n\
         \n\
         Provide a helpful and accurate response about the resources. If you need specific data that's not in the context, ask for clarification."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::Role;
    use assetdesk_storage::{MemoryStore, NewResource};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Gateway that pops canned completions and records every prompt.
    struct MockGateway {
        responses: Mutex<Vec<Result<String, GatewayError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockGateway {
        fn new(responses: Vec<Result<String, GatewayError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionGateway for MockGateway {
        async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let mut queue = self.responses.lock().unwrap();
            if queue.is_empty() {
                return Err(GatewayError::Transport("mock queue exhausted".to_string()));
            }
            queue.remove(0)
        }
    }

    /// Store whose every call fails.
    struct BrokenStore;

    #[async_trait]
    impl InventoryStore for BrokenStore {
        async fn insert_resource(
            &self,
            _resource: NewResource,
        ) -> Result<assetdesk_storage::ResourceId, StorageError> {
            Err(StorageError::Backend("down".to_string()))
        }
        async fn get_resource(
            &self,
            id: &assetdesk_storage::ResourceId,
        ) -> Result<assetdesk_storage::ResourceRecord, StorageError> {
            Err(StorageError::ResourceNotFound { id: id.to_string() })
        }
        async fn find_resources(
            &self,
            _query: &ResourceQuery,
            _limit: usize,
        ) -> Result<Vec<assetdesk_storage::ResourceRecord>, StorageError> {
            Err(StorageError::Backend("down".to_string()))
        }
        async fn count_resources(&self, _query: &ResourceQuery) -> Result<u64, StorageError> {
            Err(StorageError::Backend("down".to_string()))
        }
        async fn update_resources(
            &self,
            _query: &ResourceQuery,
            _patch: &assetdesk_storage::ResourcePatch,
        ) -> Result<assetdesk_storage::UpdateCounts, StorageError> {
            Err(StorageError::Backend("down".to_string()))
        }
        async fn delete_resources(&self, _query: &ResourceQuery) -> Result<u64, StorageError> {
            Err(StorageError::Backend("down".to_string()))
        }
        async fn distinct_values(
            &self,
            _field: ResourceField,
        ) -> Result<Vec<String>, StorageError> {
            Err(StorageError::Backend("down".to_string()))
        }
        async fn insert_conversation(
            &self,
            _record: ConversationRecord,
        ) -> Result<(), StorageError> {
            Err(StorageError::Backend("down".to_string()))
        }
        async fn list_conversations(
            &self,
            _user_id: &str,
            _skip: usize,
            _limit: usize,
        ) -> Result<Vec<ConversationRecord>, StorageError> {
            Err(StorageError::Backend("down".to_string()))
        }
    }

    fn caller(uid: &str, role: Role) -> Caller {
        Caller {
            uid: uid.to_string(),
            email: format!("{}@example.com", uid),
            role,
        }
    }

    fn resource(description: &str, location: &str, department: &str) -> NewResource {
        NewResource {
            sl_no: "1".to_string(),
            description: description.to_string(),
            service_tag: "ST".to_string(),
            identification_number: "ID".to_string(),
            procurement_date: "2024-01-01".to_string(),
            cost: 100.0,
            location: location.to_string(),
            department: department.to_string(),
            created_by: "seed".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn answer_is_persisted_for_caller() {
        let store = Arc::new(MemoryStore::with_resources(vec![
            resource("Monitor", "Lab 1", "CSE"),
            resource("Printer", "Office", "EEE"),
        ]));
        let gateway = Arc::new(MockGateway::new(vec![Ok("There are 2 resources.".to_string())]));
        let chat = ChatResponder::new(store.clone(), gateway.clone());

        let answer = chat
            .answer("how many resources?", Some(&caller("u1", Role::Viewer)))
            .await
            .unwrap();
        assert_eq!(answer.response, "There are 2 resources.");

        let history = store.list_conversations("u1", 0, 0).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "how many resources?");
        assert_eq!(history[0].answer, "There are 2 resources.");

        let prompts = gateway.prompts.lock().unwrap();
        assert!(prompts[0].contains("\"total_resources\": 2"));
        assert!(prompts[0].contains("\"Lab 1\""));
        assert!(prompts[0].contains("User question: how many resources?"));
    }

    #[tokio::test]
    async fn gateway_failure_is_reported_and_not_persisted() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::new(vec![Err(GatewayError::Status(503))]));
        let chat = ChatResponder::new(store.clone(), gateway);

        let err = chat
            .answer("anything?", Some(&caller("u1", Role::Admin)))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(store.list_conversations("u1", 0, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_caller_is_unauthenticated() {
        let chat = ChatResponder::new(Arc::new(MemoryStore::new()), Arc::new(MockGateway::new(vec![])));
        let err = chat.answer("hi", None).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn context_falls_back_when_store_fails() {
        let chat = ChatResponder::new(Arc::new(BrokenStore), Arc::new(MockGateway::new(vec![])));
        assert_eq!(chat.context_summary().await, NO_CONTEXT);
    }

    #[tokio::test]
    async fn context_sample_is_bounded() {
        let resources = (0..8).map(|i| resource(&format!("Item {}", i), "Lab", "CSE")).collect();
        let chat = ChatResponder::new(
            Arc::new(MemoryStore::with_resources(resources)),
            Arc::new(MockGateway::new(vec![])),
        );
        let summary: serde_json::Value =
            serde_json::from_str(&chat.context_summary().await).unwrap();
        assert_eq!(summary["total_resources"], 8);
        assert_eq!(summary["sample_resources"].as_array().unwrap().len(), CONTEXT_SAMPLE_SIZE);
        assert_eq!(summary["departments"], serde_json::json!(["CSE"]));
    }

    #[tokio::test]
    async fn history_is_scoped_by_role() {
        let store = Arc::new(MemoryStore::new());
        for (i, user) in ["u1", "u2", "u1"].iter().enumerate() {
            store
                .insert_conversation(ConversationRecord {
                    user_id: user.to_string(),
                    question: format!("q{}", i),
                    answer: "a".to_string(),
                    timestamp: format!("2025-01-01T00:00:0{}Z", i),
                })
                .await
                .unwrap();
        }
        let chat = ChatResponder::new(store, Arc::new(MockGateway::new(vec![])));

        let own = chat
            .history(Some(&caller("u1", Role::Viewer)), None, 1, 0)
            .await
            .unwrap();
        let questions: Vec<&str> = own.iter().map(|c| c.question.as_str()).collect();
        assert_eq!(questions, ["q2", "q0"]);

        let denied = chat
            .history(Some(&caller("u1", Role::Viewer)), Some("u2"), 1, 0)
            .await
            .unwrap_err();
        assert_eq!(denied.status_code(), 403);

        let as_admin = chat
            .history(Some(&caller("boss", Role::Admin)), Some("u2"), 1, 0)
            .await
            .unwrap();
        assert_eq!(as_admin.len(), 1);

        let second_page = chat
            .history(Some(&caller("u1", Role::Viewer)), None, 2, 1)
            .await
            .unwrap();
        assert_eq!(second_page[0].question, "q0");
    }
}
