//! `NaturalCrud`: the composed instruction pipeline.
//!
//! prompt → gateway → parser → validator → executor. Every failure is turned
//! into an [`Outcome`] at this boundary; nothing escapes as an error.

use std::sync::Arc;

use assetdesk_storage::InventoryStore;

use crate::caller::Caller;
use crate::executor::{CrudExecutor, ExecutionPayload};
use crate::gateway::CompletionGateway;
use crate::intent::{Operation, OperationIntent};
use crate::parser::{build_parsing_prompt, parse_with_source, IntentSource};
use crate::validator::{validate, Verdict};

/// Result of one natural-language instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The operation ran.
    Executed {
        message: String,
        status: u16,
        data: ExecutionPayload,
    },
    /// Nothing ran; the caller must supply these fields.
    NeedsClarification {
        missing_fields: Vec<String>,
        message: String,
    },
    /// Nothing ran, or the store refused.
    Failed { status: u16, error: String },
}

impl Outcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Executed { status, .. } | Outcome::Failed { status, .. } => *status,
            Outcome::NeedsClarification { .. } => 400,
        }
    }

    fn failed(status: u16, error: impl Into<String>) -> Self {
        Outcome::Failed {
            status,
            error: error.into(),
        }
    }
}

/// Clarification message listing the fields to supply.
pub fn clarification_message(missing_fields: &[String]) -> String {
    format!(
        "Please provide the following fields: {}",
        missing_fields.join(", ")
    )
}

/// Translates and executes natural-language instructions.
///
/// Restricted to administrators. Collaborators are injected; the service
/// keeps no state between instructions.
pub struct NaturalCrud {
    gateway: Arc<dyn CompletionGateway>,
    executor: CrudExecutor,
}

impl NaturalCrud {
    pub fn new(store: Arc<dyn InventoryStore>, gateway: Arc<dyn CompletionGateway>) -> Self {
        Self {
            gateway,
            executor: CrudExecutor::new(store),
        }
    }

    /// Ask the model for an intent and parse whatever comes back.
    pub async fn interpret(&self, instruction: &str) -> (OperationIntent, IntentSource) {
        let prompt = build_parsing_prompt(instruction);
        let completion = self.gateway.complete(&prompt).await.ok();
        parse_with_source(instruction, completion.as_deref())
    }

    /// Run one instruction on behalf of `caller`.
    pub async fn natural_crud(&self, instruction: &str, caller: Option<&Caller>) -> Outcome {
        let Some(caller) = caller else {
            return Outcome::failed(401, "Authentication required");
        };
        if !caller.is_admin() {
            return Outcome::failed(403, "Admin access required");
        }
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Outcome::failed(400, "Instruction is required");
        }

        let (intent, source) = self.interpret(instruction).await;
        tracing::debug!(operation = %intent.operation, source = %source, "instruction parsed");
        if let Some(op) = source.unknown_operation() {
            return Outcome::failed(400, format!("Unknown operation: {}", op));
        }

        let validated = match validate(intent) {
            Verdict::Valid(validated) => validated,
            Verdict::ClarificationNeeded(missing_fields) => {
                let message = clarification_message(&missing_fields);
                return Outcome::NeedsClarification {
                    missing_fields,
                    message,
                };
            }
            Verdict::Rejected(rejection) => {
                tracing::info!(reason = %rejection, "instruction rejected");
                return Outcome::failed(400, rejection.to_string());
            }
        };

        let operation = validated.operation();
        match self.executor.execute(validated, caller).await {
            Ok(execution) => Outcome::Executed {
                message: execution.message,
                status: if operation == Operation::Create { 201 } else { 200 },
                data: execution.payload,
            },
            Err(e) => Outcome::failed(e.status_code(), e.to_string()),
        }
    }
}
