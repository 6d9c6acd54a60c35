//! Natural-language CRUD engine for the asset inventory.
//!
//! An instruction travels through the [`CompletionGateway`], the instruction
//! parser (with a keyword fallback), the [`validate`] step, and finally the
//! [`CrudExecutor`]. [`NaturalCrud`] composes these and returns an
//! [`Outcome`]; [`ChatResponder`] answers read-only questions alongside.

pub mod caller;
pub mod chat;
pub mod executor;
pub mod extract;
pub mod fields;
pub mod gateway;
pub mod heuristic;
pub mod intent;
pub mod parser;
pub mod service;
pub mod validator;

pub use caller::{Caller, Role};
pub use chat::{ChatAnswer, ChatError, ChatResponder};
pub use executor::{CrudExecutor, Execution, ExecutionError, ExecutionPayload};
pub use extract::{extract_json_object, ExtractError};
pub use gateway::{
    CompletionGateway, GatewayConfig, GatewayError, OfflineGateway, OpenAiCompatibleGateway,
};
pub use intent::{Operation, OperationIntent};
pub use parser::{parse_instruction, parse_with_source, FallbackReason, IntentSource};
pub use service::{NaturalCrud, Outcome};
pub use validator::{validate, Rejection, Selection, ValidatedIntent, Verdict};
