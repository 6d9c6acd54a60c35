//! Operation intents and their strict decoding from model output.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The four operations an instruction can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    /// Case-insensitive parse of an operation name.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CREATE" => Some(Operation::Create),
            "READ" => Some(Operation::Read),
            "UPDATE" => Some(Operation::Update),
            "DELETE" => Some(Operation::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Read => "READ",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }

    pub fn is_mutation(self) -> bool {
        matches!(self, Operation::Update | Operation::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured reading of one instruction, before validation.
///
/// Field and filter values are kept as raw JSON; the validator resolves names
/// and the executor coerces values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationIntent {
    pub operation: Operation,
    pub fields: BTreeMap<String, Value>,
    pub filters: BTreeMap<String, Value>,
    pub missing_fields: Vec<String>,
    pub resource_id: Option<String>,
}

impl OperationIntent {
    /// An intent with no fields, filters, or identifier.
    pub fn empty(operation: Operation) -> Self {
        OperationIntent {
            operation,
            fields: BTreeMap::new(),
            filters: BTreeMap::new(),
            missing_fields: Vec::new(),
            resource_id: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("completion is not an intent object: {0}")]
    Json(#[from] serde_json::Error),
    #[error("completion is not a JSON object")]
    NotObject,
    #[error("unrecognised operation '{0}'")]
    UnknownOperation(String),
}

/// Wire shape the model is asked to produce.
///
/// Everything but `operation` may be absent or null.
#[derive(Debug, Deserialize)]
struct RawIntent {
    operation: String,
    #[serde(default)]
    fields: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    filters: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    missing_fields: Option<Vec<String>>,
    #[serde(default)]
    resource_id: Option<String>,
}

/// Decode a JSON object into an [`OperationIntent`].
///
/// Fails when the text is not an object of the expected shape or the
/// operation is not one of the four kinds.
pub fn decode_intent(json: &str) -> Result<OperationIntent, DecodeError> {
    let value: Value = serde_json::from_str(json)?;
    if !value.is_object() {
        return Err(DecodeError::NotObject);
    }
    let raw: RawIntent = serde_json::from_value(value)?;
    let operation =
        Operation::parse(&raw.operation).ok_or(DecodeError::UnknownOperation(raw.operation))?;

    let mut missing_fields: Vec<String> = Vec::new();
    for name in raw.missing_fields.unwrap_or_default() {
        let name = name.trim().to_string();
        if !name.is_empty() && !missing_fields.contains(&name) {
            missing_fields.push(name);
        }
    }

    Ok(OperationIntent {
        operation,
        fields: raw.fields.unwrap_or_default(),
        filters: raw.filters.unwrap_or_default(),
        missing_fields,
        resource_id: raw.resource_id,
    })
}
