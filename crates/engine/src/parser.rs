//! Instruction parser: model completion first, keyword heuristic second.
//!
//! [`parse_instruction`] never fails. Whatever the completion looks like, the
//! caller gets an [`OperationIntent`]; the worst case is an empty READ. A
//! model answer naming an operation outside the four kinds is not guessed at:
//! the source says so and the caller rejects the instruction.

use std::fmt;

use crate::extract::{extract_json_object, ExtractError};
use crate::fields::required_field_names;
use crate::heuristic::heuristic_intent;
use crate::intent::{decode_intent, DecodeError, Operation, OperationIntent};

/// Where a parsed intent came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentSource {
    /// Decoded from the model's completion.
    Model,
    /// Produced by the keyword heuristic.
    Heuristic(FallbackReason),
    /// The model named an operation that does not exist. The intent is an
    /// empty READ placeholder and must not be executed.
    UnknownOperation(String),
}

impl IntentSource {
    /// The unrecognised operation name, if the model produced one.
    pub fn unknown_operation(&self) -> Option<&str> {
        match self {
            IntentSource::UnknownOperation(op) => Some(op),
            _ => None,
        }
    }
}

/// Why the heuristic ran instead of the model's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No completion was available.
    Unavailable,
    /// The completion held no usable object.
    Extract(ExtractError),
    /// The object did not decode as an intent.
    Decode(String),
}

impl fmt::Display for IntentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentSource::Model => f.write_str("model"),
            IntentSource::Heuristic(reason) => write!(f, "heuristic ({})", reason),
            IntentSource::UnknownOperation(op) => write!(f, "model (unknown operation '{}')", op),
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Unavailable => f.write_str("model unavailable"),
            FallbackReason::Extract(e) => write!(f, "{}", e),
            FallbackReason::Decode(msg) => f.write_str(msg),
        }
    }
}

/// Parse an instruction, preferring the model's completion when it decodes.
pub fn parse_instruction(instruction: &str, completion: Option<&str>) -> OperationIntent {
    parse_with_source(instruction, completion).0
}

/// Like [`parse_instruction`], also reporting which path produced the intent.
pub fn parse_with_source(
    instruction: &str,
    completion: Option<&str>,
) -> (OperationIntent, IntentSource) {
    let reason = match completion {
        None => FallbackReason::Unavailable,
        Some(text) => match decode_completion(text) {
            Ok(intent) => return (intent, IntentSource::Model),
            Err(Decoded::UnknownOperation(op)) => {
                tracing::warn!(operation = %op, "model produced an unknown operation");
                return (
                    OperationIntent::empty(Operation::Read),
                    IntentSource::UnknownOperation(op),
                );
            }
            Err(Decoded::Unusable(reason)) => reason,
        },
    };

    match &reason {
        FallbackReason::Unavailable => {
            tracing::debug!("no completion; using keyword heuristic");
        }
        other => {
            tracing::warn!(reason = %other, "model completion unusable; using keyword heuristic");
        }
    }
    (heuristic_intent(instruction), IntentSource::Heuristic(reason))
}

enum Decoded {
    UnknownOperation(String),
    Unusable(FallbackReason),
}

fn decode_completion(text: &str) -> Result<OperationIntent, Decoded> {
    let json = extract_json_object(text)
        .map_err(|e| Decoded::Unusable(FallbackReason::Extract(e)))?;
    decode_intent(json).map_err(|e| match e {
        DecodeError::UnknownOperation(op) => Decoded::UnknownOperation(op),
        other => Decoded::Unusable(FallbackReason::Decode(other.to_string())),
    })
}

// ── Prompt construction ──────────────────────────────────────────────────────

/// Build the user-role prompt asking the model to translate `instruction`.
pub fn build_parsing_prompt(instruction: &str) -> String {
    let quoted = serde_json::to_string(instruction).unwrap_or_else(|_| format!("\"{}\"", instruction));
    let required = required_field_names().join(", ");
    let create_missing = serde_json::to_string(&required_field_names()).unwrap_or_default();

    format!(
        r#"You are a database operation parser. Parse this natural language instruction for resource management:

Instruction: {quoted}

You must respond with ONLY a valid JSON object in this exact format:
{{
    "operation": "CREATE|READ|UPDATE|DELETE",
    "fields": {{}},
    "filters": {{}},
    "missing_fields": [],
    "resource_id": null
}}

Rules:
- operation: Must be CREATE, READ, UPDATE, or DELETE
- fields: Object with field names and values to set/create
- filters: Object with criteria to find resources
- missing_fields: Array of required fields that are missing
- resource_id: String ID if a specific resource is mentioned

Required fields for CREATE: {required}

Examples:
- "update cost to 1000 for CSE department" → {{"operation": "UPDATE", "fields": {{"cost": "1000"}}, "filters": {{"department": "CSE"}}, "missing_fields": [], "resource_id": null}}
- "create new monitor" → {{"operation": "CREATE", "fields": {{}}, "filters": {{}}, "missing_fields": {create_missing}, "resource_id": null}}

Parse: {quoted}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodable_completion_is_used() {
        let completion = r#"```json
{"operation": "READ", "fields": {}, "filters": {"location": "Lab 1"}, "missing_fields": [], "resource_id": null}
```"#;
        let (intent, source) = parse_with_source("delete everything", Some(completion));
        assert_eq!(source, IntentSource::Model);
        assert_eq!(intent.operation, Operation::Read);
        assert_eq!(intent.filters["location"], json!("Lab 1"));
    }

    #[test]
    fn missing_completion_falls_back() {
        let (intent, source) =
            parse_with_source("update cost to 1000 for CSE department", None);
        assert_eq!(source, IntentSource::Heuristic(FallbackReason::Unavailable));
        assert_eq!(intent.operation, Operation::Update);
        assert_eq!(intent.fields["cost"], json!("1000"));
    }

    #[test]
    fn prose_only_completion_falls_back() {
        let (intent, source) = parse_with_source("remove the broken chair", Some("I can't do that."));
        assert_eq!(
            source,
            IntentSource::Heuristic(FallbackReason::Extract(ExtractError::NoObject))
        );
        assert_eq!(intent.operation, Operation::Delete);
    }

    #[test]
    fn malformed_object_falls_back() {
        let (intent, source) =
            parse_with_source("create new monitor", Some(r#"{"operation": CREATE}"#));
        assert!(matches!(source, IntentSource::Heuristic(FallbackReason::Decode(_))));
        assert_eq!(intent.operation, Operation::Create);
        assert_eq!(intent.missing_fields.len(), 8);
    }

    #[test]
    fn unknown_operation_is_reported_not_guessed() {
        let (intent, source) = parse_with_source(
            "update cost to 5 for CSE",
            Some(r#"{"operation": "ARCHIVE", "filters": {"department": "CSE"}}"#),
        );
        assert_eq!(source, IntentSource::UnknownOperation("ARCHIVE".to_string()));
        assert_eq!(source.unknown_operation(), Some("ARCHIVE"));
        assert_eq!(intent, OperationIntent::empty(Operation::Read));
    }

    #[test]
    fn object_inside_array_is_used_bare_array_falls_back() {
        let (intent, source) = parse_with_source("remove item", Some(r#"[{"operation": "READ"}]"#));
        assert_eq!(source, IntentSource::Model);
        assert_eq!(intent.operation, Operation::Read);

        let (intent, source) = parse_with_source("remove item", Some(r#"["READ"] and then"#));
        assert!(matches!(source, IntentSource::Heuristic(FallbackReason::Extract(_))));
        assert_eq!(intent.operation, Operation::Delete);
    }

    #[test]
    fn fallback_is_deterministic() {
        let text = "modify cost to 42 for EEE";
        let first = parse_instruction(text, None);
        for _ in 0..5 {
            assert_eq!(parse_instruction(text, None), first);
            assert_eq!(parse_instruction(text, Some("not json")), first);
        }
    }

    #[test]
    fn prompt_quotes_instruction_and_lists_required_fields() {
        let prompt = build_parsing_prompt("add \"quoted\" monitor");
        assert!(prompt.contains(r#"Instruction: "add \"quoted\" monitor""#));
        assert!(prompt.contains(
            "Required fields for CREATE: sl_no, description, service_tag, identification_number, procurement_date, cost, location, department"
        ));
        assert!(prompt.contains(r#""missing_fields": ["sl_no","description""#));
    }
}
