//! Deterministic keyword fallback used when the model is unavailable or its
//! output cannot be decoded.
//!
//! Extraction quality differs per operation: CREATE always asks for every
//! required field, UPDATE picks up a cost figure and a department
//! abbreviation, DELETE extracts nothing, and anything else is an empty READ.

use serde_json::Value;

use crate::fields::required_field_names;
use crate::intent::{Operation, OperationIntent};

const CREATE_WORDS: &[&str] = &["create", "add", "new"];
const UPDATE_WORDS: &[&str] = &["update", "change", "modify", "edit"];
const DELETE_WORDS: &[&str] = &["delete", "remove"];

/// Department abbreviations recognised in UPDATE instructions.
pub const DEPARTMENT_CODES: &[&str] = &["CSE", "ECE", "EEE"];

/// Split on anything that is not alphanumeric.
fn tokens(instruction: &str) -> Vec<&str> {
    instruction
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Operation keywords match anywhere in the lower-cased text, so inflected
/// forms ("updated", "deleted") count.
fn mentions(lowered: &str, words: &[&str]) -> bool {
    words.iter().any(|w| lowered.contains(w))
}

/// Classify an instruction by keyword. Pure and total.
pub fn heuristic_intent(instruction: &str) -> OperationIntent {
    let lowered = instruction.to_lowercase();
    let tokens = tokens(instruction);

    if mentions(&lowered, CREATE_WORDS) {
        let mut intent = OperationIntent::empty(Operation::Create);
        intent.missing_fields = required_field_names();
        return intent;
    }

    if mentions(&lowered, UPDATE_WORDS) {
        let mut intent = OperationIntent::empty(Operation::Update);
        if let Some(amount) = tokens
            .iter()
            .find(|t| t.chars().all(|c| c.is_ascii_digit()))
        {
            intent
                .fields
                .insert("cost".to_string(), Value::String(amount.to_string()));
        }
        if let Some(code) = tokens.iter().find_map(|t| {
            DEPARTMENT_CODES
                .iter()
                .find(|code| t.eq_ignore_ascii_case(code))
        }) {
            intent
                .filters
                .insert("department".to_string(), Value::String(code.to_string()));
        }
        return intent;
    }

    if mentions(&lowered, DELETE_WORDS) {
        return OperationIntent::empty(Operation::Delete);
    }

    OperationIntent::empty(Operation::Read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_extracts_cost_and_department() {
        let intent = heuristic_intent("update cost to 1000 for CSE department");
        assert_eq!(intent.operation, Operation::Update);
        assert_eq!(intent.fields.len(), 1);
        assert_eq!(intent.fields["cost"], json!("1000"));
        assert_eq!(intent.filters.len(), 1);
        assert_eq!(intent.filters["department"], json!("CSE"));
        assert!(intent.missing_fields.is_empty());
    }

    #[test]
    fn create_demands_every_required_field() {
        let intent = heuristic_intent("create new monitor");
        assert_eq!(intent.operation, Operation::Create);
        assert!(intent.fields.is_empty());
        assert_eq!(intent.missing_fields, required_field_names());
    }

    #[test]
    fn create_outranks_update() {
        let intent = heuristic_intent("add a printer and update the ledger");
        assert_eq!(intent.operation, Operation::Create);
    }

    #[test]
    fn update_outranks_delete() {
        let intent = heuristic_intent("change or remove the old projector");
        assert_eq!(intent.operation, Operation::Update);
    }

    #[test]
    fn delete_extracts_nothing() {
        let intent = heuristic_intent("remove all ECE equipment worth 500");
        assert_eq!(intent, OperationIntent::empty(Operation::Delete));
    }

    #[test]
    fn unmatched_instruction_is_empty_read() {
        let intent = heuristic_intent("show me the monitors in lab 2");
        assert_eq!(intent, OperationIntent::empty(Operation::Read));
    }

    #[test]
    fn keywords_match_inside_words() {
        assert_eq!(
            heuristic_intent("Updated cost to 500 for CSE"),
            heuristic_intent("update cost to 500 for CSE")
        );
        assert_eq!(heuristic_intent("deleted items of ECE").operation, Operation::Delete);
        assert_eq!(heuristic_intent("adding a monitor").operation, Operation::Create);

        let intent = heuristic_intent("changes cost to 9 for EEE");
        assert_eq!(intent.operation, Operation::Update);
        assert_eq!(intent.fields["cost"], json!("9"));
        assert_eq!(intent.filters["department"], json!("EEE"));

        // "address" contains "add"
        let intent = heuristic_intent("list the address of the office");
        assert_eq!(intent.operation, Operation::Create);
    }

    #[test]
    fn department_code_is_upper_cased() {
        let intent = heuristic_intent("Modify price to 250 for ece");
        assert_eq!(intent.filters["department"], json!("ECE"));
        assert_eq!(intent.fields["cost"], json!("250"));
    }

    #[test]
    fn first_department_code_in_text_wins() {
        let intent = heuristic_intent("edit EEE then CSE items");
        assert_eq!(intent.filters["department"], json!("EEE"));
    }

    #[test]
    fn update_without_numbers_or_codes_has_empty_maps() {
        let intent = heuristic_intent("update the lab 3 chairs");
        // "3" is an all-digit token
        assert_eq!(intent.fields["cost"], json!("3"));
        assert!(intent.filters.is_empty());

        let intent = heuristic_intent("update everything");
        assert!(intent.fields.is_empty());
        assert!(intent.filters.is_empty());
    }

    #[test]
    fn same_input_same_intent() {
        let text = "Update cost to 75 for EEE";
        assert_eq!(heuristic_intent(text), heuristic_intent(text));
    }
}
