//! Locating a JSON object inside free-form model output.
//!
//! Models wrap their answer in prose or markdown fences often enough that the
//! raw completion cannot be decoded directly. [`extract_json_object`] returns
//! the first balanced `{ ... }` span. It does not validate the interior; a
//! malformed object surfaces later as a decode error.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The text contains no `{`.
    #[error("no JSON object in completion")]
    NoObject,
    /// An object opens but never closes.
    #[error("unbalanced JSON object in completion")]
    Unbalanced,
}

/// Return the span from the first `{` to its matching `}`.
///
/// Braces inside string literals (including escaped quotes) are ignored.
/// When several objects are present, the first complete one wins and any
/// trailing text is discarded.
pub fn extract_json_object(text: &str) -> Result<&str, ExtractError> {
    let start = text.find('{').ok_or(ExtractError::NoObject)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Ok(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    Err(ExtractError::Unbalanced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_object_is_returned_whole() {
        let text = r#"{"operation": "READ"}"#;
        assert_eq!(extract_json_object(text), Ok(text));
    }

    #[test]
    fn prose_and_fences_are_stripped() {
        let text = "Sure! Here is the JSON:\n```json\n{\"operation\": \"DELETE\"}\n```\nLet me know.";
        assert_eq!(
            extract_json_object(text),
            Ok("{\"operation\": \"DELETE\"}")
        );
    }

    #[test]
    fn nested_objects_close_at_outer_brace() {
        let text = r#"x {"fields": {"cost": "1000"}, "filters": {}} y"#;
        assert_eq!(
            extract_json_object(text),
            Ok(r#"{"fields": {"cost": "1000"}, "filters": {}}"#)
        );
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let text = r#"{"description": "bracket } and { inside", "a": "\"}"} tail"#;
        assert_eq!(
            extract_json_object(text),
            Ok(r#"{"description": "bracket } and { inside", "a": "\"}"}"#)
        );
    }

    #[test]
    fn first_of_several_objects_wins() {
        let text = r#"{"operation": "READ"} or maybe {"operation": "DELETE"}"#;
        assert_eq!(extract_json_object(text), Ok(r#"{"operation": "READ"}"#));
    }

    #[test]
    fn missing_object_is_reported() {
        assert_eq!(
            extract_json_object("I cannot help with that."),
            Err(ExtractError::NoObject)
        );
        assert_eq!(extract_json_object(""), Err(ExtractError::NoObject));
    }

    #[test]
    fn truncated_object_is_unbalanced() {
        assert_eq!(
            extract_json_object(r#"{"operation": "UPDATE", "fields": {"cost": 5}"#),
            Err(ExtractError::Unbalanced)
        );
        assert_eq!(
            extract_json_object(r#"{"description": "never closed }"#),
            Err(ExtractError::Unbalanced)
        );
    }

    #[test]
    fn multibyte_text_keeps_char_boundaries() {
        let text = "résumé → {\"location\": \"Café\"} ✓";
        assert_eq!(extract_json_object(text), Ok("{\"location\": \"Café\"}"));
    }
}
