//! JSON-Safety Guard — extracts a balanced JSON value from free-text model output.
//!
//! Model output is not guaranteed to be pure JSON even when explicitly requested:
//! it may include code fences, prose preambles, or a truncated tail. Every
//! model-derived structure in Herald passes through `parse_model_json` before it
//! touches typed internal structs.

use serde_json::Value;
use thiserror::Error;

/// How much of the offending text to include in error messages.
const PREVIEW_LEN: usize = 120;

#[derive(Debug, Error)]
pub enum JsonGuardError {
    #[error("model output is empty")]
    Empty,

    #[error("no JSON object or array found in model output: {preview}")]
    NoJson { preview: String },

    #[error("unbalanced JSON in model output: {preview}")]
    Unbalanced { preview: String },

    #[error("JSON parse failed ({source}): {preview}")]
    Parse {
        source: serde_json::Error,
        preview: String,
    },
}

/// Parses the first balanced JSON object or array out of raw model text.
///
/// Steps: strip code fences → locate the first `{`/`[` → escape-aware,
/// string-literal-aware balance scan → `serde_json` parse of the balanced slice.
pub fn parse_model_json(raw: &str) -> Result<Value, JsonGuardError> {
    let text = strip_code_fences(raw).trim();
    if text.is_empty() {
        return Err(JsonGuardError::Empty);
    }

    let start = text
        .char_indices()
        .find(|(_, c)| *c == '{' || *c == '[')
        .map(|(i, _)| i)
        .ok_or_else(|| JsonGuardError::NoJson {
            preview: preview(text),
        })?;

    let candidate = &text[start..];
    let end = balanced_end(candidate).ok_or_else(|| JsonGuardError::Unbalanced {
        preview: preview(candidate),
    })?;

    let slice = &candidate[..end];
    serde_json::from_str(slice).map_err(|source| JsonGuardError::Parse {
        source,
        preview: preview(slice),
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Returns the byte offset just past the close of the first balanced
/// object/array, or `None` if the brackets never balance.
fn balanced_end(text: &str) -> Option<usize> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' | '[' => stack.push(c),
            '}' | ']' => {
                let open = stack.pop()?;
                let matches = (open == '{' && c == '}') || (open == '[' && c == ']');
                if !matches {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

fn preview(text: &str) -> String {
    if text.len() <= PREVIEW_LEN {
        text.to_string()
    } else {
        let cut = text
            .char_indices()
            .take_while(|(i, _)| *i < PREVIEW_LEN)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}…", &text[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_object() {
        let value = parse_model_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_strips_json_fences() {
        let value = parse_model_json("```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_skips_prose_preamble() {
        let value = parse_model_json("Here is the result you asked for:\n{\"ok\": true}").unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_ignores_trailing_prose_after_object() {
        let value = parse_model_json("{\"ok\": true}\nHope that helps!").unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_rejects_unbalanced_object() {
        let err = parse_model_json(r#"{"a": 1"#).unwrap_err();
        assert!(matches!(err, JsonGuardError::Unbalanced { .. }), "{err}");
    }

    #[test]
    fn test_rejects_mismatched_brackets() {
        let err = parse_model_json(r#"{"a": [1, 2}"#).unwrap_err();
        assert!(matches!(err, JsonGuardError::Unbalanced { .. }));
    }

    #[test]
    fn test_rejects_empty_input() {
        assert!(matches!(parse_model_json("   "), Err(JsonGuardError::Empty)));
        assert!(matches!(
            parse_model_json("```\n\n```"),
            Err(JsonGuardError::Empty)
        ));
    }

    #[test]
    fn test_rejects_text_with_no_json() {
        let err = parse_model_json("I cannot answer that.").unwrap_err();
        assert!(matches!(err, JsonGuardError::NoJson { .. }));
    }

    #[test]
    fn test_braces_inside_strings_do_not_affect_balance() {
        let value = parse_model_json(r#"{"text": "a } inside a string {"}"#).unwrap();
        assert_eq!(value["text"], "a } inside a string {");
    }

    #[test]
    fn test_escaped_quotes_inside_strings() {
        let value = parse_model_json(r#"{"text": "she said \"hi\" {"}"#).unwrap();
        assert_eq!(value["text"], "she said \"hi\" {");
    }

    #[test]
    fn test_accepts_top_level_array() {
        let value = parse_model_json(r#"[{"a":1},{"a":2}]"#).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_error_preview_is_truncated() {
        let long = format!("{{\"a\": \"{}\"", "x".repeat(500));
        let err = parse_model_json(&long).unwrap_err();
        let msg = err.to_string();
        assert!(msg.len() < 300, "preview not truncated: {} chars", msg.len());
    }
}
