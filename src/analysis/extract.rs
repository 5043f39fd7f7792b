//! Best-effort recovery of JSON from free-text model answers.
//!
//! Two candidates are tried in order: a fenced code block labeled `json`,
//! then the first top-level `{...}` object anywhere in the text.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Result of structured extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// JSON recovered from the answer.
    Structured(Value),
    /// No parseable JSON; the original text.
    Unstructured(String),
}

impl Extracted {
    /// The parsed value, if any.
    pub fn structured(&self) -> Option<&Value> {
        match self {
            Extracted::Structured(value) => Some(value),
            Extracted::Unstructured(_) => None,
        }
    }

    /// Collapse into a JSON value; unstructured text becomes `{"raw": text}`.
    pub fn into_value(self) -> Value {
        match self {
            Extracted::Structured(value) => value,
            Extracted::Unstructured(raw) => json!({ "raw": raw }),
        }
    }
}

fn fenced_json_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)```\s*json[^\n]*\n(.*?)```").expect("fenced block pattern is valid")
    })
}

/// Extract structured data from a model answer.
pub fn extract_structured(raw: &str) -> Extracted {
    if let Some(value) = from_fenced_block(raw) {
        return Extracted::Structured(value);
    }
    if let Some(value) = from_brace_scan(raw) {
        return Extracted::Structured(value);
    }
    Extracted::Unstructured(raw.to_string())
}

fn from_fenced_block(raw: &str) -> Option<Value> {
    fenced_json_regex()
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .find_map(|body| serde_json::from_str::<Value>(body.as_str().trim()).ok())
}

fn from_brace_scan(raw: &str) -> Option<Value> {
    top_level_objects(raw)
        .into_iter()
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate) {
            Ok(value @ Value::Object(_)) => Some(value),
            _ => None,
        })
}

/// Balanced `{...}` spans at nesting depth zero, in order of appearance.
///
/// Braces inside JSON string literals do not count.
fn top_level_objects(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if depth > 0 && in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = idx;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=idx]);
                }
            }
            _ => {}
        }
    }

    spans
}
