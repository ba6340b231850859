//! CLI output parsing shared by the Claude and Gemini adapters.
//!
//! Both tools print either plain text or a JSON document whose shape has
//! drifted across releases, so extraction is tolerant: try the common
//! field names, recurse into nested values, and fall back to raw text.

use serde_json::Value;

/// Field names that carry the response text across CLI versions.
const CONTENT_FIELDS: &[&str] = &["result", "content", "text", "response", "message", "output"];

/// Parse one-shot CLI output.
///
/// Returns the extracted text plus the raw JSON document when the output
/// was JSON; plain text passes through unchanged.
pub(crate) fn parse_json_output(output: &str) -> (String, Option<Value>) {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return (String::new(), None);
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => {
            let content = extract_text(&value).unwrap_or_default();
            (content, Some(value))
        }
        Err(_) => (trimmed.to_string(), None),
    }
}

/// Extract text content from a JSON value of any supported shape.
pub(crate) fn extract_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(extract_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("\n"))
            }
        }
        Value::Object(map) => {
            for field in CONTENT_FIELDS {
                if let Some(inner) = map.get(*field) {
                    if let Some(text) = extract_text(inner) {
                        return Some(text);
                    }
                }
            }
            // Anthropic-style `{type: "text", text: "..."}` blocks
            if map.get("type").and_then(Value::as_str) == Some("text") {
                if let Some(text) = map.get("text").and_then(Value::as_str) {
                    return Some(text.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// Parse one line of `stream-json` output into its text delta.
///
/// Non-JSON lines are treated as raw text.
pub(crate) fn parse_stream_line(line: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        return Some(line.to_string());
    };
    let map = value.as_object()?;

    if let Some(text) = map.get("text").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    if let Some(delta) = map.get("delta").and_then(Value::as_object) {
        if let Some(text) = delta.get("text").and_then(Value::as_str) {
            return Some(text.to_string());
        }
    }
    match map.get("content") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(items)) => {
            let text: String = items
                .iter()
                .filter_map(|item| {
                    let block = item.as_object()?;
                    if block.get("type").and_then(Value::as_str) == Some("text") {
                        block.get("text").and_then(Value::as_str).map(str::to_string)
                    } else {
                        None
                    }
                })
                .collect();
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        }
        _ => None,
    }
}
