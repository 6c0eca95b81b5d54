//! Lenient JSON extraction from model output.

use serde_json::Value;

/// Parse `text` as JSON, unwrapping a Markdown code fence if present.
///
/// Returns `None` when neither the raw text nor the fenced content parses.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if !trimmed.starts_with("```") {
        return None;
    }

    let mut lines: Vec<&str> = trimmed.lines().skip(1).collect();
    if lines.last().is_some_and(|l| l.trim() == "```") {
        lines.pop();
    }
    serde_json::from_str(&lines.join("\n")).ok()
}
