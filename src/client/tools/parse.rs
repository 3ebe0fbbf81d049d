//! Extracting JSON from the model's text reply.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::error::ToolError;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```json\s*|\s*```").expect("fence pattern is valid"));

/// Remove markdown code fences (with or without a `json` tag).
pub fn strip_fences(text: &str) -> String {
    FENCE.replace_all(text, "").trim().to_string()
}

/// Parse a possibly fenced JSON reply.
pub fn parse_fenced_json(text: &str) -> Result<serde_json::Value, ToolError> {
    let cleaned = strip_fences(text);
    serde_json::from_str(&cleaned).map_err(|e| {
        warn!(error = %e, "Model returned invalid JSON");
        ToolError::ResponseParse
    })
}

/// `candidates[0].content.parts[0].text`, if the response has candidates.
pub fn first_candidate_text(response: &serde_json::Value) -> Option<Option<&str>> {
    let candidates = response.get("candidates")?.as_array()?;
    let first = candidates.first()?;
    Some(first.pointer("/content/parts/0/text").and_then(|t| t.as_str()))
}
