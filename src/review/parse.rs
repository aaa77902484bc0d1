use serde_json::Value;

use crate::docs::types::Issue;

pub const INVALID_JSON: &str = "model did not return valid JSON";

/// Remove a surrounding code fence and its language tag, if any.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let inner = trimmed.trim_matches('`');
    // Language tag: the leading word right after the opening fence (```json).
    let tag_len = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(inner.len());
    inner[tag_len..].trim()
}

/// Turn a model response into issues.
///
/// Accepts a JSON array of objects or a single object. Never fails: an
/// unusable response becomes a single record that carries the response
/// verbatim in `raw`.
pub fn parse_issues(response: &str) -> Vec<Issue> {
    let parsed = serde_json::from_str::<Value>(strip_code_fence(response));
    let issues = match parsed {
        Ok(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Some(Issue::from(map)),
                _ => None,
            })
            .collect::<Option<Vec<_>>>(),
        Ok(Value::Object(map)) => Some(vec![Issue::from(map)]),
        _ => None,
    };
    issues.unwrap_or_else(|| vec![Issue::failed(INVALID_JSON, response)])
}
