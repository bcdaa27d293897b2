//! Reply text extraction from webhook bodies.

use serde_json::Value;

/// Keys probed for the reply, highest priority first.
pub const REPLY_KEYS: &[&str] = &["output", "response", "ai_response", "result", "message", "text"];

/// Acknowledgement some workflow engines send instead of a reply.
const WORKFLOW_STARTED: &str = "Workflow was started";

/// Pick the reply text out of a decoded webhook body.
///
/// Returns `None` when no key holds a usable value; empty strings, `null`
/// and `false` are skipped, as is a `message` that only acknowledges the
/// workflow start. Non-string values are rendered as JSON.
pub fn extract_reply(body: &Value) -> Option<String> {
    REPLY_KEYS.iter().find_map(|&key| {
        let value = body.get(key)?;
        if key == "message" && value.as_str() == Some(WORKFLOW_STARTED) {
            return None;
        }
        match value {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    })
}
