//! Outbound request construction.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, Result};

pub const HEADER_REQUEST_ID: &str = "X-Request-ID";
pub const HEADER_CLIENT_INFO: &str = "X-Client-Info";

/// Static tags identifying this client to the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Sent as `security.clientVersion`.
    pub version: String,
    /// Sent as the `X-Client-Info` header.
    pub info: String,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            info: "BOCHK-AI-Client".to_string(),
        }
    }
}

/// Metadata block merged into every outbound body under `security`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityMetadata {
    pub timestamp: String,
    pub request_id: String,
    pub client_version: String,
}

/// A fully built webhook call.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub url: String,
    pub request_id: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

impl OutboundRequest {
    /// Build the POST for `payload`, tagged for `user_id` at time `now`.
    ///
    /// `payload` must be a JSON object; its own `security` key, if any, is
    /// replaced by the metadata block.
    pub fn build(
        url: &str,
        payload: &Value,
        user_id: &str,
        identity: &ClientIdentity,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let Value::Object(fields) = payload else {
            return Err(GatewayError::InvalidPayload(format!(
                "expected a JSON object, got {}",
                json_type(payload)
            )));
        };

        let request_id = request_id(user_id, now);
        let metadata = SecurityMetadata {
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            request_id: request_id.clone(),
            client_version: identity.version.clone(),
        };

        let mut body = fields.clone();
        body.insert("security".to_string(), serde_json::to_value(metadata)?);

        Ok(Self {
            url: url.to_string(),
            headers: vec![
                ("Content-Type", "application/json".to_string()),
                ("Accept", "application/json".to_string()),
                (HEADER_REQUEST_ID, request_id.clone()),
                (HEADER_CLIENT_INFO, identity.info.clone()),
            ],
            request_id,
            body: Value::Object(body),
        })
    }

    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// `<user_id>-<unix_millis>`
pub fn request_id(user_id: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", user_id, now.timestamp_millis())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
