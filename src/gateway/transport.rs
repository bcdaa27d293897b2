//! HTTP transport used by the gateway.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::request::OutboundRequest;
use crate::error::{GatewayError, Result};

/// A received webhook response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for the status, if known.
    pub reason: String,
    /// Request ID the call was tagged with.
    pub request_id: String,
    /// Raw response body.
    pub body: String,
}

impl WebhookResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Body as text.
    pub fn text(&self) -> &str {
        &self.body
    }
}

/// Performs one POST. Implementations do not retry and do not enforce the
/// gateway timeout; both belong to [`RequestGateway`](super::RequestGateway).
///
/// Failures before a status arrives must map to [`GatewayError::Network`]
/// or [`GatewayError::Timeout`] so the gateway can classify them as
/// transient. A body that breaks off after the status is
/// [`GatewayError::Body`] and is not retried.
/// A non-2xx answer is not an error at this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: &OutboundRequest) -> Result<WebhookResponse>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, TLS roots, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: &OutboundRequest) -> Result<WebhookResponse> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder
            .json(&request.body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| GatewayError::Body(err.without_url().to_string()))?;

        Ok(WebhookResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            request_id: request.request_id.clone(),
            body,
        })
    }
}

fn network_error(err: reqwest::Error) -> GatewayError {
    // Strip the URL so webhook paths never end up in error text.
    GatewayError::Network(err.without_url().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn response(status: u16, body: &str) -> WebhookResponse {
        WebhookResponse {
            status,
            reason: String::new(),
            request_id: "u-1".into(),
            body: body.into(),
        }
    }

    #[test]
    fn test_success_range() {
        assert!(response(200, "").is_success());
        assert!(response(204, "").is_success());
        assert!(!response(199, "").is_success());
        assert!(!response(301, "").is_success());
        assert!(!response(500, "").is_success());
    }

    #[test]
    fn test_json_decode() {
        let value: Value = response(200, r#"{"output":"hi"}"#).json().unwrap();
        assert_eq!(value["output"], "hi");

        let err = response(200, "<html>").json::<Value>().unwrap_err();
        assert!(matches!(err, GatewayError::Json(_)));
    }
}
