//! End-to-end chat send flow.

use std::future::Future;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::reply::extract_reply;
use crate::config::{Config, Environment};
use crate::error::{GatewayError, Result};
use crate::gateway::{RequestGateway, Transport};
use crate::security::{
    MessageValidator, RateLimiter, SecurityEventKind, SecurityLog, ValidationResult,
};
use crate::session::{UserId, UserRole};

/// Mode sent to the webhook while advanced mode is on.
pub const ADVANCED_MODE: &str = "advanced_finance";

/// One client's chat state.
#[derive(Debug, Clone)]
pub struct ChatSession {
    /// Identifier for rate limiting and logging.
    pub user_id: UserId,
    /// Persona the session acts for.
    pub role: UserRole,
    /// Route to the advanced endpoint.
    pub advanced: bool,
    /// Mode sent outside advanced mode.
    pub mode: String,
}

impl ChatSession {
    /// Start a session with a fresh user ID.
    pub fn new(role: UserRole) -> Self {
        Self {
            user_id: UserId::generate(),
            role,
            advanced: false,
            mode: "finance".to_string(),
        }
    }

    /// Switch advanced mode on or off.
    pub fn with_advanced(mut self, advanced: bool) -> Self {
        self.advanced = advanced;
        self
    }

    /// Set the normal-mode mode name.
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Mode name as sent to the webhook.
    pub fn effective_mode(&self) -> &str {
        if self.advanced {
            ADVANCED_MODE
        } else {
            &self.mode
        }
    }

    /// Human readable mode title.
    pub fn mode_title(&self) -> String {
        match self.effective_mode() {
            ADVANCED_MODE => "Advanced Finance".to_string(),
            "finance" => "Finance Research".to_string(),
            other => other.to_string(),
        }
    }
}

/// Body posted to the webhook, before security metadata is merged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub mode: String,
    pub user_type: String,
    pub timestamp: String,
    pub user_id: String,
}

/// A delivered reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    /// Sanitized reply text.
    pub content: String,
    /// Whether the reply had forbidden content stripped.
    pub flagged: bool,
    /// Requests left for the user in the current window.
    pub remaining: u32,
}

/// Endpoints for the two modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEndpoints {
    pub normal: String,
    pub advanced: String,
}

/// Validates, sends and post-processes chat messages.
pub struct ChatService {
    validator: MessageValidator,
    gateway: RequestGateway,
    log: Arc<SecurityLog>,
    endpoints: WebhookEndpoints,
    environment: Environment,
    assistant_name: String,
}

impl ChatService {
    /// Assemble the service from configuration.
    pub fn from_config(config: &Config) -> Self {
        let log = Arc::new(SecurityLog::with_capacity(config.logging.security_log_capacity));
        let limiter = Arc::new(RateLimiter::new(config.rate_limit()));
        let gateway = RequestGateway::new(limiter, Arc::clone(&log));
        Self::assemble(config, gateway, log)
    }

    /// Assemble the service over a custom transport.
    pub fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let log = Arc::new(SecurityLog::with_capacity(config.logging.security_log_capacity));
        let limiter = Arc::new(RateLimiter::new(config.rate_limit()));
        let gateway = RequestGateway::with_transport(transport, limiter, Arc::clone(&log));
        Self::assemble(config, gateway, log)
    }

    fn assemble(config: &Config, gateway: RequestGateway, log: Arc<SecurityLog>) -> Self {
        let gateway = gateway
            .with_retry_policy(config.retry_policy())
            .with_timeout(config.timeout())
            .with_identity(config.client_identity());

        Self {
            validator: MessageValidator::new(config.validation(), Arc::clone(&log)),
            gateway,
            log,
            endpoints: WebhookEndpoints {
                normal: config.webhooks.normal_url.clone(),
                advanced: config.webhooks.advanced_url.clone(),
            },
            environment: config.environment,
            assistant_name: config.chat.assistant_name.clone(),
        }
    }

    /// Send `text` for `session` and return the sanitized reply.
    pub async fn send(&self, session: &ChatSession, text: &str) -> Result<ChatReply> {
        self.send_until(session, text, std::future::pending::<()>())
            .await
    }

    /// Like [`send`](Self::send), abandoned with
    /// [`GatewayError::Cancelled`] once `cancel` completes.
    pub async fn send_until<C>(
        &self,
        session: &ChatSession,
        text: &str,
        cancel: C,
    ) -> Result<ChatReply>
    where
        C: Future<Output = ()>,
    {
        let user_id = session.user_id.as_str();

        let validation = self.validator.validate_input(text, user_id);
        if !validation.is_valid {
            return Err(GatewayError::InvalidInput(validation.violations));
        }

        let request = ChatRequest {
            message: validation.sanitized,
            mode: session.effective_mode().to_string(),
            user_type: session.role.label().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            user_id: user_id.to_string(),
        };
        let url = self.endpoint(session);
        debug!(user_id, url, mode = %request.mode, "sending chat message");

        match self.deliver(session, &request, url, cancel).await {
            Ok(reply) => {
                info!(
                    user_id,
                    flagged = reply.flagged,
                    remaining = reply.remaining,
                    "chat reply received"
                );
                Ok(reply)
            }
            Err(GatewayError::Cancelled) => Err(GatewayError::Cancelled),
            Err(err) => {
                self.log.log(
                    SecurityEventKind::SecurityViolation,
                    user_id,
                    "Webhook request failed",
                    Some(json!({ "error": err.to_string() })),
                );
                Err(err)
            }
        }
    }

    /// Send the built request and turn the webhook answer into a reply.
    async fn deliver<C>(
        &self,
        session: &ChatSession,
        request: &ChatRequest,
        url: &str,
        cancel: C,
    ) -> Result<ChatReply>
    where
        C: Future<Output = ()>,
    {
        let user_id = request.user_id.as_str();
        let payload = serde_json::to_value(request)?;
        let response = self
            .gateway
            .send_until(url, &payload, user_id, cancel)
            .await?;

        let body: Value = response.json()?;
        let content =
            extract_reply(&body).unwrap_or_else(|| self.fallback_reply(session, request));
        let checked = self.validate_response(&content, user_id);

        Ok(ChatReply {
            content: checked.sanitized,
            flagged: !checked.is_valid,
            remaining: self.gateway.remaining(user_id),
        })
    }

    /// Validate reply text from any source.
    pub fn validate_response(&self, content: &str, user_id: &str) -> ValidationResult {
        self.validator.validate_response(content, user_id)
    }

    /// Endpoint for the session's mode.
    pub fn endpoint(&self, session: &ChatSession) -> &str {
        if session.advanced {
            &self.endpoints.advanced
        } else {
            &self.endpoints.normal
        }
    }

    /// Text shown when the webhook answered without a usable reply.
    fn fallback_reply(&self, session: &ChatSession, request: &ChatRequest) -> String {
        format!(
            "I understand you're asking about \"{}\". As your {} in {} mode for {}, I'm here to help you with that.",
            request.message,
            self.assistant_name,
            session.mode_title(),
            session.role.label()
        )
    }

    /// Display string for an error, honouring the environment.
    pub fn describe_error(&self, err: &GatewayError) -> String {
        err.user_message(self.environment)
    }

    /// Requests left for `session` in the current window.
    pub fn remaining(&self, session: &ChatSession) -> u32 {
        self.gateway.remaining(session.user_id.as_str())
    }

    /// Shared security log.
    pub fn security_log(&self) -> &Arc<SecurityLog> {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{OutboundRequest, WebhookResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers every call with a fixed body and keeps the requests.
    struct FixedTransport {
        status: u16,
        body: String,
        requests: Mutex<Vec<OutboundRequest>>,
    }

    impl FixedTransport {
        fn new(status: u16, body: Value) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.to_string(),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn post(&self, request: &OutboundRequest) -> Result<WebhookResponse> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(WebhookResponse {
                status: self.status,
                reason: "fixed".into(),
                request_id: request.request_id.clone(),
                body: self.body.clone(),
            })
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.webhooks.normal_url = "http://hooks.test/normal".into();
        config.webhooks.advanced_url = "http://hooks.test/advanced".into();
        config.environment = Environment::Production;
        config
    }

    #[tokio::test]
    async fn test_reply_delivered() {
        let transport = FixedTransport::new(200, json!({ "output": "NVDA is up 2%" }));
        let service = ChatService::with_transport(&config(), transport.clone());
        let session = ChatSession::new(UserRole::Client);

        let reply = service.send(&session, "How is NVDA?").await.unwrap();
        assert_eq!(reply.content, "NVDA is up 2%");
        assert!(!reply.flagged);
        assert_eq!(reply.remaining, 9);

        let requests = transport.requests.lock().unwrap();
        let body = &requests[0].body;
        assert_eq!(requests[0].url, "http://hooks.test/normal");
        assert_eq!(body["message"], "How is NVDA?");
        assert_eq!(body["mode"], "finance");
        assert_eq!(body["user_type"], "Client");
        assert_eq!(body["user_id"], session.user_id.as_str());
        assert!(body["security"]["requestId"].is_string());
    }

    #[tokio::test]
    async fn test_advanced_mode_routing() {
        let transport = FixedTransport::new(200, json!({ "text": "ok" }));
        let service = ChatService::with_transport(&config(), transport.clone());
        let session = ChatSession::new(UserRole::RelationManager).with_advanced(true);

        service.send(&session, "Top movers?").await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].url, "http://hooks.test/advanced");
        assert_eq!(requests[0].body["mode"], ADVANCED_MODE);
        assert_eq!(requests[0].body["user_type"], "Relation Manager");
    }

    #[tokio::test]
    async fn test_message_sent_escaped() {
        let transport = FixedTransport::new(200, json!({ "output": "ok" }));
        let service = ChatService::with_transport(&config(), transport.clone());
        let session = ChatSession::new(UserRole::Client);

        service.send(&session, "Is AT&T > VZ?").await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].body["message"], "Is AT&amp;T &gt; VZ?");
    }

    #[tokio::test]
    async fn test_invalid_input_not_sent() {
        let transport = FixedTransport::new(200, json!({ "output": "ok" }));
        let service = ChatService::with_transport(&config(), transport.clone());
        let session = ChatSession::new(UserRole::Client);

        let err = service
            .send(&session, "<script>alert(1)</script>")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidInput(_)));
        assert!(transport.requests.lock().unwrap().is_empty());
        assert_eq!(service.remaining(&session), 10);
        assert!(service
            .describe_error(&err)
            .contains("Forbidden content detected"));
    }

    #[tokio::test]
    async fn test_fallback_reply() {
        let transport = FixedTransport::new(200, json!({ "message": "Workflow was started" }));
        let service = ChatService::with_transport(&config(), transport);
        let session = ChatSession::new(UserRole::Parents);

        let reply = service.send(&session, "Savings plans").await.unwrap();
        assert_eq!(
            reply.content,
            "I understand you're asking about \"Savings plans\". As your BOCHK AI Agent in Finance Research mode for Parents, I'm here to help you with that."
        );
    }

    #[tokio::test]
    async fn test_reply_sanitized() {
        let transport = FixedTransport::new(
            200,
            json!({ "output": "Chart: <iframe src=\"x\"></iframe> **done**" }),
        );
        let service = ChatService::with_transport(&config(), transport);
        let session = ChatSession::new(UserRole::Client);

        let reply = service.send(&session, "chart please").await.unwrap();
        assert!(reply.flagged);
        assert_eq!(reply.content, "Chart: [REMOVED] **done**");
    }

    #[tokio::test]
    async fn test_http_failure_logged_and_hidden() {
        let transport = FixedTransport::new(500, json!({}));
        let service = ChatService::with_transport(&config(), transport);
        let session = ChatSession::new(UserRole::Client);

        let err = service.send(&session, "hello").await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { code: 500, .. }));
        assert_eq!(
            service.describe_error(&err),
            crate::error::GENERIC_ERROR_MESSAGE
        );

        let messages: Vec<_> = service
            .security_log()
            .by_kind(SecurityEventKind::SecurityViolation)
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(
            messages,
            vec!["Webhook request failed after retries", "Webhook request failed"]
        );
    }

    #[tokio::test]
    async fn test_non_json_body_is_error() {
        let transport = Arc::new(FixedTransport {
            status: 200,
            body: "<html>gateway</html>".into(),
            requests: Mutex::new(Vec::new()),
        });
        let service = ChatService::with_transport(&config(), transport);
        let session = ChatSession::new(UserRole::Client);

        let err = service.send(&session, "hello").await.unwrap_err();
        assert!(matches!(err, GatewayError::Json(_)));

        let events = service
            .security_log()
            .by_kind(SecurityEventKind::SecurityViolation);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "Webhook request failed");
        assert!(events[0].data.as_ref().unwrap()["error"]
            .as_str()
            .unwrap()
            .starts_with("invalid JSON"));
    }

    #[tokio::test]
    async fn test_rate_limited_send_logged() {
        let mut config = config();
        config.limits.max_requests_per_minute = 1;
        let transport = FixedTransport::new(200, json!({ "output": "ok" }));
        let service = ChatService::with_transport(&config, transport.clone());
        let session = ChatSession::new(UserRole::Client);

        service.send(&session, "first").await.unwrap();
        let err = service.send(&session, "second").await.unwrap_err();
        assert!(matches!(err, GatewayError::RateLimited));
        assert_eq!(transport.requests.lock().unwrap().len(), 1);

        let entries: Vec<_> = service
            .security_log()
            .all()
            .into_iter()
            .map(|e| (e.kind, e.message))
            .collect();
        assert_eq!(
            entries,
            vec![
                (SecurityEventKind::RateLimit, "Rate limit exceeded".to_string()),
                (
                    SecurityEventKind::SecurityViolation,
                    "Webhook request failed".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_mode_titles() {
        let session = ChatSession::new(UserRole::Client);
        assert_eq!(session.mode_title(), "Finance Research");
        assert_eq!(session.clone().with_advanced(true).mode_title(), "Advanced Finance");
        assert_eq!(session.with_mode("crypto").mode_title(), "crypto");
    }
}
