//! Rate-limited, timeout-bounded, retrying webhook client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::request::{ClientIdentity, OutboundRequest};
use super::retry::RetryPolicy;
use super::transport::{HttpTransport, Transport, WebhookResponse};
use crate::error::{GatewayError, Result};
use crate::security::{RateLimiter, SecurityEventKind, SecurityLog};

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends payloads to the AI webhook.
///
/// Each logical send consults the rate limiter once, then runs at most
/// `1 + max_retries` attempts. Only transient failures (timeouts and
/// transport errors) are retried; HTTP status failures end the send.
pub struct RequestGateway {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    log: Arc<SecurityLog>,
    policy: RetryPolicy,
    timeout: Duration,
    identity: ClientIdentity,
}

impl RequestGateway {
    /// Create a gateway using the `reqwest` transport and default settings.
    pub fn new(limiter: Arc<RateLimiter>, log: Arc<SecurityLog>) -> Self {
        Self::with_transport(Arc::new(HttpTransport::new()), limiter, log)
    }

    /// Create a gateway over a custom transport.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        log: Arc<SecurityLog>,
    ) -> Self {
        Self {
            transport,
            limiter,
            log,
            policy: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            identity: ClientIdentity::default(),
        }
    }

    /// Set the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the client tags.
    pub fn with_identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Send `payload` to `url` on behalf of `user_id`.
    pub async fn send(
        &self,
        url: &str,
        payload: &Value,
        user_id: &str,
    ) -> Result<WebhookResponse> {
        self.send_until(url, payload, user_id, std::future::pending::<()>())
            .await
    }

    /// Like [`send`](Self::send), but gives up with
    /// [`GatewayError::Cancelled`] as soon as `cancel` completes.
    ///
    /// Cancellation drops the in-flight attempt or the pending backoff wait.
    pub async fn send_until<C>(
        &self,
        url: &str,
        payload: &Value,
        user_id: &str,
        cancel: C,
    ) -> Result<WebhookResponse>
    where
        C: Future<Output = ()>,
    {
        if !self.limiter.is_allowed(user_id) {
            self.log
                .log(SecurityEventKind::RateLimit, user_id, "Rate limit exceeded", None);
            return Err(GatewayError::RateLimited);
        }

        tokio::pin!(cancel);
        let mut attempt = 0u32;

        loop {
            let outcome = tokio::select! {
                _ = &mut cancel => Err(GatewayError::Cancelled),
                result = self.attempt(url, payload, user_id) => result,
            };

            let err = match outcome {
                Ok(response) => {
                    info!(
                        user_id,
                        request_id = %response.request_id,
                        status = response.status,
                        attempt,
                        "webhook request succeeded"
                    );
                    return Ok(response);
                }
                Err(GatewayError::Cancelled) => {
                    debug!(user_id, attempt, "webhook request cancelled");
                    return Err(GatewayError::Cancelled);
                }
                Err(err) => err,
            };

            if err.is_transient() && self.policy.should_retry(attempt) {
                self.log.log(
                    SecurityEventKind::SecurityViolation,
                    user_id,
                    format!(
                        "Webhook request failed, retrying ({}/{})",
                        attempt + 1,
                        self.policy.max_retries
                    ),
                    Some(json!({ "error": err.to_string(), "retry": attempt + 1 })),
                );

                let delay = self.policy.delay_for(attempt);
                warn!(user_id, attempt, ?delay, error = %err, "retrying webhook request");

                tokio::select! {
                    _ = &mut cancel => {
                        debug!(user_id, attempt, "webhook request cancelled during backoff");
                        return Err(GatewayError::Cancelled);
                    }
                    _ = tokio::time::sleep(delay) => {}
                }

                attempt += 1;
                continue;
            }

            self.log.log(
                SecurityEventKind::SecurityViolation,
                user_id,
                "Webhook request failed after retries",
                Some(json!({ "error": err.to_string(), "attempts": attempt + 1 })),
            );
            return Err(err);
        }
    }

    /// One timeout-bounded attempt.
    async fn attempt(
        &self,
        url: &str,
        payload: &Value,
        user_id: &str,
    ) -> Result<WebhookResponse> {
        let request = OutboundRequest::build(url, payload, user_id, &self.identity, Utc::now())?;
        debug!(user_id, request_id = %request.request_id, "sending webhook request");

        let response = tokio::time::timeout(self.timeout, self.transport.post(&request))
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))??;

        if !response.is_success() {
            return Err(GatewayError::Status {
                code: response.status,
                reason: response.reason,
            });
        }

        Ok(response)
    }

    /// Requests `user_id` may still send in the current window.
    pub fn remaining(&self, user_id: &str) -> u32 {
        self.limiter.remaining(user_id)
    }

    /// Get the retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }
}
