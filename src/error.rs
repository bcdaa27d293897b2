//! Error types for secure-gateway.

use std::time::Duration;

use thiserror::Error;

use crate::config::Environment;

/// Message shown to end users in production for errors whose detail must
/// not leak.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

/// Main error type for gateway operations.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The per-user request quota for the current window is used up.
    #[error("Rate limit exceeded. Please wait before sending another message.")]
    RateLimited,

    /// User input failed validation.
    #[error("Your message contains prohibited content: {}", .0.join(", "))]
    InvalidInput(Vec<String>),

    /// Numeric user role outside the known range.
    #[error("Invalid user role detected: {0}")]
    InvalidUserRole(i64),

    /// A single attempt exceeded the webhook timeout.
    #[error("webhook request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Connection or transport level failure.
    #[error("failed to fetch: {0}")]
    Network(String),

    /// The status line arrived but the body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The webhook answered with a non-success status.
    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },

    /// The caller cancelled the send.
    #[error("request cancelled")]
    Cancelled,

    /// The payload handed to the gateway was not a JSON object.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// JSON encoding or decoding failed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether the failure is a network/timeout condition worth retrying.
    ///
    /// HTTP status and body read failures are never transient: the server
    /// already received the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Network(_))
    }

    /// Build the message that may be shown to an end user.
    ///
    /// Rejections the user can act on are shown verbatim. Everything else is
    /// replaced by a generic message in production so internal details never
    /// reach the screen.
    pub fn user_message(&self, environment: Environment) -> String {
        match self {
            Self::RateLimited
            | Self::InvalidInput(_)
            | Self::InvalidUserRole(_)
            | Self::Cancelled => self.to_string(),
            _ if environment.is_production() => GENERIC_ERROR_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

/// Convenience Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
