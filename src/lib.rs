//! # secure-gateway
//!
//! Sanitizing, rate-limited request gateway for AI chat webhooks.
//!
//! This crate sits between a chat front end and an external AI webhook. It
//! cleans what users type, throttles each user, tags and sends requests with
//! bounded retries, and cleans what comes back.
//!
//! ## Features
//!
//! - **Input validation**: length limits, forbidden content stripping,
//!   suspicious content flagging, HTML escaping
//! - **Response validation**: forbidden content stripping that keeps markup
//! - **Rate limiting**: per-user sliding one-minute window
//! - **Security log**: bounded in-memory record of security events
//! - **Gateway**: timeout-bounded POST with exponential backoff retries
//!
//! ## Quick Start
//!
//! ```no_run
//! use secure_gateway::chat::{ChatService, ChatSession};
//! use secure_gateway::config::Config;
//! use secure_gateway::session::UserRole;
//!
//! #[tokio::main]
//! async fn main() -> secure_gateway::Result<()> {
//!     // Initialize logging
//!     secure_gateway::logging::try_init().ok();
//!
//!     let config = Config::default();
//!     let service = ChatService::from_config(&config);
//!     let session = ChatSession::new(UserRole::Client);
//!
//!     let reply = service.send(&session, "Latest research on MSFT?").await?;
//!     println!("{} ({} requests left)", reply.content, reply.remaining);
//!
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod security;
pub mod session;

// Re-export commonly used types
pub use chat::{ChatReply, ChatService, ChatSession};
pub use error::{GatewayError, Result};
pub use gateway::{RequestGateway, RetryPolicy, WebhookResponse};
pub use security::{
    MessageValidator, RateLimiter, SecurityEvent, SecurityEventKind, SecurityLog,
    ValidationResult,
};
pub use session::{UserId, UserRole};
