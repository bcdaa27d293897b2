//! Security module for secure-gateway.
//!
//! This module provides message validation, rate limiting, and the security
//! event log shared by the rest of the crate.
//!
//! ## Features
//!
//! - **Input Validation**: length limits, forbidden and suspicious content
//!   detection, HTML escaping
//! - **Response Validation**: forbidden content stripping for AI output
//! - **Rate Limiting**: per-user sliding window rate limiter
//! - **Security Log**: bounded in-memory record of security events
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use secure_gateway::security::{
//!     MessageValidator, RateLimiter, SecurityLog, ValidationConfig,
//! };
//!
//! let log = Arc::new(SecurityLog::new());
//! let validator = MessageValidator::new(ValidationConfig::default(), log.clone());
//! let limiter = RateLimiter::default();
//!
//! let result = validator.validate_input("How is NVDA doing?", "user_1");
//! assert!(result.is_valid);
//! assert!(limiter.is_allowed("user_1"));
//! assert_eq!(limiter.remaining("user_1"), 9);
//! ```

pub mod audit;
pub mod rate_limit;
pub mod validation;

// Re-export commonly used types
pub use audit::{SecurityEvent, SecurityEventKind, SecurityLog};
pub use rate_limit::{RateLimitConfig, RateLimitStats, RateLimiter};
pub use validation::{
    decode_html_entities, escape_html, MessageValidator, ValidationConfig, ValidationResult,
};
