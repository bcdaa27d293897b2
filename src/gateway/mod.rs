//! Outbound webhook gateway.
//!
//! # Data Flow
//! ```text
//! send(url, payload, user)
//!     → rate limiter (reject without a network call when exhausted)
//!     → request.rs   (merge security metadata, tag headers)
//!     → transport.rs (POST, bounded by the per-attempt timeout)
//!     → retry.rs     (transient failure: back off 1s, 2s, 4s and retry)
//!     → WebhookResponse, or the last error after logging it
//! ```

pub mod client;
pub mod request;
pub mod retry;
pub mod transport;

pub use client::{RequestGateway, DEFAULT_TIMEOUT};
pub use request::{ClientIdentity, OutboundRequest, SecurityMetadata};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, Transport, WebhookResponse};
