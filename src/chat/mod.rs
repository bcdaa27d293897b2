//! Chat message flow on top of the gateway.
//!
//! [`ChatService`] performs the whole round trip for one message: input
//! validation, payload construction, the gateway send, reply extraction and
//! response validation.

mod reply;
mod service;

pub use reply::{extract_reply, REPLY_KEYS};
pub use service::{
    ChatReply, ChatRequest, ChatService, ChatSession, WebhookEndpoints, ADVANCED_MODE,
};
