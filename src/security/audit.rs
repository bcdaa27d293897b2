//! Bounded in-memory security event log.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default number of events retained.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Category of a security event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    SecurityViolation,
    RateLimit,
    SuspiciousContent,
    ValidationError,
}

impl SecurityEventKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityViolation => "security_violation",
            Self::RateLimit => "rate_limit",
            Self::SuspiciousContent => "suspicious_content",
            Self::ValidationError => "validation_error",
        }
    }
}

impl fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "security_violation" => Ok(Self::SecurityViolation),
            "rate_limit" => Ok(Self::RateLimit),
            "suspicious_content" => Ok(Self::SuspiciousContent),
            "validation_error" => Ok(Self::ValidationError),
            other => Err(format!("unknown security event kind: {}", other)),
        }
    }
}

/// A single recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: SecurityEventKind,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Append-only event log holding at most `capacity` entries.
///
/// When full, the oldest entries are evicted first. Readers always receive
/// owned copies, so nothing outside the log can mutate stored events.
#[derive(Debug)]
pub struct SecurityLog {
    events: Mutex<VecDeque<SecurityEvent>>,
    capacity: usize,
}

impl SecurityLog {
    /// Create a log with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a log retaining at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity,
        }
    }

    /// Record an event.
    pub fn log(
        &self,
        kind: SecurityEventKind,
        user_id: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) {
        let event = SecurityEvent {
            timestamp: Utc::now(),
            kind,
            user_id: user_id.to_string(),
            message: message.into(),
            data,
        };

        tracing::warn!(
            target: "secure_gateway::security",
            kind = %event.kind,
            user_id = %event.user_id,
            data = ?event.data,
            "{}",
            event.message
        );

        // A poisoned log only loses the event; the caller's flow continues.
        let Ok(mut events) = self.events.lock() else {
            return;
        };
        events.push_back(event);
        while events.len() > self.capacity {
            events.pop_front();
        }
    }

    /// Copy of every retained event, oldest first.
    pub fn all(&self) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .map(|events| events.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Copy of the retained events of one kind, oldest first.
    pub fn by_kind(&self, kind: SecurityEventKind) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| e.kind == kind).cloned().collect())
            .unwrap_or_default()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the log holds no events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of retained events.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SecurityLog {
    fn default() -> Self {
        Self::new()
    }
}
