//! Input and response validation and sanitization.

use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use serde_json::json;

use super::audit::{SecurityEventKind, SecurityLog};

/// Marker substituted for stripped content.
pub const REMOVED_MARKER: &str = "[REMOVED]";

pub const VIOLATION_TOO_SHORT: &str = "Message too short";
pub const VIOLATION_TOO_LONG: &str = "Message too long";
pub const VIOLATION_FORBIDDEN: &str = "Forbidden content detected";
pub const VIOLATION_SUSPICIOUS: &str = "Suspicious content detected";
pub const VIOLATION_FORBIDDEN_RESPONSE: &str = "Forbidden content detected in AI response";

/// Content that is stripped and causes rejection.
const FORBIDDEN_PATTERNS: &[(&str, &str)] = &[
    ("script_tag", r"(?i)<script[^>]*>.*?</script>"),
    ("javascript_uri", r"(?i)javascript:"),
    ("vbscript_uri", r"(?i)vbscript:"),
    ("event_handler", r"(?i)on\w+\s*="),
    ("iframe_tag", r"(?i)<iframe[^>]*>.*?</iframe>"),
    ("object_tag", r"(?i)<object[^>]*>.*?</object>"),
    ("embed_tag", r"(?i)<embed[^>]*>.*?</embed>"),
];

/// Content that is flagged and logged but left in place.
const SUSPICIOUS_PATTERNS: &[(&str, &str)] = &[
    ("sql_select", r"(?i)SELECT.*FROM"),
    ("sql_drop_table", r"(?i)DROP\s+TABLE"),
    ("sql_insert", r"(?i)INSERT\s+INTO"),
    ("sql_delete", r"(?i)DELETE\s+FROM"),
    ("sql_union", r"(?i)UNION\s+SELECT"),
    ("svg_onload", r"(?i)<svg[^>]*onload"),
];

/// Message validation limits.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Maximum message length in characters (after trimming).
    pub max_message_length: usize,
    /// Minimum message length in characters (after trimming).
    pub min_message_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
            min_message_length: 1,
        }
    }
}

/// Outcome of validating one piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub sanitized: String,
    pub violations: Vec<String>,
}

/// A compiled content signature.
#[derive(Debug)]
struct ContentPattern {
    name: &'static str,
    regex: Regex,
}

impl ContentPattern {
    fn compile(table: &[(&'static str, &str)]) -> Vec<Self> {
        table
            .iter()
            .map(|&(name, source)| Self {
                name,
                regex: Regex::new(source).expect("built-in content pattern must compile"),
            })
            .collect()
    }

    fn log_data(&self) -> serde_json::Value {
        json!({ "pattern": self.regex.as_str(), "name": self.name })
    }
}

/// Validates user messages and webhook responses.
///
/// Every violation is also written to the shared [`SecurityLog`].
#[derive(Debug)]
pub struct MessageValidator {
    config: ValidationConfig,
    forbidden: Vec<ContentPattern>,
    suspicious: Vec<ContentPattern>,
    log: Arc<SecurityLog>,
}

impl MessageValidator {
    /// Create a new validator with the given config.
    pub fn new(config: ValidationConfig, log: Arc<SecurityLog>) -> Self {
        Self {
            config,
            forbidden: ContentPattern::compile(FORBIDDEN_PATTERNS),
            suspicious: ContentPattern::compile(SUSPICIOUS_PATTERNS),
            log,
        }
    }

    /// Validate and sanitize text typed by a user.
    ///
    /// The text is trimmed, length-checked (and truncated when too long),
    /// stripped of forbidden content, scanned for suspicious content and
    /// finally HTML-escaped. The escaped text is returned even when the
    /// result is invalid.
    pub fn validate_input(&self, input: &str, user_id: &str) -> ValidationResult {
        let mut violations = Vec::new();
        let mut sanitized = input.trim().to_string();

        let length = sanitized.chars().count();
        if length < self.config.min_message_length {
            violations.push(VIOLATION_TOO_SHORT.to_string());
        }
        if length > self.config.max_message_length {
            violations.push(VIOLATION_TOO_LONG.to_string());
            sanitized = sanitized
                .chars()
                .take(self.config.max_message_length)
                .collect();
        }

        sanitized = self.strip_forbidden(
            sanitized,
            user_id,
            VIOLATION_FORBIDDEN,
            "Forbidden pattern detected",
            &mut violations,
        );

        for pattern in &self.suspicious {
            if pattern.regex.is_match(&sanitized) {
                violations.push(VIOLATION_SUSPICIOUS.to_string());
                self.log.log(
                    SecurityEventKind::SuspiciousContent,
                    user_id,
                    "Suspicious pattern detected",
                    Some(pattern.log_data()),
                );
            }
        }

        let sanitized = escape_html(&sanitized);
        let is_valid = violations.is_empty();

        if !is_valid {
            self.log.log(
                SecurityEventKind::ValidationError,
                user_id,
                "Input validation failed",
                Some(json!({
                    "violations": violations,
                    "originalLength": input.chars().count(),
                })),
            );
        }

        ValidationResult {
            is_valid,
            sanitized,
            violations,
        }
    }

    /// Validate text produced by the AI webhook.
    ///
    /// Only forbidden content is stripped. No length rule applies and no
    /// escaping happens, since responses may carry markup for the renderer.
    pub fn validate_response(&self, response: &str, user_id: &str) -> ValidationResult {
        let mut violations = Vec::new();
        let sanitized = self.strip_forbidden(
            response.trim().to_string(),
            user_id,
            VIOLATION_FORBIDDEN_RESPONSE,
            "Forbidden pattern in AI response",
            &mut violations,
        );

        let is_valid = violations.is_empty();
        if !is_valid {
            self.log.log(
                SecurityEventKind::ValidationError,
                user_id,
                "AI response validation failed",
                Some(json!({ "violations": violations })),
            );
        }

        ValidationResult {
            is_valid,
            sanitized,
            violations,
        }
    }

    fn strip_forbidden(
        &self,
        mut text: String,
        user_id: &str,
        violation: &str,
        log_message: &str,
        violations: &mut Vec<String>,
    ) -> String {
        for pattern in &self.forbidden {
            if pattern.regex.is_match(&text) {
                violations.push(violation.to_string());
                self.log.log(
                    SecurityEventKind::SecurityViolation,
                    user_id,
                    log_message,
                    Some(pattern.log_data()),
                );
                text = pattern
                    .regex
                    .replace_all(&text, REMOVED_MARKER)
                    .into_owned();
            }
        }
        text
    }

    /// Get the validation limits.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse [`escape_html`] for display. Also accepts `&#39;`.
///
/// Decoding is a single left-to-right pass, so an escaped entity such as
/// `&amp;lt;` decodes to `&lt;` rather than `<`.
pub fn decode_html_entities(text: &str) -> String {
    const ENTITIES: &[(&str, char)] = &[
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#x27;", '\''),
        ("&#39;", '\''),
    ];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, decoded)) => {
                out.push(*decoded);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
