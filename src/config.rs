//! Configuration management for secure-gateway.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values
//!
//! It is read once at startup and never changes afterwards.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::gateway::{ClientIdentity, RetryPolicy};
use crate::security::{RateLimitConfig, ValidationConfig};

/// Fallback endpoint for normal mode.
pub const DEFAULT_NORMAL_WEBHOOK: &str =
    "https://wonder3.app.n8n.cloud/webhook/b9ab99b4-ccf9-43ca-a406-3b14c47362ec";

/// Fallback endpoint for advanced mode.
pub const DEFAULT_ADVANCED_WEBHOOK: &str =
    "https://wonder3.app.n8n.cloud/webhook-test/ad30832c-1f6b-4293-8eec-85490817e62d";

/// Build environment, controls how much error detail reaches end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Whether detailed errors must be hidden.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "dev" | "development" => Some(Self::Development),
            "prod" | "production" => Some(Self::Production),
            _ => None,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build environment.
    pub environment: Environment,
    /// Webhook endpoints.
    pub webhooks: WebhookSection,
    /// Message and rate limits.
    pub limits: LimitsSection,
    /// Outbound request settings.
    pub request: RequestSection,
    /// Chat presentation settings.
    pub chat: ChatSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Webhook endpoint section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSection {
    /// Endpoint used in normal mode.
    pub normal_url: String,
    /// Endpoint used in advanced mode.
    pub advanced_url: String,
}

impl Default for WebhookSection {
    fn default() -> Self {
        Self {
            normal_url: DEFAULT_NORMAL_WEBHOOK.to_string(),
            advanced_url: DEFAULT_ADVANCED_WEBHOOK.to_string(),
        }
    }
}

/// Limits section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    /// Enable rate limiting.
    pub rate_limit_enabled: bool,
    /// Requests allowed per user per minute.
    pub max_requests_per_minute: u32,
    /// Maximum message length in characters.
    pub max_message_length: usize,
    /// Minimum message length in characters.
    pub min_message_length: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            rate_limit_enabled: true,
            max_requests_per_minute: 10,
            max_message_length: 2000,
            min_message_length: 1,
        }
    }
}

/// Outbound request section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSection {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff_base_ms: u64,
    /// Version tag sent in the security metadata block.
    pub client_version: String,
    /// Value of the `X-Client-Info` header.
    pub client_info: String,
}

impl Default for RequestSection {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            backoff_base_ms: 1000,
            client_version: "1.0.0".to_string(),
            client_info: "BOCHK-AI-Client".to_string(),
        }
    }
}

/// Chat section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    /// Name the assistant uses for itself in fallback replies.
    pub assistant_name: String,
    /// Mode sent to the webhook outside advanced mode.
    pub default_mode: String,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            assistant_name: "BOCHK AI Agent".to_string(),
            default_mode: "finance".to_string(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
    /// Number of security events kept in memory.
    pub security_log_capacity: usize,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            security_log_capacity: 1000,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply `SECURE_GATEWAY_*` overrides from a variable source.
    fn apply_vars<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("SECURE_GATEWAY_NORMAL_WEBHOOK").filter(|v| !v.is_empty()) {
            self.webhooks.normal_url = url;
        }

        if let Some(url) = var("SECURE_GATEWAY_ADVANCED_WEBHOOK").filter(|v| !v.is_empty()) {
            self.webhooks.advanced_url = url;
        }

        if let Some(env) = var("SECURE_GATEWAY_ENV").and_then(|v| Environment::parse(&v)) {
            self.environment = env;
        }

        if let Some(timeout) = var("SECURE_GATEWAY_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.request.timeout_ms = timeout;
        }

        if let Some(level) = var("SECURE_GATEWAY_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if args.no_rate_limit {
            self.limits.rate_limit_enabled = false;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        Self::load_with(args, |name| std::env::var(name).ok())
    }

    /// Like [`load`](Self::load), reading variables from `var` instead of
    /// the process environment.
    pub fn load_with<F>(args: &Args, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_vars(var);
        config.apply_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Check values that would otherwise fail at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for url in [&self.webhooks.normal_url, &self.webhooks.advanced_url] {
            let parsed = Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.clone()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }

        if self.request.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("request.timeout_ms", "0".into()));
        }

        if self.limits.min_message_length > self.limits.max_message_length {
            return Err(ConfigError::InvalidValue(
                "limits.min_message_length",
                self.limits.min_message_length.to_string(),
            ));
        }

        Ok(())
    }

    /// Rate limiter settings.
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            enabled: self.limits.rate_limit_enabled,
            max_requests: self.limits.max_requests_per_minute,
            window: Duration::from_secs(60),
            ..RateLimitConfig::default()
        }
    }

    /// Message validation settings.
    pub fn validation(&self) -> ValidationConfig {
        ValidationConfig {
            max_message_length: self.limits.max_message_length,
            min_message_length: self.limits.min_message_length,
        }
    }

    /// Retry policy for transient failures.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.request.max_retries,
            Duration::from_millis(self.request.backoff_base_ms),
        )
    }

    /// Per-attempt webhook timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.request.timeout_ms)
    }

    /// Client tags attached to every request.
    pub fn client_identity(&self) -> ClientIdentity {
        ClientIdentity {
            version: self.request.client_version.clone(),
            info: self.request.client_info.clone(),
        }
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Webhook URL is not an absolute http(s) URL.
    InvalidUrl(String),
    /// A setting has an unusable value.
    InvalidValue(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidUrl(url) => write!(f, "invalid webhook url: {}", url),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
