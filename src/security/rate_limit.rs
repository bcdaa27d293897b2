//! Per-user sliding window rate limiting.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use tokio::time::Instant;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Time window duration.
    pub window: Duration,
    /// Whether rate limiting is enabled.
    pub enabled: bool,
    /// Maximum number of tracked users before idle ones are dropped.
    pub max_tracked_users: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
            enabled: true,
            max_tracked_users: 10000,
        }
    }
}

impl RateLimitConfig {
    /// Create a disabled rate limiter config.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Custom rate limit.
    pub fn custom(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            ..Default::default()
        }
    }
}

/// Request timestamps for one user.
#[derive(Debug, Clone, Default)]
struct RequestRecord {
    timestamps: Vec<Instant>,
}

impl RequestRecord {
    /// Drop timestamps outside the window and return the remaining count.
    fn prune(&mut self, now: Instant, window: Duration) -> u32 {
        self.timestamps
            .retain(|&t| now.saturating_duration_since(t) < window);
        self.timestamps.len() as u32
    }

    /// Count timestamps inside the window without modifying the record.
    fn count_recent(&self, now: Instant, window: Duration) -> u32 {
        self.timestamps
            .iter()
            .filter(|&&t| now.saturating_duration_since(t) < window)
            .count() as u32
    }
}

/// Thread-safe per-user rate limiter.
///
/// Every user owns a list of request instants; entries older than the window
/// are pruned lazily whenever that user is checked. There is no background
/// sweeper.
#[derive(Debug)]
pub struct RateLimiter {
    records: RwLock<HashMap<String, RequestRecord>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Create a disabled rate limiter.
    pub fn disabled() -> Self {
        Self::new(RateLimitConfig::disabled())
    }

    /// Check if rate limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Check and record a request for `user_id`.
    ///
    /// Returns `Ok(remaining)` if allowed, `Err(retry_after)` if rate limited.
    /// A rejected request is not recorded.
    pub fn check(&self, user_id: &str) -> Result<u32, Duration> {
        if !self.config.enabled {
            return Ok(self.config.max_requests);
        }

        let now = Instant::now();
        let mut records = match self.records.write() {
            Ok(r) => r,
            Err(_) => return Ok(self.config.max_requests), // Fail open on lock error
        };

        if !records.contains_key(user_id) {
            self.evict_idle(&mut records, now);
        }

        let record = records.entry(user_id.to_string()).or_default();
        let current_count = record.prune(now, self.config.window);

        if current_count >= self.config.max_requests {
            let retry_after = record
                .timestamps
                .first()
                .map(|&t| {
                    self.config
                        .window
                        .saturating_sub(now.saturating_duration_since(t))
                })
                .unwrap_or(self.config.window);
            return Err(retry_after);
        }

        record.timestamps.push(now);
        Ok(self.config.max_requests - current_count - 1)
    }

    /// Whether a request from `user_id` is allowed now. Records it if so.
    pub fn is_allowed(&self, user_id: &str) -> bool {
        self.check(user_id).is_ok()
    }

    /// Requests left for `user_id` in the current window.
    pub fn remaining(&self, user_id: &str) -> u32 {
        if !self.config.enabled {
            return self.config.max_requests;
        }

        let now = Instant::now();
        let used = self
            .records
            .read()
            .ok()
            .and_then(|records| {
                records
                    .get(user_id)
                    .map(|r| r.count_recent(now, self.config.window))
            })
            .unwrap_or(0);

        self.config.max_requests.saturating_sub(used)
    }

    /// Drop users with no activity in the window once the map grows past
    /// `max_tracked_users`.
    fn evict_idle(&self, records: &mut HashMap<String, RequestRecord>, now: Instant) {
        if records.len() < self.config.max_tracked_users {
            return;
        }

        let window = self.config.window;
        records.retain(|_, record| {
            record
                .timestamps
                .last()
                .map(|&t| now.saturating_duration_since(t) < window)
                .unwrap_or(false)
        });

        if records.len() >= self.config.max_tracked_users {
            let mut entries: Vec<_> = records
                .iter()
                .map(|(user, r)| (user.clone(), r.timestamps.last().copied()))
                .collect();

            entries.sort_by_key(|(_, t)| *t);

            let to_remove = records.len() + 1 - self.config.max_tracked_users;
            for (user, _) in entries.into_iter().take(to_remove) {
                records.remove(&user);
            }
        }
    }

    /// Get current stats.
    pub fn stats(&self) -> RateLimitStats {
        let tracked_users = self.records.read().map(|r| r.len()).unwrap_or(0);
        RateLimitStats {
            tracked_users,
            max_requests: self.config.max_requests,
            window_secs: self.config.window.as_secs(),
            enabled: self.config.enabled,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Rate limit statistics.
#[derive(Debug, Clone)]
pub struct RateLimitStats {
    pub tracked_users: usize,
    pub max_requests: u32,
    pub window_secs: u64,
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_config_default() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 10);
        assert_eq!(config.window, Duration::from_secs(60));
        assert!(config.enabled);
    }

    #[test]
    fn test_rate_limit_config_custom() {
        let config = RateLimitConfig::custom(50, 30);
        assert_eq!(config.max_requests, 50);
        assert_eq!(config.window, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tenth_allowed_eleventh_blocked_then_window_slides() {
        let limiter = RateLimiter::default();

        for i in 1..=10 {
            assert!(limiter.is_allowed("user_a"), "request {} should be allowed", i);
        }
        assert!(!limiter.is_allowed("user_a"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.is_allowed("user_a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_is_sliding_not_bucketed() {
        let limiter = RateLimiter::new(RateLimitConfig::custom(2, 60));

        assert!(limiter.is_allowed("u"));
        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(limiter.is_allowed("u"));
        assert!(!limiter.is_allowed("u"));

        // First request leaves the window, second one is still inside it.
        tokio::time::advance(Duration::from_secs(21)).await;
        assert_eq!(limiter.remaining("u"), 1);
        assert!(limiter.is_allowed("u"));
        assert!(!limiter.is_allowed("u"));
    }

    #[test]
    fn test_rejection_does_not_consume_quota() {
        let limiter = RateLimiter::new(RateLimitConfig::custom(1, 60));

        assert!(limiter.is_allowed("u"));
        for _ in 0..5 {
            assert!(!limiter.is_allowed("u"));
        }
        assert_eq!(limiter.remaining("u"), 0);
    }

    #[test]
    fn test_rate_limiter_different_users() {
        let limiter = RateLimiter::new(RateLimitConfig::custom(2, 60));

        assert!(limiter.check("user_1").is_ok());
        assert!(limiter.check("user_1").is_ok());
        assert!(limiter.check("user_1").is_err());

        assert!(limiter.check("user_2").is_ok());
        assert!(limiter.check("user_2").is_ok());
        assert!(limiter.check("user_2").is_err());
    }

    #[test]
    fn test_rate_limiter_disabled() {
        let limiter = RateLimiter::disabled();

        for _ in 0..100 {
            assert!(limiter.is_allowed("u"));
        }
        assert_eq!(limiter.remaining("u"), 10);
    }

    #[test]
    fn test_remaining_bounds() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.remaining("fresh"), 10);

        for _ in 0..25 {
            limiter.is_allowed("busy");
            let remaining = limiter.remaining("busy");
            assert!(remaining <= 10);
        }
        assert_eq!(limiter.remaining("busy"), 0);
    }

    #[test]
    fn test_rate_limiter_remaining_count() {
        let limiter = RateLimiter::new(RateLimitConfig::custom(5, 60));

        assert_eq!(limiter.check("u").unwrap(), 4);
        assert_eq!(limiter.check("u").unwrap(), 3);
        assert_eq!(limiter.check("u").unwrap(), 2);
        assert_eq!(limiter.check("u").unwrap(), 1);
        assert_eq!(limiter.check("u").unwrap(), 0);
        assert!(limiter.check("u").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_points_at_oldest_request() {
        let limiter = RateLimiter::new(RateLimitConfig::custom(1, 60));

        assert!(limiter.check("u").is_ok());
        tokio::time::advance(Duration::from_secs(15)).await;

        let retry_after = limiter.check("u").unwrap_err();
        assert_eq!(retry_after, Duration::from_secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_users_evicted_when_map_is_full() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_tracked_users: 2,
            ..RateLimitConfig::custom(5, 60)
        });

        limiter.is_allowed("old");
        tokio::time::advance(Duration::from_secs(90)).await;
        limiter.is_allowed("recent");
        limiter.is_allowed("newcomer");

        let stats = limiter.stats();
        assert_eq!(stats.tracked_users, 2);
        assert_eq!(limiter.remaining("recent"), 4);
        assert_eq!(limiter.remaining("newcomer"), 4);
    }

    #[test]
    fn test_rate_limiter_stats() {
        let limiter = RateLimiter::new(RateLimitConfig::custom(10, 30));
        limiter.check("u").ok();

        let stats = limiter.stats();
        assert_eq!(stats.tracked_users, 1);
        assert_eq!(stats.max_requests, 10);
        assert_eq!(stats.window_secs, 30);
        assert!(stats.enabled);
    }
}
