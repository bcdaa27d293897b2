//! User identifier type.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

/// Length of the random suffix.
const SUFFIX_LEN: usize = 11;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identifier of a client session, used as the rate-limit and log key.
///
/// Generated once per session and displayed as `user_<millis>_<suffix>`,
/// where `millis` is the creation time in Unix milliseconds and `suffix`
/// is a random base-36 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Generate a new user ID.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let digits = Uniform::from(0..BASE36.len());
        let suffix: String = digits
            .sample_iter(rand::thread_rng())
            .take(SUFFIX_LEN)
            .map(|i| BASE36[i] as char)
            .collect();
        Self(format!("user_{}_{}", millis, suffix))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time in Unix milliseconds.
    pub fn created_millis(&self) -> Option<i64> {
        self.0
            .strip_prefix("user_")
            .and_then(|rest| rest.split('_').next())
            .and_then(|millis| millis.parse().ok())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::generate()
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = InvalidUserId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s
            .strip_prefix("user_")
            .and_then(|rest| rest.split_once('_'))
            .map(|(millis, suffix)| {
                !millis.is_empty()
                    && millis.bytes().all(|b| b.is_ascii_digit())
                    && !suffix.is_empty()
                    && suffix
                        .bytes()
                        .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
            })
            .unwrap_or(false);

        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidUserId(s.to_string()))
        }
    }
}

/// A string that does not have the `user_<millis>_<suffix>` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidUserId(pub String);

impl fmt::Display for InvalidUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid user id: '{}'", self.0)
    }
}

impl std::error::Error for InvalidUserId {}
