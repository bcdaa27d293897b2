//! User roles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Persona the dashboard is acting for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// A banking customer.
    #[default]
    Client,
    /// A parent managing a family account.
    Parents,
    /// A relationship manager acting for clients.
    RelationManager,
}

impl UserRole {
    /// Label sent to the webhook as `user_type`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Client => "Client",
            Self::Parents => "Parents",
            Self::RelationManager => "Relation Manager",
        }
    }

    /// Numeric code used by the dashboard.
    pub fn code(&self) -> i64 {
        match self {
            Self::Client => 0,
            Self::Parents => 1,
            Self::RelationManager => 2,
        }
    }

    /// Parse a role from its code or a name such as `client`, `parents`,
    /// `rm` or `relation_manager`.
    pub fn parse(value: &str) -> Option<Self> {
        if let Ok(code) = value.parse::<i64>() {
            return Self::try_from(code).ok();
        }
        match value.to_ascii_lowercase().replace('-', "_").as_str() {
            "client" => Some(Self::Client),
            "parents" | "parent" => Some(Self::Parents),
            "rm" | "relation_manager" | "relationship_manager" => Some(Self::RelationManager),
            _ => None,
        }
    }
}

impl TryFrom<i64> for UserRole {
    type Error = GatewayError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Client),
            1 => Ok(Self::Parents),
            2 => Ok(Self::RelationManager),
            other => Err(GatewayError::InvalidUserRole(other)),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for role in [UserRole::Client, UserRole::Parents, UserRole::RelationManager] {
            assert_eq!(UserRole::try_from(role.code()).unwrap(), role);
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(
            UserRole::try_from(3),
            Err(GatewayError::InvalidUserRole(3))
        ));
        assert!(matches!(
            UserRole::try_from(-1),
            Err(GatewayError::InvalidUserRole(-1))
        ));
    }

    #[test]
    fn test_labels() {
        assert_eq!(UserRole::Client.label(), "Client");
        assert_eq!(UserRole::Parents.label(), "Parents");
        assert_eq!(UserRole::RelationManager.to_string(), "Relation Manager");
    }

    #[test]
    fn test_parse_names_and_codes() {
        assert_eq!(UserRole::parse("2"), Some(UserRole::RelationManager));
        assert_eq!(UserRole::parse("RM"), Some(UserRole::RelationManager));
        assert_eq!(UserRole::parse("relation-manager"), Some(UserRole::RelationManager));
        assert_eq!(UserRole::parse("Parents"), Some(UserRole::Parents));
        assert_eq!(UserRole::parse("client"), Some(UserRole::Client));
        assert_eq!(UserRole::parse("7"), None);
        assert_eq!(UserRole::parse("admin"), None);
    }
}
