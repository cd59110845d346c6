//! Who is calling.

use crate::MarketError;
use gebeya_commerce::UserId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Buyer or seller account.
    #[default]
    Member,
    /// Marketplace administrator.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "member" | "user" | "buyer" | "seller" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            other => Err(MarketError::Validation(format!("unknown role: {}", other))),
        }
    }
}

/// An authenticated caller. Authentication itself happens upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user: UserId,
    pub role: Role,
}

impl Actor {
    pub fn member(user: impl Into<UserId>) -> Self {
        Self {
            user: user.into(),
            role: Role::Member,
        }
    }

    pub fn admin(user: impl Into<UserId>) -> Self {
        Self {
            user: user.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with `Forbidden` unless this is an admin.
    pub fn require_admin(&self, operation: &str) -> Result<(), MarketError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(MarketError::Forbidden(format!("{} requires an admin", operation)))
        }
    }
}
