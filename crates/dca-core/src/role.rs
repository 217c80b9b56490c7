//! # Roles and Principals
//!
//! The identity provider is external; what reaches the engines is a
//! [`Principal`] carrying the user id, one [`Role`], and the active flag
//! from the stored profile. Lifecycle transitions additionally accept
//! [`Actor::System`] for edges the payment engine drives on its own.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::UserId;

/// Role granted to a principal by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full access to every case and operation.
    Admin,
    /// Allocates and assigns cases within their own portfolio.
    Manager,
    /// Works assigned cases: contacts, payments, escalations.
    Agent,
    /// Read-only.
    Viewer,
}

impl Role {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Manager => "MANAGER",
            Self::Agent => "AGENT",
            Self::Viewer => "VIEWER",
        }
    }

    /// Whether the role may perform any mutating operation at all.
    pub fn can_write(&self) -> bool {
        !matches!(self, Self::Viewer)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "MANAGER" => Ok(Self::Manager),
            "AGENT" => Ok(Self::Agent),
            "VIEWER" => Ok(Self::Viewer),
            other => Err(ValidationError::invalid("role", format!("unknown role {other:?}"))),
        }
    }
}

/// The authenticated caller of an engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
    pub is_active: bool,
}

impl Principal {
    /// An active principal.
    pub fn active(id: UserId, role: Role) -> Self {
        Self {
            id,
            role,
            is_active: true,
        }
    }

    /// Active and not a viewer.
    pub fn can_write(&self) -> bool {
        self.is_active && self.role.can_write()
    }
}

/// Who is driving a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// A human principal.
    User(Principal),
    /// The engine itself (payment-driven resolution).
    System,
}

impl Actor {
    /// The principal's user id, `None` for the system actor.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(p) => Some(p.id),
            Self::System => None,
        }
    }

    /// Label used in logs and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User(p) => p.role.as_str(),
            Self::System => "SYSTEM",
        }
    }
}

impl From<Principal> for Actor {
    fn from(p: Principal) -> Self {
        Self::User(p)
    }
}
