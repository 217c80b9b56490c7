//! # Identity Newtypes
//!
//! One newtype per record kind. Each wraps a `Uuid`, serializes as the bare
//! UUID string, and displays with a kind prefix (`case:…`, `debtor:…`) so
//! log lines are unambiguous. Deserialization goes through `FromStr`, so an
//! id copied from a log line reads back as well as a bare UUID.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Unique identifier for a collection case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CaseId(pub Uuid);

/// Unique identifier for a debtor record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DebtorId(pub Uuid);

/// Unique identifier for a principal (admin, manager, agent, viewer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UserId(pub Uuid);

/// Unique identifier for a manager→agent assignment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AssignmentId(pub Uuid);

/// Unique identifier for an agent action ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ActionId(pub Uuid);

/// Unique identifier for a compliance violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ViolationId(pub Uuid);

/// Unique identifier for an allocation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RuleId(pub Uuid);

macro_rules! uuid_identifier {
    ($ty:ident, $prefix:literal) => {
        impl $ty {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            /// Accepts either the bare UUID or the prefixed display form.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|e| ValidationError::invalid($prefix, e.to_string()))
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_identifier!(CaseId, "case");
uuid_identifier!(DebtorId, "debtor");
uuid_identifier!(UserId, "user");
uuid_identifier!(AssignmentId, "assignment");
uuid_identifier!(ActionId, "action");
uuid_identifier!(ViolationId, "violation");
uuid_identifier!(RuleId, "rule");
