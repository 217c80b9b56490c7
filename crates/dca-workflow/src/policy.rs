//! # Workflow Policy
//!
//! Tunables the engines read: SLA windows per priority and the fallback
//! manager for auto-allocation. Loadable from YAML; every field defaults.
//!
//! ```yaml
//! sla_days:
//!   critical: 3
//!   high: 7
//!   medium: 14
//!   low: 30
//! default_manager_id: 6f1c0e8e-2a7d-4d3b-9a51-0c3f1f2b7a10
//! ```

use std::path::Path;

use dca_core::{Priority, Timestamp, UserId, ValidationError};
use serde::{Deserialize, Serialize};

/// Days from case creation to SLA due date, per priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaDays {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

impl Default for SlaDays {
    fn default() -> Self {
        Self {
            critical: 3,
            high: 7,
            medium: 14,
            low: 30,
        }
    }
}

impl SlaDays {
    pub fn for_priority(&self, priority: Priority) -> u32 {
        match priority {
            Priority::Critical => self.critical,
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }
}

/// Engine policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub sla_days: SlaDays,
    /// Manager receiving PENDING cases that no allocation rule matches.
    pub default_manager_id: Option<UserId>,
}

impl PolicyConfig {
    /// SLA due date for a case of `priority` created at `created_at`.
    pub fn sla_due(&self, priority: Priority, created_at: Timestamp) -> Timestamp {
        created_at.plus_days(i64::from(self.sla_days.for_priority(priority)))
    }

    /// Parse from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ValidationError> {
        serde_yaml::from_str(text).map_err(|e| ValidationError::invalid("policy", e.to_string()))
    }

    /// Load from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ValidationError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::invalid("policy", format!("{}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }
}
