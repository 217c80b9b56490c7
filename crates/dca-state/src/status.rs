//! # Case Status
//!
//! ```text
//! PENDING ──▶ ALLOCATED ──▶ ASSIGNED ──▶ IN_PROGRESS ──▶ RESOLVED ──▶ CLOSED
//!                                            │  ▲                       ▲
//!                                            ▼  │                       │
//!                                          ESCALATED ───────────────────┘
//! ```
//!
//! PENDING is initial and CLOSED is terminal. RESOLVED and ESCALATED are
//! semi-terminal: both lead to CLOSED, and ESCALATED may also fall back to
//! IN_PROGRESS on de-escalation.

use std::str::FromStr;

use dca_core::ValidationError;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a collection case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    /// Created by import or manual entry, not yet allocated.
    Pending,
    /// Allocated to a manager's portfolio.
    Allocated,
    /// Assigned to an agent for work.
    Assigned,
    /// The agent has started working the case.
    InProgress,
    /// Fully recovered, awaiting sign-off.
    Resolved,
    /// Escalated for manager attention.
    Escalated,
    /// Closed. Terminal.
    Closed,
}

impl CaseStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [CaseStatus; 7] = [
        Self::Pending,
        Self::Allocated,
        Self::Assigned,
        Self::InProgress,
        Self::Resolved,
        Self::Escalated,
        Self::Closed,
    ];

    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Allocated => "ALLOCATED",
            Self::Assigned => "ASSIGNED",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Escalated => "ESCALATED",
            Self::Closed => "CLOSED",
        }
    }

    /// No outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Only closure (and, for ESCALATED, de-escalation) remains.
    pub fn is_semi_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Escalated)
    }

    /// Whether a case in this status may carry an assigned agent.
    pub fn permits_agent(&self) -> bool {
        !matches!(self, Self::Pending | Self::Allocated)
    }

    /// Whether work on the case is finished (SLA no longer runs).
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ValidationError::invalid("status", format!("unknown status {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for status in CaseStatus::ALL {
            assert_eq!(status.as_str().parse::<CaseStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn only_closed_is_terminal() {
        let terminal: Vec<_> = CaseStatus::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![CaseStatus::Closed]);
    }

    #[test]
    fn agent_forbidden_before_assignment() {
        assert!(!CaseStatus::Pending.permits_agent());
        assert!(!CaseStatus::Allocated.permits_agent());
        assert!(CaseStatus::Assigned.permits_agent());
        assert!(CaseStatus::Closed.permits_agent());
    }

    #[test]
    fn unknown_status_rejected() {
        assert!("ARCHIVED".parse::<CaseStatus>().is_err());
        assert_eq!("in_progress".parse::<CaseStatus>().unwrap(), CaseStatus::InProgress);
    }
}
