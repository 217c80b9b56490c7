//! Compliance violations raised by review of the action ledger.
//! Reviews move a violation forward; ledger entries are never touched.

use dca_core::{ActionId, CaseId, Timestamp, UserId, ViolationId};
use serde::{Deserialize, Serialize};

/// How serious a violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationStatus {
    Open,
    UnderReview,
    Resolved,
    Dismissed,
}

impl ViolationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::UnderReview => "UNDER_REVIEW",
            Self::Resolved => "RESOLVED",
            Self::Dismissed => "DISMISSED",
        }
    }

    /// Reviewed to a final verdict.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Resolved | Self::Dismissed)
    }

    /// Reviews only move forward.
    pub fn can_move_to(&self, target: ViolationStatus) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::UnderReview)
                | (Self::Open, Self::Resolved)
                | (Self::Open, Self::Dismissed)
                | (Self::UnderReview, Self::Resolved)
                | (Self::UnderReview, Self::Dismissed)
        )
    }
}

impl std::fmt::Display for ViolationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flagged breach of collection conduct rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceViolation {
    pub id: ViolationId,
    pub case_id: CaseId,
    pub agent_id: UserId,
    pub action_id: Option<ActionId>,
    /// Free-form category, e.g. `CALL_OUTSIDE_HOURS`.
    pub violation_type: String,
    pub severity: Severity,
    pub description: String,
    pub status: ViolationStatus,
    pub occurred_at: Timestamp,
    pub flagged_by: UserId,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<Timestamp>,
    pub resolution_notes: Option<String>,
}

impl ComplianceViolation {
    /// Hours from occurrence to final review, for closed violations.
    pub fn resolution_hours(&self) -> Option<f64> {
        if !self.status.is_closed() {
            return None;
        }
        self.reviewed_at
            .map(|reviewed| reviewed.secs_since(&self.occurred_at) as f64 / 3600.0)
    }
}
