//! # Transition Table
//!
//! The single declarative source of truth for which status changes exist,
//! which roles may drive them, and what must hold on the case first.
//! Enforcement ([`crate::Case::transition`]), the CLI table dump, and the
//! integration-test matrix all read [`TRANSITION_TABLE`].
//!
//! ## Edges
//!
//! | From        | To          | Roles                  | Precondition           |
//! |-------------|-------------|------------------------|------------------------|
//! | PENDING     | ALLOCATED   | MANAGER, ADMIN         | manager assigned       |
//! | ALLOCATED   | ASSIGNED    | MANAGER, ADMIN         | agent assigned         |
//! | ASSIGNED    | IN_PROGRESS | AGENT, ADMIN           | none                   |
//! | IN_PROGRESS | RESOLVED    | AGENT, ADMIN, system   | recovered ≥ amount     |
//! | IN_PROGRESS | ESCALATED   | AGENT, MANAGER, ADMIN  | note attached          |
//! | ESCALATED   | IN_PROGRESS | MANAGER, ADMIN         | none                   |
//! | RESOLVED    | CLOSED      | MANAGER, ADMIN         | none                   |
//! | ESCALATED   | CLOSED      | MANAGER, ADMIN         | none                   |

use dca_core::{Actor, Role};
use serde::Serialize;
use thiserror::Error;

use crate::case::Case;
use crate::status::CaseStatus;

/// Field-level requirement checked before an edge is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Precondition {
    None,
    ManagerAssigned,
    AgentAssigned,
    FullyRecovered,
    NoteAttached,
}

impl Precondition {
    /// Check the requirement, returning the failure reason.
    pub fn check(&self, case: &Case, note: Option<&str>) -> Result<(), &'static str> {
        let ok = match self {
            Self::None => true,
            Self::ManagerAssigned => case.assigned_manager_id.is_some(),
            Self::AgentAssigned => case.assigned_agent_id.is_some(),
            Self::FullyRecovered => case.is_fully_recovered(),
            Self::NoteAttached => note.is_some_and(|n| !n.trim().is_empty()),
        };
        if ok {
            Ok(())
        } else {
            Err(self.describe())
        }
    }

    /// Human-readable requirement.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::None => "no requirement",
            Self::ManagerAssigned => "assigned_manager_id must be set",
            Self::AgentAssigned => "assigned_agent_id must be set",
            Self::FullyRecovered => "recovered_amount must reach amount",
            Self::NoteAttached => "a non-empty note must be attached",
        }
    }
}

/// One edge of the lifecycle graph.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TransitionRule {
    pub from: CaseStatus,
    pub to: CaseStatus,
    pub roles: &'static [Role],
    /// Whether the engine may take this edge with no human principal.
    pub system: bool,
    pub precondition: Precondition,
}

impl TransitionRule {
    /// Whether `actor` is listed for this edge.
    pub fn permits(&self, actor: &Actor) -> bool {
        match actor {
            Actor::User(p) => self.roles.contains(&p.role),
            Actor::System => self.system,
        }
    }
}

const MANAGEMENT: &[Role] = &[Role::Manager, Role::Admin];

/// Every legal status change.
pub const TRANSITION_TABLE: &[TransitionRule] = &[
    TransitionRule {
        from: CaseStatus::Pending,
        to: CaseStatus::Allocated,
        roles: MANAGEMENT,
        system: false,
        precondition: Precondition::ManagerAssigned,
    },
    TransitionRule {
        from: CaseStatus::Allocated,
        to: CaseStatus::Assigned,
        roles: MANAGEMENT,
        system: false,
        precondition: Precondition::AgentAssigned,
    },
    TransitionRule {
        from: CaseStatus::Assigned,
        to: CaseStatus::InProgress,
        roles: &[Role::Agent, Role::Admin],
        system: false,
        precondition: Precondition::None,
    },
    TransitionRule {
        from: CaseStatus::InProgress,
        to: CaseStatus::Resolved,
        roles: &[Role::Agent, Role::Admin],
        system: true,
        precondition: Precondition::FullyRecovered,
    },
    TransitionRule {
        from: CaseStatus::InProgress,
        to: CaseStatus::Escalated,
        roles: &[Role::Agent, Role::Manager, Role::Admin],
        system: false,
        precondition: Precondition::NoteAttached,
    },
    TransitionRule {
        from: CaseStatus::Escalated,
        to: CaseStatus::InProgress,
        roles: MANAGEMENT,
        system: false,
        precondition: Precondition::None,
    },
    TransitionRule {
        from: CaseStatus::Resolved,
        to: CaseStatus::Closed,
        roles: MANAGEMENT,
        system: false,
        precondition: Precondition::None,
    },
    TransitionRule {
        from: CaseStatus::Escalated,
        to: CaseStatus::Closed,
        roles: MANAGEMENT,
        system: false,
        precondition: Precondition::None,
    },
];

/// Look up the edge `from → to`.
pub fn rule_for(from: CaseStatus, to: CaseStatus) -> Option<&'static TransitionRule> {
    TRANSITION_TABLE.iter().find(|r| r.from == from && r.to == to)
}

/// Statuses reachable in one step from `from`.
pub fn valid_targets(from: CaseStatus) -> Vec<CaseStatus> {
    TRANSITION_TABLE
        .iter()
        .filter(|r| r.from == from)
        .map(|r| r.to)
        .collect()
}

/// Roles allowed to re-confirm CLOSED (the only self-edge with side effects).
pub fn closing_roles() -> &'static [Role] {
    MANAGEMENT
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Why a transition was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// No such edge in the table.
    #[error("invalid case transition: {from} -> {to}")]
    InvalidTransition { from: CaseStatus, to: CaseStatus },

    /// The edge exists but the actor is not listed for it.
    #[error("{actor} may not move a case {from} -> {to}")]
    Unauthorized {
        actor: &'static str,
        from: CaseStatus,
        to: CaseStatus,
    },

    /// The principal is deactivated.
    #[error("principal is inactive")]
    InactivePrincipal,

    /// A required field is absent.
    #[error("precondition failed for {from} -> {to}: {reason}")]
    PreconditionFailed {
        from: CaseStatus,
        to: CaseStatus,
        reason: &'static str,
    },
}
