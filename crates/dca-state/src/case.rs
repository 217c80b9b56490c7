//! # Case Record and Lifecycle Enforcement
//!
//! [`Case::transition`] is the only way a status changes. It checks, in
//! order: active principal, self-edge handling, edge existence, role,
//! precondition. A refused transition leaves every field untouched.

use dca_core::{Actor, CaseId, DebtorId, Money, Priority, Timestamp, UserId, ValidationError};
use serde::{Deserialize, Serialize};

use crate::status::CaseStatus;
use crate::transition::{closing_roles, rule_for, TransitionError};

/// One committed status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseTransitionRecord {
    pub from_state: CaseStatus,
    pub to_state: CaseStatus,
    /// `None` when the engine drove the change.
    pub actor: Option<UserId>,
    pub timestamp: Timestamp,
    pub note: Option<String>,
}

/// What a successful call to [`Case::transition`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Status changed.
    Applied,
    /// Target equalled the current status; nothing changed.
    Unchanged,
    /// Re-closing a CLOSED case; only `updated_at` moved.
    Restamped,
}

/// A debt-collection case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    /// Unique, human-readable reference.
    pub case_number: String,
    pub debtor_id: DebtorId,
    /// Original debt. Fixed at creation.
    pub amount: Money,
    /// Sum of applied payments. Never decreases.
    pub recovered_amount: Money,
    pub status: CaseStatus,
    pub priority: Priority,
    pub assigned_manager_id: Option<UserId>,
    pub assigned_agent_id: Option<UserId>,
    pub sla_due_date: Option<Timestamp>,
    /// When the debt fell due; drives days-overdue scoring.
    pub due_date: Option<Timestamp>,
    pub created_by: Option<UserId>,
    pub last_contact_at: Option<Timestamp>,
    pub next_follow_up: Option<Timestamp>,
    pub escalation_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Bumped by the store on every commit.
    pub version: u64,
    pub transitions: Vec<CaseTransitionRecord>,
}

impl Case {
    /// Open a new PENDING case.
    pub fn open(
        case_number: impl Into<String>,
        debtor_id: DebtorId,
        amount: Money,
        priority: Priority,
        created_by: Option<UserId>,
        at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let case_number = case_number.into();
        dca_core::error::require_non_empty("case_number", &case_number)?;
        amount.require_positive("amount")?;
        Ok(Self {
            id: CaseId::new(),
            case_number: case_number.trim().to_string(),
            debtor_id,
            amount,
            recovered_amount: Money::ZERO,
            status: CaseStatus::Pending,
            priority,
            assigned_manager_id: None,
            assigned_agent_id: None,
            sla_due_date: None,
            due_date: None,
            created_by,
            last_contact_at: None,
            next_follow_up: None,
            escalation_reason: None,
            created_at: at,
            updated_at: at,
            version: 0,
            transitions: Vec::new(),
        })
    }

    /// Amount still owed, floored at zero.
    pub fn outstanding(&self) -> Money {
        self.amount.saturating_sub_floor_zero(self.recovered_amount)
    }

    /// `recovered_amount >= amount`.
    pub fn is_fully_recovered(&self) -> bool {
        self.recovered_amount >= self.amount
    }

    /// SLA deadline passed while the case is still open.
    pub fn is_sla_breached(&self, now: Timestamp) -> bool {
        !self.status.is_settled() && self.sla_due_date.is_some_and(|due| due < now)
    }

    /// Add a payment to `recovered_amount`. Returns the new total.
    pub fn credit(&mut self, amount: Money, at: Timestamp) -> Result<Money, ValidationError> {
        amount.require_positive("payment amount")?;
        let total = self.recovered_amount.checked_add(amount)?;
        self.recovered_amount = total;
        self.updated_at = at;
        Ok(total)
    }

    /// Move the case to `target` on behalf of `actor`.
    ///
    /// `note` is required for escalation and recorded on every edge.
    pub fn transition(
        &mut self,
        target: CaseStatus,
        actor: &Actor,
        note: Option<&str>,
        at: Timestamp,
    ) -> Result<TransitionOutcome, TransitionError> {
        if let Actor::User(p) = actor {
            if !p.is_active {
                return Err(TransitionError::InactivePrincipal);
            }
        }

        if target == self.status {
            if target != CaseStatus::Closed {
                return Ok(TransitionOutcome::Unchanged);
            }
            let allowed = match actor {
                Actor::User(p) => closing_roles().contains(&p.role),
                Actor::System => false,
            };
            if !allowed {
                return Err(TransitionError::Unauthorized {
                    actor: actor.label(),
                    from: self.status,
                    to: target,
                });
            }
            self.updated_at = at;
            return Ok(TransitionOutcome::Restamped);
        }

        let rule = rule_for(self.status, target).ok_or(TransitionError::InvalidTransition {
            from: self.status,
            to: target,
        })?;

        if !rule.permits(actor) {
            return Err(TransitionError::Unauthorized {
                actor: actor.label(),
                from: self.status,
                to: target,
            });
        }

        rule.precondition
            .check(self, note)
            .map_err(|reason| TransitionError::PreconditionFailed {
                from: self.status,
                to: target,
                reason,
            })?;

        self.do_transition(target, actor, note, at);
        Ok(TransitionOutcome::Applied)
    }

    /// First broken structural invariant, if any.
    pub fn invariant_violation(&self) -> Option<&'static str> {
        if self.assigned_agent_id.is_some() && !self.status.permits_agent() {
            return Some("assigned_agent_id set while PENDING or ALLOCATED");
        }
        if self.status != CaseStatus::Pending && self.assigned_manager_id.is_none() {
            return Some("case past PENDING without a manager");
        }
        if self.recovered_amount < Money::ZERO {
            return Some("recovered_amount is negative");
        }
        if !self.amount.is_positive() {
            return Some("amount must be positive");
        }
        None
    }

    fn do_transition(&mut self, to: CaseStatus, actor: &Actor, note: Option<&str>, at: Timestamp) {
        let note = note.map(str::trim).filter(|n| !n.is_empty()).map(String::from);
        match to {
            CaseStatus::Escalated => {
                self.priority = Priority::Critical;
                self.escalation_reason = note.clone();
            }
            CaseStatus::InProgress if self.status == CaseStatus::Escalated => {
                self.escalation_reason = None;
            }
            _ => {}
        }
        self.transitions.push(CaseTransitionRecord {
            from_state: self.status,
            to_state: to,
            actor: actor.user_id(),
            timestamp: at,
            note,
        });
        self.status = to;
        self.updated_at = at;
    }
}
