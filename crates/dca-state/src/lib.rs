//! # dca-state: Case Lifecycle State Machine
//!
//! Record types and the lifecycle rules that govern them.
//!
//! ## State Machines
//!
//! - **Case lifecycle** (`case`, `transition`): PENDING → ALLOCATED →
//!   ASSIGNED → IN_PROGRESS → RESOLVED/ESCALATED → CLOSED, with every edge
//!   declared once in [`TRANSITION_TABLE`] alongside its allowed roles and
//!   precondition.
//!
//! - **Violation review** (`violation`): OPEN → UNDER_REVIEW →
//!   RESOLVED/DISMISSED, forward-only.
//!
//! ## Records
//!
//! [`Debtor`], [`CaseAssignment`], [`AgentAction`] (hash-chained, immutable)
//! and [`UserProfile`]. Persistence and cross-record atomicity belong to
//! `dca-workflow`; nothing here performs I/O.

pub mod assignment;
pub mod case;
pub mod debtor;
pub mod ledger;
pub mod profile;
pub mod status;
pub mod transition;
pub mod violation;

// ─── Case lifecycle re-exports ───────────────────────────────────────
pub use case::{Case, CaseTransitionRecord, TransitionOutcome};
pub use status::CaseStatus;
pub use transition::{
    rule_for, valid_targets, Precondition, TransitionError, TransitionRule, TRANSITION_TABLE,
};

// ─── Record re-exports ───────────────────────────────────────────────
pub use assignment::CaseAssignment;
pub use debtor::{ContactDetails, Debtor};
pub use ledger::{
    verify_chain, ActionDraft, ActionOutcome, ActionType, AgentAction, ChainVerification,
    PaymentMethod,
};
pub use profile::UserProfile;
pub use violation::{ComplianceViolation, Severity, ViolationStatus};
