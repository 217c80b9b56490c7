//! # dca-workflow: Case Workflow Engines
//!
//! Everything that changes a case goes through [`CaseEngine`]. The engine
//! re-reads state from a [`CaseStore`], validates against the lifecycle
//! table in `dca-state`, and commits one single-case unit of work at the
//! version it read.
//!
//! ## Modules
//!
//! - [`store`]: the store trait, the in-memory implementation and the
//!   per-case compare-and-swap commit.
//! - [`assignment`]: manager allocation and batch agent assignment.
//! - [`payment`]: payment application and automatic resolution.
//! - [`compliance`]: the action ledger, compliance rate and violations.
//! - [`allocation`]: routing rules and recovery scoring.
//! - [`intake`]: debtors, manual case entry and bulk import.
//! - [`worklist`]: role-scoped listings and summary counters.
//! - [`policy`]: SLA days and the default manager.

pub mod allocation;
pub mod assignment;
pub mod compliance;
pub mod engine;
pub mod error;
pub mod intake;
pub mod lifecycle;
pub mod payment;
pub mod policy;
pub mod store;
pub mod worklist;

#[cfg(test)]
pub(crate) mod testing;

// ─── Engine re-exports ──────────────────────────────────────────────

pub use engine::{can_modify, can_view, CaseEngine};
pub use error::{StoreError, WorkflowError};
pub use policy::{PolicyConfig, SlaDays};
pub use store::{CaseCommit, CaseStore, CommitReceipt, MemoryStore, Snapshot};

// ─── Operation types re-exports ─────────────────────────────────────

pub use allocation::{
    recovery_probability, AllocatedCase, AllocationRule, AllocationRun, NewRule, RuleKind,
    UnallocatedCase,
};
pub use assignment::{AssignedCase, BatchAssignOutcome, FailedCase};
pub use compliance::{
    compliance_rate, ComplianceRate, ComplianceScope, ComplianceSummary, NewViolation,
};
pub use intake::{default_case_number, ImportReport, ImportRow, ImportStatus, NewCase, RowError};
pub use payment::{PaymentReceipt, PaymentRequest};
pub use worklist::{CaseQuery, WorklistSummary};
