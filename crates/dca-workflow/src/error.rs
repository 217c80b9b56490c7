//! # Workflow Errors
//!
//! Every expected business refusal is a variant here; only
//! [`WorkflowError::StoreUnavailable`] signals an exceptional condition.

use dca_core::{CaseId, UserId, ValidationError};
use dca_state::{CaseStatus, TransitionError};
use thiserror::Error;

/// Failure of a workflow operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    /// A referenced case, debtor, agent, manager or record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Role, scope or active-status check failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// No such edge in the lifecycle (or review) graph.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// A required field is absent for the requested change.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Allocation attempted on a case that is no longer PENDING.
    #[error("case {case_id} is already allocated (status {status})")]
    AlreadyAllocated { case_id: CaseId, status: CaseStatus },

    /// Assignment to the agent who already holds the case.
    #[error("case {case_id} is already assigned to {agent_id}")]
    AlreadyAssigned { case_id: CaseId, agent_id: UserId },

    /// Another writer committed first; re-read and retry.
    #[error("case {case_id} was modified concurrently")]
    ConcurrentModification { case_id: CaseId },

    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl WorkflowError {
    /// Machine-readable code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::PreconditionFailed(_) => "PRECONDITION_FAILED",
            Self::AlreadyAllocated { .. } => "ALREADY_ALLOCATED",
            Self::AlreadyAssigned { .. } => "ALREADY_ASSIGNED",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_transition(from: CaseStatus, to: CaseStatus) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl From<TransitionError> for WorkflowError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidTransition { from, to } => Self::invalid_transition(from, to),
            TransitionError::Unauthorized { .. } | TransitionError::InactivePrincipal => {
                Self::Unauthorized(err.to_string())
            }
            TransitionError::PreconditionFailed { .. } => Self::PreconditionFailed(err.to_string()),
        }
    }
}

/// Failure reported by a [`crate::store::CaseStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Expected version did not match the stored one.
    #[error("version conflict on {case_id}: expected {expected}, found {found}")]
    ConcurrentModification {
        case_id: CaseId,
        expected: u64,
        found: u64,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A unique key is already taken.
    #[error("duplicate {field}: {value}")]
    Duplicate { field: &'static str, value: String },

    /// The write would break a record invariant.
    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConcurrentModification { case_id, .. } => {
                Self::ConcurrentModification { case_id }
            }
            StoreError::NotFound { kind, id } => Self::NotFound { kind, id },
            StoreError::Duplicate { field, value } => {
                Self::Validation(ValidationError::invalid(field, format!("{value:?} already exists")))
            }
            StoreError::Rejected(reason) => Self::PreconditionFailed(reason),
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
        }
    }
}
