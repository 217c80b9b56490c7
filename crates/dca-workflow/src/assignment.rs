//! # Assignment Engine
//!
//! Allocation hands a PENDING case to a manager's portfolio; assignment
//! hands an allocated case to one of that manager's agents. Batch
//! assignment processes each case on its own: one case failing never
//! rolls back or blocks another.

use dca_core::{Actor, CaseId, Principal, Role, UserId};
use dca_state::{Case, CaseAssignment, CaseStatus};
use serde::Serialize;

use crate::engine::{require_roles, CaseEngine};
use crate::error::WorkflowError;
use crate::lifecycle::{log_conflict, record_transition_metric};
use crate::store::{CaseCommit, CaseStore};

/// A case that was assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignedCase {
    pub case_id: CaseId,
    pub assignment_id: dca_core::AssignmentId,
    /// The agent who held the case before, on re-assignment.
    pub previous_agent_id: Option<UserId>,
}

/// A case the batch could not assign, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedCase {
    pub case_id: CaseId,
    pub error: WorkflowError,
}

/// Partitioned result of a batch assignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchAssignOutcome {
    pub succeeded: Vec<AssignedCase>,
    pub failed: Vec<FailedCase>,
}

impl BatchAssignOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<S: CaseStore> CaseEngine<S> {
    /// Allocate a PENDING case to `manager_id`.
    ///
    /// A MANAGER may only allocate to themselves.
    pub fn allocate(
        &self,
        case_id: CaseId,
        manager_id: UserId,
        actor: &Principal,
    ) -> Result<Case, WorkflowError> {
        require_roles(actor, &[Role::Manager, Role::Admin])?;
        if actor.role == Role::Manager && actor.id != manager_id {
            return Err(WorkflowError::Unauthorized(
                "managers may only allocate cases to themselves".into(),
            ));
        }
        self.load_manager(manager_id)?;

        let mut case = self.load_case(case_id)?;
        if case.status != CaseStatus::Pending {
            return Err(WorkflowError::AlreadyAllocated {
                case_id,
                status: case.status,
            });
        }

        let read_version = case.version;
        let now = self.now();
        case.assigned_manager_id = Some(manager_id);
        case.transition(CaseStatus::Allocated, &Actor::User(*actor), None, now)?;

        let receipt = self
            .store()
            .commit(CaseCommit::case_only(case, read_version, now))
            .map_err(|e| log_conflict(case_id, e.into()))?;

        tracing::info!(case = %case_id, manager = %manager_id, actor = %actor.id, "case allocated");
        record_transition_metric(CaseStatus::Allocated);
        Ok(receipt.case)
    }

    /// Assign each of `case_ids` to `agent_id` under `manager_id`.
    ///
    /// Caller-level problems (inactive actor, wrong role, an agent or
    /// manager that is unknown, inactive or holds another role) fail the
    /// whole call. Per-case problems land in
    /// [`BatchAssignOutcome::failed`] and leave that case untouched.
    pub fn assign(
        &self,
        case_ids: &[CaseId],
        agent_id: UserId,
        manager_id: UserId,
        actor: &Principal,
    ) -> Result<BatchAssignOutcome, WorkflowError> {
        require_roles(actor, &[Role::Manager, Role::Admin])?;
        if actor.role == Role::Manager && actor.id != manager_id {
            return Err(WorkflowError::Unauthorized(
                "managers may only assign their own cases".into(),
            ));
        }
        self.load_manager(manager_id)?;
        let agent = self.load_profile("agent", agent_id)?;
        if agent.role != Role::Agent {
            return Err(WorkflowError::not_found("agent", agent_id));
        }
        if !agent.is_active {
            return Err(WorkflowError::PreconditionFailed(format!(
                "agent {agent_id} is inactive"
            )));
        }

        let mut outcome = BatchAssignOutcome::default();
        for &case_id in case_ids {
            match self.assign_one(case_id, agent_id, manager_id, actor) {
                Ok(assigned) => outcome.succeeded.push(assigned),
                Err(error) => {
                    tracing::warn!(case = %case_id, agent = %agent_id, code = error.code(), %error, "case not assigned");
                    metrics::counter!("dca_assign_failures_total").increment(1);
                    outcome.failed.push(FailedCase { case_id, error });
                }
            }
        }
        tracing::info!(
            agent = %agent_id,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "batch assignment finished"
        );
        Ok(outcome)
    }

    /// An active MANAGER or ADMIN profile able to hold a portfolio.
    fn load_manager(&self, manager_id: UserId) -> Result<(), WorkflowError> {
        let manager = self.load_profile("manager", manager_id)?;
        if !matches!(manager.role, Role::Manager | Role::Admin) {
            return Err(WorkflowError::not_found("manager", manager_id));
        }
        if !manager.is_active {
            return Err(WorkflowError::PreconditionFailed(format!(
                "manager {manager_id} is inactive"
            )));
        }
        Ok(())
    }

    fn assign_one(
        &self,
        case_id: CaseId,
        agent_id: UserId,
        manager_id: UserId,
        actor: &Principal,
    ) -> Result<AssignedCase, WorkflowError> {
        let mut case = self.load_case(case_id)?;
        if actor.role == Role::Manager && case.assigned_manager_id != Some(actor.id) {
            return Err(WorkflowError::Unauthorized(format!(
                "{case_id} is outside the caller's scope"
            )));
        }

        let previous_agent_id = case.assigned_agent_id;
        match case.status {
            CaseStatus::Allocated => {}
            CaseStatus::Assigned if previous_agent_id == Some(agent_id) => {
                return Err(WorkflowError::AlreadyAssigned { case_id, agent_id });
            }
            CaseStatus::Assigned => {}
            other => return Err(WorkflowError::invalid_transition(other, CaseStatus::Assigned)),
        }
        if case.assigned_manager_id != Some(manager_id) {
            return Err(WorkflowError::PreconditionFailed(format!(
                "{case_id} is not allocated to manager {manager_id}"
            )));
        }

        let read_version = case.version;
        let now = self.now();
        case.assigned_agent_id = Some(agent_id);
        let from = case.status;
        case.transition(CaseStatus::Assigned, &Actor::User(*actor), None, now)?;

        let assignment = CaseAssignment::new(case_id, agent_id, actor.id, now);
        let assignment_id = assignment.id;
        let mut commit = CaseCommit::case_only(case, read_version, now);
        commit.assignment = Some(assignment);
        self.store()
            .commit(commit)
            .map_err(|e| log_conflict(case_id, e.into()))?;

        if from != CaseStatus::Assigned {
            record_transition_metric(CaseStatus::Assigned);
        }
        tracing::info!(case = %case_id, agent = %agent_id, previous = ?previous_agent_id, "case assigned");
        Ok(AssignedCase {
            case_id,
            assignment_id,
            previous_agent_id,
        })
    }
}
