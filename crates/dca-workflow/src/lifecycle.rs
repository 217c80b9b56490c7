//! # Lifecycle Operations
//!
//! The store-backed wrapper around [`Case::transition`]: scope check,
//! re-read, validate, commit at the version read.

use dca_core::{Actor, CaseId, Principal};
use dca_state::{Case, CaseAssignment, CaseStatus, TransitionOutcome};

use crate::engine::{require_modifiable, require_visible, require_writer, CaseEngine};
use crate::error::WorkflowError;
use crate::store::{CaseCommit, CaseStore};

impl<S: CaseStore> CaseEngine<S> {
    /// Read a case the caller is allowed to see.
    pub fn get_case(&self, id: CaseId, actor: &Principal) -> Result<Case, WorkflowError> {
        let case = self.load_case(id)?;
        require_visible(actor, &case)?;
        Ok(case)
    }

    /// Assignment history of a case the caller is allowed to see.
    pub fn case_assignments(
        &self,
        id: CaseId,
        actor: &Principal,
    ) -> Result<Vec<CaseAssignment>, WorkflowError> {
        self.get_case(id, actor)?;
        let mut history = self.store().assignments_for(id)?;
        history.sort_by_key(|a| a.assignment_date);
        Ok(history)
    }

    /// Move a case to `target`.
    ///
    /// A same-status request returns the case untouched without a commit,
    /// except CLOSED, which commits a fresh `updated_at`.
    ///
    /// Ownership is checked after the edge, role and precondition, so a
    /// MANAGER looking at the unallocated queue gets the same verdict an
    /// ADMIN would before being told the case is not theirs.
    pub fn transition(
        &self,
        case_id: CaseId,
        target: CaseStatus,
        actor: &Principal,
        note: Option<&str>,
    ) -> Result<Case, WorkflowError> {
        require_writer(actor)?;
        let mut case = self.load_case(case_id)?;
        require_visible(actor, &case)?;

        let read_version = case.version;
        let from = case.status;
        let now = self.now();
        let outcome = case.transition(target, &Actor::User(*actor), note, now)?;
        if outcome == TransitionOutcome::Unchanged {
            return Ok(case);
        }
        require_modifiable(actor, &case)?;

        let receipt = self
            .store()
            .commit(CaseCommit::case_only(case, read_version, now))
            .map_err(|e| log_conflict(case_id, e.into()))?;

        tracing::info!(case = %case_id, %from, to = %target, actor = %actor.id, "case transitioned");
        record_transition_metric(target);
        Ok(receipt.case)
    }
}

pub(crate) fn record_transition_metric(to: CaseStatus) {
    metrics::counter!("dca_transitions_total", "to" => to.as_str()).increment(1);
}

pub(crate) fn log_conflict(case_id: CaseId, err: WorkflowError) -> WorkflowError {
    if matches!(err, WorkflowError::ConcurrentModification { .. }) {
        tracing::warn!(case = %case_id, "lost optimistic-lock race");
        metrics::counter!("dca_conflicts_total").increment(1);
    }
    err
}

#[cfg(test)]
mod tests {
    use crate::testing::Fixture;
    use dca_core::{Clock, Role};
    use dca_state::CaseStatus;

    use crate::error::WorkflowError;
    use crate::store::CaseStore;

    #[test]
    fn manager_closes_resolved_case_and_reclose_restamps() {
        let fx = Fixture::new();
        let case = fx.resolved_case();
        let closed = fx
            .engine
            .transition(case.id, CaseStatus::Closed, &fx.manager, None)
            .unwrap();
        assert_eq!(closed.status, CaseStatus::Closed);

        fx.clock.advance_secs(30);
        let again = fx
            .engine
            .transition(case.id, CaseStatus::Closed, &fx.manager, None)
            .unwrap();
        assert_eq!(again.status, CaseStatus::Closed);
        assert!(again.updated_at > closed.updated_at);
        assert_eq!(again.version, closed.version + 1);
    }

    #[test]
    fn same_status_does_not_commit() {
        let fx = Fixture::new();
        let case = fx.assigned_case();
        let same = fx
            .engine
            .transition(case.id, CaseStatus::Assigned, &fx.manager, None)
            .unwrap();
        assert_eq!(same, case);
    }

    #[test]
    fn other_managers_case_is_out_of_scope() {
        let fx = Fixture::new();
        let case = fx.assigned_case();
        let stranger = fx.add_user(Role::Manager);
        let err = fx
            .engine
            .transition(case.id, CaseStatus::InProgress, &stranger, None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized(_)));
    }

    #[test]
    fn unallocated_case_gets_the_same_verdict_for_manager_and_admin() {
        let fx = Fixture::new();
        let case = fx.pending_case();
        let stranger = fx.add_user(Role::Manager);

        for actor in [&fx.admin, &fx.manager, &stranger] {
            let err = fx
                .engine
                .transition(case.id, CaseStatus::Allocated, actor, None)
                .unwrap_err();
            assert_eq!(err.code(), "PRECONDITION_FAILED", "{}", actor.role);

            let err = fx
                .engine
                .transition(case.id, CaseStatus::Resolved, actor, None)
                .unwrap_err();
            assert_eq!(err.code(), "INVALID_TRANSITION", "{}", actor.role);
        }

        let untouched = fx.engine.get_case(case.id, &fx.admin).unwrap();
        assert_eq!(untouched, case);
    }

    #[test]
    fn viewer_and_outside_agent_are_refused_before_the_edge() {
        let fx = Fixture::new();
        let case = fx.pending_case();
        for actor in [&fx.viewer, &fx.agent] {
            let err = fx
                .engine
                .transition(case.id, CaseStatus::Resolved, actor, None)
                .unwrap_err();
            assert_eq!(err.code(), "UNAUTHORIZED", "{}", actor.role);
        }
    }

    #[test]
    fn agent_escalates_and_manager_de_escalates() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();
        let escalated = fx
            .engine
            .transition(case.id, CaseStatus::Escalated, &fx.agent, Some("threatened legal action"))
            .unwrap();
        assert_eq!(escalated.status, CaseStatus::Escalated);

        let err = fx
            .engine
            .transition(case.id, CaseStatus::InProgress, &fx.agent, None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized(_)));

        let back = fx
            .engine
            .transition(case.id, CaseStatus::InProgress, &fx.manager, None)
            .unwrap();
        assert_eq!(back.status, CaseStatus::InProgress);
    }

    #[test]
    fn missing_case_is_not_found() {
        let fx = Fixture::new();
        let err = fx
            .engine
            .transition(dca_core::CaseId::new(), CaseStatus::Closed, &fx.admin, None)
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn stale_read_loses_the_race() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();
        // A second writer commits between our read and our write.
        let mut stale = fx.engine.get_case(case.id, &fx.admin).unwrap();
        fx.engine
            .transition(case.id, CaseStatus::Escalated, &fx.agent, Some("dispute"))
            .unwrap();

        let now = fx.clock.now();
        stale
            .transition(CaseStatus::Escalated, &dca_core::Actor::User(fx.admin), Some("x"), now)
            .unwrap();
        let err = fx
            .engine
            .store()
            .commit(crate::store::CaseCommit::case_only(stale, case.version, now))
            .unwrap_err();
        assert!(matches!(
            WorkflowError::from(err),
            WorkflowError::ConcurrentModification { .. }
        ));
    }
}
