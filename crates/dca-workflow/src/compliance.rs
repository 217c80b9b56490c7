//! # Compliance / Audit Ledger
//!
//! Agent actions are appended to the hash-chained ledger and never
//! changed. Compliance figures are derived from the ledger on every
//! query; nothing here stores a running percentage.
//!
//! Violations are a separate register: flagging or reviewing one leaves
//! the referenced ledger entry exactly as it was written.

use dca_core::{ActionId, CaseId, Principal, Role, UserId, ViolationId};
use dca_state::{
    verify_chain, ActionDraft, ActionType, AgentAction, Case, CaseStatus, ChainVerification,
    ComplianceViolation, Severity, ViolationStatus,
};
use serde::{Deserialize, Serialize};

use crate::engine::{require_active, require_modifiable, require_roles, require_writer, CaseEngine};
use crate::error::WorkflowError;
use crate::lifecycle::{log_conflict, record_transition_metric};
use crate::store::{CaseCommit, CaseStore};

/// Which actions a compliance figure covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceScope {
    All,
    /// Actions on cases whose `assigned_manager_id` is this manager.
    Manager(UserId),
    Agent(UserId),
    Case(CaseId),
}

/// Compliant share of a set of actions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRate {
    pub total: usize,
    pub compliant: usize,
    /// Percentage, 0–100. 100 when there are no actions.
    pub rate: f64,
}

/// Rate plus violation counts for a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceSummary {
    pub scope: ComplianceScope,
    pub rate: ComplianceRate,
    pub total_violations: usize,
    pub open_violations: usize,
    pub critical_open_violations: usize,
    /// Mean hours from occurrence to final review over closed violations.
    pub avg_resolution_hours: Option<f64>,
}

/// Input for flagging a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewViolation {
    pub case_id: CaseId,
    pub agent_id: UserId,
    pub action_id: Option<ActionId>,
    pub violation_type: String,
    pub severity: Severity,
    pub description: String,
}

/// `compliant / total * 100`, or 100 over an empty set.
pub fn compliance_rate<'a>(actions: impl IntoIterator<Item = &'a AgentAction>) -> ComplianceRate {
    let (total, compliant) = actions
        .into_iter()
        .fold((0usize, 0usize), |(t, c), a| (t + 1, c + usize::from(a.compliant())));
    let rate = if total == 0 {
        100.0
    } else {
        compliant as f64 / total as f64 * 100.0
    };
    ComplianceRate {
        total,
        compliant,
        rate,
    }
}

fn in_scope(scope: &ComplianceScope, case: Option<&Case>, case_id: CaseId, agent_id: UserId) -> bool {
    match scope {
        ComplianceScope::All => true,
        ComplianceScope::Manager(m) => case.is_some_and(|c| c.assigned_manager_id == Some(*m)),
        ComplianceScope::Agent(a) => agent_id == *a,
        ComplianceScope::Case(id) => case_id == *id,
    }
}

impl<S: CaseStore> CaseEngine<S> {
    /// Append an agent action to the ledger.
    ///
    /// The agent's first action on an ASSIGNED case starts work on it.
    /// Reached contacts stamp `last_contact_at`; a supplied follow-up date
    /// replaces `next_follow_up`. PAYMENT actions go through
    /// [`CaseEngine::apply_payment`] instead. A CLOSED case takes no
    /// further actions.
    pub fn record_action(
        &self,
        draft: ActionDraft,
        actor: &Principal,
    ) -> Result<AgentAction, WorkflowError> {
        require_writer(actor)?;
        draft.validate()?;
        if draft.action_type == ActionType::Payment {
            return Err(WorkflowError::Validation(dca_core::ValidationError::invalid(
                "action_type",
                "payments are recorded through the payment engine",
            )));
        }

        let case_id = draft.case_id;
        let mut case = self.load_case(case_id)?;
        let agent = self.load_profile("agent", draft.agent_id)?;
        require_modifiable(actor, &case)?;
        if actor.role == Role::Agent && draft.agent_id != actor.id {
            return Err(WorkflowError::Unauthorized(
                "agents may only record their own actions".into(),
            ));
        }
        if case.status == CaseStatus::Closed {
            return Err(WorkflowError::PreconditionFailed(format!("{case_id} is closed")));
        }

        let read_version = case.version;
        let now = self.now();
        let mut started = false;
        let by_assigned_agent = case.assigned_agent_id == Some(agent.id);
        if case.status == CaseStatus::Assigned
            && by_assigned_agent
            && matches!(actor.role, Role::Agent | Role::Admin)
        {
            case.transition(CaseStatus::InProgress, &dca_core::Actor::User(*actor), None, now)?;
            started = true;
        }
        if draft.outcome.is_some_and(|o| o.is_contact()) {
            case.last_contact_at = Some(now);
        }
        if let Some(follow_up) = draft.next_follow_up {
            case.next_follow_up = Some(follow_up);
        }
        case.updated_at = now;

        let mut commit = CaseCommit::case_only(case, read_version, now);
        commit.actions.push(draft);
        let mut receipt = self
            .store()
            .commit(commit)
            .map_err(|e| log_conflict(case_id, e.into()))?;

        if started {
            record_transition_metric(CaseStatus::InProgress);
        }
        let entry = receipt.actions.pop().ok_or_else(|| {
            WorkflowError::StoreUnavailable("commit returned no ledger entry".into())
        })?;
        tracing::info!(
            case = %case_id,
            agent = %entry.agent_id(),
            action = entry.draft.action_type.as_str(),
            compliant = entry.compliant(),
            started,
            "action recorded"
        );
        Ok(entry)
    }

    /// Ledger entries for a case the caller can see, oldest first.
    pub fn case_actions(
        &self,
        case_id: CaseId,
        actor: &Principal,
    ) -> Result<Vec<AgentAction>, WorkflowError> {
        self.get_case(case_id, actor)?;
        Ok(self.store().actions_for_case(case_id)?)
    }

    /// Compliance rate over `scope`, recomputed from the ledger.
    pub fn compliance_rate(
        &self,
        scope: ComplianceScope,
        actor: &Principal,
    ) -> Result<ComplianceRate, WorkflowError> {
        authorize_scope(actor, &scope)?;
        let cases = self.case_index()?;
        let actions = self.store().actions()?;
        let rate = compliance_rate(
            actions
                .iter()
                .filter(|a| in_scope(&scope, cases.get(&a.case_id()), a.case_id(), a.agent_id())),
        );
        tracing::debug!(?scope, total = rate.total, rate = rate.rate, "compliance rate computed");
        Ok(rate)
    }

    /// Rate plus violation counts and review turnaround for `scope`.
    pub fn compliance_summary(
        &self,
        scope: ComplianceScope,
        actor: &Principal,
    ) -> Result<ComplianceSummary, WorkflowError> {
        let rate = self.compliance_rate(scope, actor)?;
        let cases = self.case_index()?;
        let violations: Vec<_> = self
            .store()
            .violations()?
            .into_iter()
            .filter(|v| in_scope(&scope, cases.get(&v.case_id), v.case_id, v.agent_id))
            .collect();

        let open: Vec<_> = violations.iter().filter(|v| !v.status.is_closed()).collect();
        let hours: Vec<f64> = violations.iter().filter_map(|v| v.resolution_hours()).collect();
        let avg_resolution_hours = if hours.is_empty() {
            None
        } else {
            Some(hours.iter().sum::<f64>() / hours.len() as f64)
        };

        Ok(ComplianceSummary {
            scope,
            rate,
            total_violations: violations.len(),
            open_violations: open.len(),
            critical_open_violations: open
                .iter()
                .filter(|v| v.severity == Severity::Critical)
                .count(),
            avg_resolution_hours,
        })
    }

    /// Walk the whole ledger and check every hash link. MANAGER or ADMIN.
    pub fn verify_ledger(&self, actor: &Principal) -> Result<ChainVerification, WorkflowError> {
        require_roles(actor, &[Role::Manager, Role::Admin])?;
        let result = verify_chain(&self.store().actions()?);
        if !result.chain_valid {
            tracing::error!(
                broken = result.broken_links,
                tampered = result.tampered_entries,
                "action ledger failed verification"
            );
        }
        Ok(result)
    }

    /// Flag a violation against an agent's conduct on a case. MANAGER or ADMIN.
    pub fn flag_violation(
        &self,
        input: NewViolation,
        actor: &Principal,
    ) -> Result<ComplianceViolation, WorkflowError> {
        require_roles(actor, &[Role::Manager, Role::Admin])?;
        dca_core::error::require_non_empty("violation_type", &input.violation_type)?;
        dca_core::error::require_non_empty("description", &input.description)?;

        let case = self.load_case(input.case_id)?;
        require_modifiable(actor, &case)?;
        self.load_profile("agent", input.agent_id)?;

        let occurred_at = match input.action_id {
            Some(action_id) => {
                let entry = self
                    .store()
                    .actions_for_case(input.case_id)?
                    .into_iter()
                    .find(|a| a.id == action_id)
                    .ok_or_else(|| WorkflowError::not_found("action", action_id))?;
                entry.created_at
            }
            None => self.now(),
        };

        let violation = ComplianceViolation {
            id: ViolationId::new(),
            case_id: input.case_id,
            agent_id: input.agent_id,
            action_id: input.action_id,
            violation_type: input.violation_type.trim().to_string(),
            severity: input.severity,
            description: input.description.trim().to_string(),
            status: ViolationStatus::Open,
            occurred_at,
            flagged_by: actor.id,
            reviewed_by: None,
            reviewed_at: None,
            resolution_notes: None,
        };
        let saved = self.store().put_violation(violation)?;
        tracing::warn!(
            violation = %saved.id,
            case = %saved.case_id,
            agent = %saved.agent_id,
            severity = ?saved.severity,
            "compliance violation flagged"
        );
        Ok(saved)
    }

    /// Move a violation forward in review. MANAGER or ADMIN.
    pub fn review_violation(
        &self,
        id: ViolationId,
        target: ViolationStatus,
        notes: Option<String>,
        actor: &Principal,
    ) -> Result<ComplianceViolation, WorkflowError> {
        require_roles(actor, &[Role::Manager, Role::Admin])?;
        let mut violation = self
            .store()
            .violation(id)?
            .ok_or_else(|| WorkflowError::not_found("violation", id))?;
        let case = self.load_case(violation.case_id)?;
        require_modifiable(actor, &case)?;

        if !violation.status.can_move_to(target) {
            return Err(WorkflowError::InvalidTransition {
                from: violation.status.to_string(),
                to: target.to_string(),
            });
        }
        violation.status = target;
        violation.reviewed_by = Some(actor.id);
        violation.reviewed_at = Some(self.now());
        if let Some(n) = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            violation.resolution_notes = Some(n);
        }
        let saved = self.store().put_violation(violation)?;
        tracing::info!(violation = %id, status = %saved.status, reviewer = %actor.id, "violation reviewed");
        Ok(saved)
    }

    fn case_index(&self) -> Result<std::collections::HashMap<CaseId, Case>, WorkflowError> {
        Ok(self
            .store()
            .cases()?
            .into_iter()
            .map(|c| (c.id, c))
            .collect())
    }
}

/// ADMIN and VIEWER may query any scope; managers and agents only their own.
fn authorize_scope(actor: &Principal, scope: &ComplianceScope) -> Result<(), WorkflowError> {
    require_active(actor)?;
    let allowed = match (actor.role, scope) {
        (Role::Admin | Role::Viewer, _) => true,
        (Role::Manager, ComplianceScope::Manager(id)) => *id == actor.id,
        (Role::Agent, ComplianceScope::Agent(id)) => *id == actor.id,
        _ => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized(format!(
            "{} may not read compliance for {scope:?}",
            actor.role
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use dca_core::{Money, Timestamp};
    use dca_state::ActionOutcome;

    fn sealed(compliant: bool) -> AgentAction {
        let mut d = ActionDraft::new(CaseId::new(), UserId::new(), ActionType::Call);
        d.compliant = compliant;
        AgentAction::seal(d, 1, dca_core::GENESIS_HASH, Timestamp::now())
    }

    fn call(fx: &Fixture, case_id: CaseId, compliant: bool) -> ActionDraft {
        let mut d = ActionDraft::new(case_id, fx.agent.id, ActionType::Call);
        d.outcome = Some(ActionOutcome::Rpc);
        d.compliant = compliant;
        d
    }

    // ── Pure rate ────────────────────────────────────────────────────

    #[test]
    fn empty_set_is_fully_compliant() {
        let r = compliance_rate(std::iter::empty());
        assert_eq!(r.total, 0);
        assert_eq!(r.rate, 100.0);
    }

    #[test]
    fn three_of_four_is_seventy_five() {
        let actions = vec![sealed(true), sealed(true), sealed(false), sealed(true)];
        let r = compliance_rate(&actions);
        assert_eq!((r.total, r.compliant), (4, 3));
        assert_eq!(r.rate, 75.0);
    }

    // ── record_action ────────────────────────────────────────────────

    #[test]
    fn first_action_starts_work() {
        let fx = Fixture::new();
        let case = fx.assigned_case();
        fx.engine.record_action(call(&fx, case.id, true), &fx.agent).unwrap();
        let stored = fx.engine.get_case(case.id, &fx.agent).unwrap();
        assert_eq!(stored.status, CaseStatus::InProgress);
        assert!(stored.last_contact_at.is_some());
    }

    #[test]
    fn no_contact_outcome_leaves_last_contact_alone() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();
        let mut d = call(&fx, case.id, true);
        d.outcome = Some(ActionOutcome::NoContact);
        d.next_follow_up = Some(fx.now().plus_days(2));
        fx.engine.record_action(d, &fx.agent).unwrap();
        let stored = fx.engine.get_case(case.id, &fx.agent).unwrap();
        assert!(stored.last_contact_at.is_none());
        assert_eq!(stored.next_follow_up, Some(fx.now().plus_days(2)));
    }

    #[test]
    fn missing_case_or_agent_is_not_found() {
        let fx = Fixture::new();
        let err = fx
            .engine
            .record_action(call(&fx, CaseId::new(), true), &fx.admin)
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        let case = fx.in_progress_case();
        let mut d = call(&fx, case.id, true);
        d.agent_id = UserId::new();
        let err = fx.engine.record_action(d, &fx.admin).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn payment_type_is_rejected_here() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();
        let mut d = ActionDraft::new(case.id, fx.agent.id, ActionType::Payment);
        d.payment_amount = Some(Money::from_major(5));
        assert!(matches!(
            fx.engine.record_action(d, &fx.agent),
            Err(WorkflowError::Validation(_))
        ));
    }

    #[test]
    fn closed_case_takes_no_actions() {
        let fx = Fixture::new();
        let case = fx.closed_case();
        let ledger_before = fx.engine.case_actions(case.id, &fx.admin).unwrap().len();
        fx.clock.advance_secs(60);

        let mut d = call(&fx, case.id, true);
        d.next_follow_up = Some(fx.now().plus_days(1));
        for actor in [&fx.agent, &fx.admin] {
            let err = fx.engine.record_action(d.clone(), actor).unwrap_err();
            assert_eq!(err.code(), "PRECONDITION_FAILED");
        }

        let stored = fx.engine.get_case(case.id, &fx.admin).unwrap();
        assert_eq!(stored, case);
        assert_eq!(
            fx.engine.case_actions(case.id, &fx.admin).unwrap().len(),
            ledger_before
        );
    }

    #[test]
    fn viewer_cannot_record() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();
        assert!(fx.engine.record_action(call(&fx, case.id, true), &fx.viewer).is_err());
    }

    // ── Scoped rate ──────────────────────────────────────────────────

    #[test]
    fn manager_scope_joins_through_case() {
        let fx = Fixture::new();
        let mine = fx.in_progress_case();
        for compliant in [true, true, false, true] {
            fx.engine.record_action(call(&fx, mine.id, compliant), &fx.agent).unwrap();
        }
        let other_manager = fx.add_user(Role::Manager);
        let other_agent = fx.add_user(Role::Agent);
        let theirs = fx.in_progress_case_for(&other_manager, &other_agent);
        let mut d = ActionDraft::new(theirs.id, other_agent.id, ActionType::Call);
        d.compliant = false;
        fx.engine.record_action(d, &other_agent).unwrap();

        let mine_rate = fx
            .engine
            .compliance_rate(ComplianceScope::Manager(fx.manager.id), &fx.manager)
            .unwrap();
        assert_eq!(mine_rate.total, 4);
        assert_eq!(mine_rate.rate, 75.0);

        let all = fx.engine.compliance_rate(ComplianceScope::All, &fx.admin).unwrap();
        assert_eq!(all.total, 5);
    }

    #[test]
    fn manager_cannot_read_other_scope() {
        let fx = Fixture::new();
        let err = fx
            .engine
            .compliance_rate(ComplianceScope::All, &fx.manager)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized(_)));
    }

    #[test]
    fn empty_scope_is_one_hundred() {
        let fx = Fixture::new();
        let r = fx
            .engine
            .compliance_rate(ComplianceScope::Agent(fx.agent.id), &fx.agent)
            .unwrap();
        assert_eq!(r.rate, 100.0);
    }

    // ── Violations ───────────────────────────────────────────────────

    #[test]
    fn violation_review_flow_and_summary() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();
        let entry = fx.engine.record_action(call(&fx, case.id, false), &fx.agent).unwrap();

        let v = fx
            .engine
            .flag_violation(
                NewViolation {
                    case_id: case.id,
                    agent_id: fx.agent.id,
                    action_id: Some(entry.id),
                    violation_type: "CALL_OUTSIDE_HOURS".into(),
                    severity: Severity::Critical,
                    description: "called at 22:10 local".into(),
                },
                &fx.manager,
            )
            .unwrap();
        assert_eq!(v.status, ViolationStatus::Open);
        assert_eq!(v.occurred_at, entry.created_at);

        let summary = fx
            .engine
            .compliance_summary(ComplianceScope::Manager(fx.manager.id), &fx.manager)
            .unwrap();
        assert_eq!(summary.open_violations, 1);
        assert_eq!(summary.critical_open_violations, 1);
        assert!(summary.avg_resolution_hours.is_none());

        fx.clock.advance_secs(7200);
        fx.engine
            .review_violation(v.id, ViolationStatus::Resolved, Some("coached".into()), &fx.manager)
            .unwrap();
        let summary = fx
            .engine
            .compliance_summary(ComplianceScope::Manager(fx.manager.id), &fx.manager)
            .unwrap();
        assert_eq!(summary.open_violations, 0);
        assert_eq!(summary.avg_resolution_hours, Some(2.0));

        let err = fx
            .engine
            .review_violation(v.id, ViolationStatus::Open, None, &fx.manager)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

        let ledger = fx.engine.case_actions(case.id, &fx.manager).unwrap();
        assert_eq!(ledger[0], entry);
    }

    #[test]
    fn ledger_verifies_after_mixed_activity() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();
        fx.engine.record_action(call(&fx, case.id, true), &fx.agent).unwrap();
        fx.engine
            .apply_payment(
                case.id,
                crate::payment::PaymentRequest {
                    amount: Money::from_major(10),
                    method: dca_state::PaymentMethod::Cash,
                    transaction_ref: None,
                    notes: None,
                },
                &fx.agent,
            )
            .unwrap();
        let v = fx.engine.verify_ledger(&fx.admin).unwrap();
        assert!(v.chain_valid);
        assert!(v.total_entries >= 2);
    }
}
