//! # Payment Application Engine
//!
//! A payment credits `recovered_amount`, appends a PAYMENT ledger entry,
//! and drives the lifecycle: ASSIGNED cases start work, and an
//! IN_PROGRESS case reaching its full amount resolves through the system
//! actor. Overpayment is accepted and recorded as-is.

use dca_core::{Actor, CaseId, Money, Principal, Role};
use dca_state::{ActionDraft, ActionOutcome, ActionType, AgentAction, Case, CaseStatus, PaymentMethod};
use serde::{Deserialize, Serialize};

use crate::engine::{require_modifiable, require_roles, CaseEngine};
use crate::error::WorkflowError;
use crate::lifecycle::{log_conflict, record_transition_metric};
use crate::store::{CaseCommit, CaseStore};

/// A payment to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
    pub method: PaymentMethod,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
}

/// Result of applying a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub case: Case,
    pub action: AgentAction,
    /// The payment took the case to RESOLVED.
    pub resolved: bool,
    /// Amount recovered beyond the original debt.
    pub overpayment: Money,
}

impl<S: CaseStore> CaseEngine<S> {
    /// Apply a payment to a case. AGENT (assigned) or ADMIN.
    pub fn apply_payment(
        &self,
        case_id: CaseId,
        request: PaymentRequest,
        actor: &Principal,
    ) -> Result<PaymentReceipt, WorkflowError> {
        require_roles(actor, &[Role::Agent, Role::Admin])?;
        request.amount.require_positive("amount")?;

        let mut case = self.load_case(case_id)?;
        require_modifiable(actor, &case)?;

        match case.status {
            CaseStatus::Pending | CaseStatus::Allocated => {
                return Err(WorkflowError::PreconditionFailed(format!(
                    "{case_id} has no assigned agent"
                )));
            }
            CaseStatus::Resolved | CaseStatus::Closed => {
                return Err(WorkflowError::invalid_transition(case.status, CaseStatus::Resolved));
            }
            CaseStatus::Assigned | CaseStatus::InProgress | CaseStatus::Escalated => {}
        }

        let read_version = case.version;
        let now = self.now();
        let user = Actor::User(*actor);
        let mut moved = Vec::new();

        case.credit(request.amount, now)?;
        case.last_contact_at = Some(now);

        if case.status == CaseStatus::Assigned {
            case.transition(CaseStatus::InProgress, &user, None, now)?;
            moved.push(CaseStatus::InProgress);
        }
        let resolved = case.status == CaseStatus::InProgress && case.is_fully_recovered();
        if resolved {
            case.transition(CaseStatus::Resolved, &Actor::System, Some("paid in full"), now)?;
            moved.push(CaseStatus::Resolved);
        }

        let mut draft = ActionDraft::new(case_id, actor.id, ActionType::Payment);
        draft.outcome = Some(ActionOutcome::PaymentReceived);
        draft.compliant = true;
        draft.payment_amount = Some(request.amount);
        draft.payment_method = Some(request.method);
        draft.transaction_ref = request.transaction_ref;
        draft.notes = request.notes;

        let overpayment = case.recovered_amount.saturating_sub_floor_zero(case.amount);
        let mut commit = CaseCommit::case_only(case, read_version, now);
        commit.actions.push(draft);
        let mut receipt = self
            .store()
            .commit(commit)
            .map_err(|e| log_conflict(case_id, e.into()))?;

        for status in moved {
            record_transition_metric(status);
        }
        metrics::counter!("dca_payments_total").increment(1);
        if overpayment.is_positive() {
            tracing::warn!(case = %case_id, %overpayment, "payment exceeds amount due");
        }
        tracing::info!(
            case = %case_id,
            amount = %request.amount,
            recovered = %receipt.case.recovered_amount,
            resolved,
            "payment applied"
        );

        let action = receipt.actions.pop().ok_or_else(|| {
            WorkflowError::StoreUnavailable("commit returned no ledger entry".into())
        })?;
        Ok(PaymentReceipt {
            case: receipt.case,
            action,
            resolved,
            overpayment,
        })
    }
}

#[cfg(test)]
mod tests {
    use dca_core::{Money, Role};
    use dca_state::{ActionOutcome, ActionType, CaseStatus, PaymentMethod};

    use super::PaymentRequest;
    use crate::error::WorkflowError;
    use crate::testing::Fixture;

    fn pay(major: i64) -> PaymentRequest {
        PaymentRequest {
            amount: Money::from_major(major),
            method: PaymentMethod::Upi,
            transaction_ref: Some("UTR-1".into()),
            notes: None,
        }
    }

    #[test]
    fn partial_then_full_payment_resolves() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();

        let first = fx.engine.apply_payment(case.id, pay(30_000), &fx.agent).unwrap();
        assert_eq!(first.case.recovered_amount, Money::from_major(30_000));
        assert_eq!(first.case.status, CaseStatus::InProgress);
        assert!(!first.resolved);

        let second = fx.engine.apply_payment(case.id, pay(20_000), &fx.agent).unwrap();
        assert_eq!(second.case.recovered_amount, Money::from_major(50_000));
        assert_eq!(second.case.status, CaseStatus::Resolved);
        assert!(second.resolved);
        assert_eq!(second.case.transitions.last().unwrap().actor, None);
    }

    #[test]
    fn exact_outstanding_amount_resolves() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();
        fx.engine.apply_payment(case.id, pay(12_345), &fx.agent).unwrap();
        let remaining = case.amount.minor() - Money::from_major(12_345).minor();
        let receipt = fx
            .engine
            .apply_payment(
                case.id,
                PaymentRequest {
                    amount: Money::from_minor(remaining),
                    ..pay(0)
                },
                &fx.agent,
            )
            .unwrap();
        assert_eq!(receipt.case.recovered_amount, receipt.case.amount);
        assert_eq!(receipt.case.status, CaseStatus::Resolved);
        assert_eq!(receipt.overpayment, Money::ZERO);
    }

    #[test]
    fn payment_on_assigned_case_starts_work() {
        let fx = Fixture::new();
        let case = fx.assigned_case();
        let receipt = fx.engine.apply_payment(case.id, pay(100), &fx.agent).unwrap();
        assert_eq!(receipt.case.status, CaseStatus::InProgress);
    }

    #[test]
    fn full_payment_on_assigned_case_goes_straight_through() {
        let fx = Fixture::new();
        let case = fx.assigned_case();
        let receipt = fx.engine.apply_payment(case.id, pay(50_000), &fx.agent).unwrap();
        let path: Vec<_> = receipt.case.transitions.iter().map(|t| t.to_state).collect();
        assert!(path.ends_with(&[CaseStatus::InProgress, CaseStatus::Resolved]));
    }

    #[test]
    fn overpayment_is_recorded() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();
        let receipt = fx.engine.apply_payment(case.id, pay(60_000), &fx.agent).unwrap();
        assert_eq!(receipt.case.recovered_amount, Money::from_major(60_000));
        assert_eq!(receipt.overpayment, Money::from_major(10_000));
        assert!(receipt.resolved);
    }

    #[test]
    fn non_positive_amount_is_validation_error() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();
        let err = fx.engine.apply_payment(case.id, pay(0), &fx.agent).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        let err = fx.engine.apply_payment(case.id, pay(-5), &fx.agent).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn payment_appends_compliant_ledger_entry() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();
        let receipt = fx.engine.apply_payment(case.id, pay(500), &fx.agent).unwrap();
        let entry = &receipt.action;
        assert_eq!(entry.draft.action_type, ActionType::Payment);
        assert_eq!(entry.draft.outcome, Some(ActionOutcome::PaymentReceived));
        assert_eq!(entry.draft.payment_amount, Some(Money::from_major(500)));
        assert!(entry.compliant());
    }

    #[test]
    fn escalated_case_keeps_status() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();
        fx.engine
            .transition(case.id, CaseStatus::Escalated, &fx.agent, Some("hardship"))
            .unwrap();
        let receipt = fx.engine.apply_payment(case.id, pay(50_000), &fx.agent).unwrap();
        assert_eq!(receipt.case.status, CaseStatus::Escalated);
        assert!(!receipt.resolved);
    }

    #[test]
    fn unallocated_and_closed_cases_refuse_payment() {
        let fx = Fixture::new();
        let pending = fx.pending_case();
        let err = fx.engine.apply_payment(pending.id, pay(1), &fx.admin).unwrap_err();
        assert!(matches!(err, WorkflowError::PreconditionFailed(_)));

        let closed = fx.closed_case();
        let err = fx.engine.apply_payment(closed.id, pay(1), &fx.admin).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[test]
    fn other_agent_and_manager_are_refused() {
        let fx = Fixture::new();
        let case = fx.in_progress_case();
        let stranger = fx.add_user(Role::Agent);
        assert!(fx.engine.apply_payment(case.id, pay(1), &stranger).is_err());
        assert!(fx.engine.apply_payment(case.id, pay(1), &fx.manager).is_err());
    }
}
