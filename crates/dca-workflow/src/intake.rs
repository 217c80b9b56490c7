//! # Intake: Debtors, Manual Case Entry, Bulk Import
//!
//! Every case enters PENDING through [`CaseEngine::create_case`] or
//! [`CaseEngine::import_rows`]. Rows arrive already tokenized; this module
//! only validates them, resolves the debtor and inserts the case.

use std::collections::HashSet;

use dca_core::{CaseId, DebtorId, Money, Principal, Priority, Role, Timestamp, ValidationError};
use dca_state::{ActionType, AgentAction, Case, ContactDetails, Debtor};
use serde::{Deserialize, Serialize};

use crate::engine::{can_view, require_active, require_roles, require_writer, CaseEngine};
use crate::error::WorkflowError;
use crate::store::CaseStore;

/// Input for [`CaseEngine::create_case`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCase {
    /// Generated as `CASE-YYYYMMDD-XXXXXXXX` when absent.
    #[serde(default)]
    pub case_number: Option<String>,
    pub debtor_id: DebtorId,
    pub amount: Money,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<Timestamp>,
    /// Defaults to the policy SLA for `priority`.
    #[serde(default)]
    pub sla_due_date: Option<Timestamp>,
}

/// One pre-parsed import row. All fields are raw text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportRow {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub case_number: Option<String>,
    /// Decimal major units, e.g. `"1,250.50"`.
    pub amount: String,
    pub priority: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339.
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    Completed,
    Partial,
    Failed,
}

impl ImportStatus {
    /// COMPLETED when nothing failed, FAILED when nothing succeeded
    /// (including an empty import), PARTIAL otherwise.
    pub fn from_counts(successful: usize, failed: usize) -> Self {
        match (successful, failed) {
            (0, _) => Self::Failed,
            (_, 0) => Self::Completed,
            _ => Self::Partial,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based row number.
    pub row: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub status: ImportStatus,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
    pub created: Vec<CaseId>,
}

/// Fresh human-readable case number for a case opened at `at`.
pub fn default_case_number(at: Timestamp) -> String {
    let suffix: String = CaseId::new()
        .as_uuid()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect();
    format!("CASE-{}-{}", at.date().format("%Y%m%d"), suffix.to_ascii_uppercase())
}

/// Case-insensitive substring match on name, email or phone. `needle`
/// must already be lowercase.
fn matches_search(debtor: &Debtor, needle: &str) -> bool {
    std::iter::once(Some(debtor.full_name.as_str()))
        .chain([debtor.email.as_deref(), debtor.phone.as_deref()])
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl<S: CaseStore> CaseEngine<S> {
    /// Register a debtor. MANAGER or ADMIN.
    pub fn create_debtor(
        &self,
        full_name: &str,
        contact: ContactDetails,
        actor: &Principal,
    ) -> Result<Debtor, WorkflowError> {
        require_roles(actor, &[Role::Manager, Role::Admin])?;
        let debtor = self.store().put_debtor(Debtor::new(full_name, contact, self.now())?)?;
        tracing::info!(debtor = %debtor.id, "debtor created");
        Ok(debtor)
    }

    pub fn get_debtor(&self, id: DebtorId, actor: &Principal) -> Result<Debtor, WorkflowError> {
        require_active(actor)?;
        self.store()
            .debtor(id)?
            .ok_or_else(|| WorkflowError::not_found("debtor", id))
    }

    /// Debtors matching `search` on name, email or phone, newest first.
    /// A blank search lists everyone.
    pub fn list_debtors(
        &self,
        search: Option<&str>,
        actor: &Principal,
    ) -> Result<Vec<Debtor>, WorkflowError> {
        require_active(actor)?;
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let mut debtors: Vec<_> = self
            .store()
            .debtors()?
            .into_iter()
            .filter(|d| needle.as_deref().map_or(true, |n| matches_search(d, n)))
            .collect();
        debtors.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.full_name.cmp(&b.full_name))
        });
        Ok(debtors)
    }

    /// PAYMENT ledger entries across the debtor's cases, newest first.
    /// Only cases the caller can see contribute.
    pub fn debtor_payment_history(
        &self,
        debtor_id: DebtorId,
        actor: &Principal,
    ) -> Result<Vec<AgentAction>, WorkflowError> {
        self.get_debtor(debtor_id, actor)?;
        let cases: HashSet<CaseId> = self
            .store()
            .cases()?
            .into_iter()
            .filter(|c| c.debtor_id == debtor_id && can_view(actor, c))
            .map(|c| c.id)
            .collect();
        let mut payments: Vec<_> = self
            .store()
            .actions()?
            .into_iter()
            .filter(|a| a.draft.action_type == ActionType::Payment && cases.contains(&a.case_id()))
            .collect();
        payments.reverse();
        Ok(payments)
    }

    /// Overwrite the non-blank contact fields. Any writer.
    pub fn update_debtor_contact(
        &self,
        id: DebtorId,
        contact: ContactDetails,
        actor: &Principal,
    ) -> Result<Debtor, WorkflowError> {
        require_writer(actor)?;
        let mut debtor = self.get_debtor(id, actor)?;
        debtor.apply_contact(contact, self.now());
        Ok(self.store().put_debtor(debtor)?)
    }

    /// Open a PENDING case. MANAGER or ADMIN.
    pub fn create_case(&self, input: NewCase, actor: &Principal) -> Result<Case, WorkflowError> {
        require_roles(actor, &[Role::Manager, Role::Admin])?;
        self.get_debtor(input.debtor_id, actor)?;
        let now = self.now();

        let case_number = input
            .case_number
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| default_case_number(now));
        let mut case = Case::open(
            case_number,
            input.debtor_id,
            input.amount,
            input.priority,
            Some(actor.id),
            now,
        )?;
        case.due_date = input.due_date;
        case.sla_due_date = Some(
            input
                .sla_due_date
                .unwrap_or_else(|| self.policy().sla_due(input.priority, now)),
        );

        let case = self.store().insert_case(case)?;
        tracing::info!(case = %case.id, number = %case.case_number, amount = %case.amount, "case created");
        Ok(case)
    }

    /// Ingest pre-parsed rows. MANAGER or ADMIN.
    ///
    /// Rows are independent: a bad row is reported and skipped. Debtors are
    /// matched by email or phone; a match has its contact fields refreshed
    /// from the row instead of creating a duplicate.
    pub fn import_rows(
        &self,
        rows: Vec<ImportRow>,
        actor: &Principal,
    ) -> Result<ImportReport, WorkflowError> {
        require_roles(actor, &[Role::Manager, Role::Admin])?;
        let total = rows.len();
        let mut errors = Vec::new();
        let mut created = Vec::new();

        for (idx, row) in rows.into_iter().enumerate() {
            match self.import_row(row, actor) {
                Ok(case) => created.push(case.id),
                Err(err) => {
                    tracing::warn!(row = idx + 1, error = %err, "import row rejected");
                    errors.push(RowError {
                        row: idx + 1,
                        error: err.to_string(),
                    });
                }
            }
        }

        let report = ImportReport {
            status: ImportStatus::from_counts(created.len(), errors.len()),
            total,
            successful: created.len(),
            failed: errors.len(),
            errors,
            created,
        };
        tracing::info!(
            total,
            successful = report.successful,
            failed = report.failed,
            status = ?report.status,
            "import finished"
        );
        Ok(report)
    }

    fn import_row(&self, row: ImportRow, actor: &Principal) -> Result<Case, WorkflowError> {
        let now = self.now();
        dca_core::error::require_non_empty("full_name", &row.full_name)?;
        let amount = Money::parse_decimal(&row.amount)?.require_positive("amount")?;
        let priority = match non_blank(&row.priority) {
            Some(p) => p.parse::<Priority>()?,
            None => Priority::default(),
        };
        let due_date = non_blank(&row.due_date)
            .map(Timestamp::parse_date_or_datetime)
            .transpose()?;
        let case_number = non_blank(&row.case_number).map(str::to_string);
        if let Some(number) = &case_number {
            if self.store().case_by_number(number)?.is_some() {
                return Err(ValidationError::invalid("case_number", format!("{number} already exists")).into());
            }
        }

        let contact = ContactDetails {
            email: row.email.clone(),
            phone: row.phone.clone(),
            address: row.address,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
        };
        let existing = self
            .store()
            .find_debtor_by_contact(non_blank(&row.email), non_blank(&row.phone))?;
        let debtor = match existing {
            Some(mut d) => {
                d.apply_contact(contact, now);
                self.store().put_debtor(d)?
            }
            None => self.store().put_debtor(Debtor::new(&row.full_name, contact, now)?)?,
        };

        self.create_case(
            NewCase {
                case_number,
                debtor_id: debtor.id,
                amount,
                priority,
                due_date,
                sla_due_date: None,
            },
            actor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use dca_state::CaseStatus;

    fn row(name: &str, email: &str, amount: &str) -> ImportRow {
        ImportRow {
            full_name: name.into(),
            email: Some(email.into()),
            amount: amount.into(),
            ..Default::default()
        }
    }

    // ── Status policy ────────────────────────────────────────────────

    #[test]
    fn status_from_counts() {
        assert_eq!(ImportStatus::from_counts(3, 0), ImportStatus::Completed);
        assert_eq!(ImportStatus::from_counts(2, 1), ImportStatus::Partial);
        assert_eq!(ImportStatus::from_counts(0, 4), ImportStatus::Failed);
        assert_eq!(ImportStatus::from_counts(0, 0), ImportStatus::Failed);
    }

    #[test]
    fn default_case_number_shape() {
        let at = Timestamp::parse("2026-07-04T12:00:00Z").unwrap();
        let n = default_case_number(at);
        assert!(n.starts_with("CASE-20260704-"));
        assert_eq!(n.len(), "CASE-20260704-".len() + 8);
        assert_eq!(n, n.to_ascii_uppercase());
    }

    // ── Manual entry ─────────────────────────────────────────────────

    #[test]
    fn create_case_defaults_sla_from_priority() {
        let fx = Fixture::new();
        let case = fx
            .engine
            .create_case(
                NewCase {
                    case_number: None,
                    debtor_id: fx.debtor.id,
                    amount: Money::from_major(900),
                    priority: Priority::High,
                    due_date: None,
                    sla_due_date: None,
                },
                &fx.manager,
            )
            .unwrap();
        assert_eq!(case.status, CaseStatus::Pending);
        assert_eq!(case.version, 1);
        assert_eq!(case.created_by, Some(fx.manager.id));
        assert_eq!(case.sla_due_date, Some(fx.now().plus_days(7)));
    }

    #[test]
    fn create_case_requires_known_debtor_and_positive_amount() {
        let fx = Fixture::new();
        let mut input = NewCase {
            case_number: Some("CASE-X".into()),
            debtor_id: DebtorId::new(),
            amount: Money::from_major(1),
            priority: Priority::Low,
            due_date: None,
            sla_due_date: None,
        };
        assert_eq!(fx.engine.create_case(input.clone(), &fx.admin).unwrap_err().code(), "NOT_FOUND");
        input.debtor_id = fx.debtor.id;
        input.amount = Money::ZERO;
        assert!(matches!(
            fx.engine.create_case(input, &fx.admin),
            Err(WorkflowError::Validation(_))
        ));
    }

    #[test]
    fn agents_cannot_open_cases() {
        let fx = Fixture::new();
        let input = NewCase {
            case_number: None,
            debtor_id: fx.debtor.id,
            amount: Money::from_major(1),
            priority: Priority::Low,
            due_date: None,
            sla_due_date: None,
        };
        assert!(matches!(
            fx.engine.create_case(input, &fx.agent),
            Err(WorkflowError::Unauthorized(_))
        ));
    }

    #[test]
    fn contact_update_keeps_identity() {
        let fx = Fixture::new();
        let updated = fx
            .engine
            .update_debtor_contact(
                fx.debtor.id,
                ContactDetails {
                    phone: Some("+91 98200 00000".into()),
                    ..Default::default()
                },
                &fx.agent,
            )
            .unwrap();
        assert_eq!(updated.id, fx.debtor.id);
        assert_eq!(updated.full_name, fx.debtor.full_name);
        assert_eq!(updated.phone.as_deref(), Some("+91 98200 00000"));
        assert!(fx.engine.update_debtor_contact(fx.debtor.id, ContactDetails::default(), &fx.viewer).is_err());
    }

    // ── Debtor lookups ───────────────────────────────────────────────

    fn second_debtor(fx: &Fixture) -> Debtor {
        fx.clock.advance_secs(60);
        fx.engine
            .create_debtor(
                "Arjun Mehta",
                ContactDetails {
                    phone: Some("+91 98000 11111".into()),
                    ..Default::default()
                },
                &fx.manager,
            )
            .unwrap()
    }

    fn pay(fx: &Fixture, case: &Case, major: i64, agent: &Principal) {
        fx.engine
            .apply_payment(
                case.id,
                crate::payment::PaymentRequest {
                    amount: Money::from_major(major),
                    method: dca_state::PaymentMethod::Upi,
                    transaction_ref: None,
                    notes: None,
                },
                agent,
            )
            .unwrap();
    }

    #[test]
    fn debtor_search_covers_name_email_and_phone() {
        let fx = Fixture::new();
        let arjun = second_debtor(&fx);

        let names = |search: Option<&str>| -> Vec<DebtorId> {
            fx.engine
                .list_debtors(search, &fx.agent)
                .unwrap()
                .into_iter()
                .map(|d| d.id)
                .collect()
        };
        assert_eq!(names(None), vec![arjun.id, fx.debtor.id]);
        assert_eq!(names(Some("   ")), vec![arjun.id, fx.debtor.id]);
        assert_eq!(names(Some("priya")), vec![fx.debtor.id]);
        assert_eq!(names(Some("EXAMPLE.COM")), vec![fx.debtor.id]);
        assert_eq!(names(Some("98000")), vec![arjun.id]);
        assert!(names(Some("nobody")).is_empty());
    }

    #[test]
    fn payment_history_spans_cases_newest_first() {
        let fx = Fixture::new();
        let first = fx.resolved_case();
        fx.clock.advance_secs(60);
        let second = fx.in_progress_case();
        let mut call = dca_state::ActionDraft::new(second.id, fx.agent.id, ActionType::Call);
        call.outcome = Some(dca_state::ActionOutcome::Rpc);
        fx.engine.record_action(call, &fx.agent).unwrap();
        pay(&fx, &second, 100, &fx.agent);

        let other_agent = fx.add_user(Role::Agent);
        let third = fx.in_progress_case_for(&fx.manager, &other_agent);
        pay(&fx, &third, 5, &other_agent);

        let history = fx.engine.debtor_payment_history(fx.debtor.id, &fx.admin).unwrap();
        assert!(history.iter().all(|a| a.draft.action_type == ActionType::Payment));
        assert_eq!(
            history.iter().map(|a| a.case_id()).collect::<Vec<_>>(),
            vec![third.id, second.id, first.id]
        );
        assert_eq!(history[1].draft.payment_amount, Some(Money::from_major(100)));

        let scoped = fx.engine.debtor_payment_history(fx.debtor.id, &fx.agent).unwrap();
        assert_eq!(
            scoped.iter().map(|a| a.case_id()).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
    }

    #[test]
    fn payment_history_of_unknown_or_unpaid_debtor() {
        let fx = Fixture::new();
        fx.resolved_case();
        let arjun = second_debtor(&fx);
        assert!(fx
            .engine
            .debtor_payment_history(arjun.id, &fx.admin)
            .unwrap()
            .is_empty());

        let err = fx
            .engine
            .debtor_payment_history(DebtorId::new(), &fx.admin)
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    // ── Bulk import ──────────────────────────────────────────────────

    #[test]
    fn partial_import_reports_bad_rows() {
        let fx = Fixture::new();
        let mut dup = row("Ravi Kumar", "ravi@example.com", "500");
        dup.case_number = Some("IMP-1".into());
        let mut first = row("Meera Iyer", "meera@example.com", "1,250.50");
        first.case_number = Some("IMP-1".into());
        first.priority = Some("high".into());
        first.due_date = Some("2026-01-15".into());
        let rows = vec![
            first,
            row("", "nobody@example.com", "10"),
            row("Sam Lee", "sam@example.com", "-5"),
            dup,
        ];

        let report = fx.engine.import_rows(rows, &fx.manager).unwrap();
        assert_eq!(report.status, ImportStatus::Partial);
        assert_eq!((report.total, report.successful, report.failed), (4, 1, 3));
        assert_eq!(
            report.errors.iter().map(|e| e.row).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );

        let case = fx.engine.get_case(report.created[0], &fx.admin).unwrap();
        assert_eq!(case.amount, Money::from_minor(125_050));
        assert_eq!(case.priority, Priority::High);
        assert_eq!(case.case_number, "IMP-1");
        assert_eq!(case.due_date, Some(Timestamp::parse("2026-01-15T00:00:00Z").unwrap()));
    }

    #[test]
    fn import_dedups_debtors_by_email() {
        let fx = Fixture::new();
        let mut a = row("Meera Iyer", "meera@example.com", "100");
        a.city = Some("Chennai".into());
        let mut b = row("M. Iyer", "MEERA@example.com", "200");
        b.city = Some("Bengaluru".into());

        let report = fx.engine.import_rows(vec![a, b], &fx.admin).unwrap();
        assert_eq!(report.status, ImportStatus::Completed);
        let first = fx.engine.get_case(report.created[0], &fx.admin).unwrap();
        let second = fx.engine.get_case(report.created[1], &fx.admin).unwrap();
        assert_eq!(first.debtor_id, second.debtor_id);
        let debtor = fx.engine.get_debtor(first.debtor_id, &fx.admin).unwrap();
        assert_eq!(debtor.city.as_deref(), Some("Bengaluru"));
        assert_eq!(debtor.full_name, "Meera Iyer");
    }

    #[test]
    fn empty_import_is_failed() {
        let fx = Fixture::new();
        let report = fx.engine.import_rows(Vec::new(), &fx.admin).unwrap();
        assert_eq!(report.status, ImportStatus::Failed);
        assert_eq!(report.total, 0);
    }
}
