//! # Response Views
//!
//! Wire shapes for domain records. Identifiers are bare UUIDs, amounts
//! are decimal strings in major units ("50000.00"), timestamps are
//! RFC 3339 UTC, and enums use their SCREAMING_SNAKE names.

use dca_core::{Money, Timestamp};
use dca_state::{
    AgentAction, Case, CaseAssignment, CaseTransitionRecord, ChainVerification,
    ComplianceViolation, Debtor, UserProfile,
};
use dca_workflow::{
    AllocationRule, AllocationRun, BatchAssignOutcome, ComplianceRate, ComplianceSummary,
    ImportReport, WorklistSummary,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

fn ts(t: Timestamp) -> String {
    t.to_iso8601()
}

fn opt_ts(t: Option<Timestamp>) -> Option<String> {
    t.map(ts)
}

fn money(m: Money) -> String {
    m.to_string()
}

// ── Cases ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransitionView {
    pub from_state: String,
    pub to_state: String,
    /// Absent for system-driven transitions.
    pub actor: Option<Uuid>,
    pub timestamp: String,
    pub note: Option<String>,
}

impl From<&CaseTransitionRecord> for TransitionView {
    fn from(r: &CaseTransitionRecord) -> Self {
        Self {
            from_state: r.from_state.as_str().to_string(),
            to_state: r.to_state.as_str().to_string(),
            actor: r.actor.map(|a| *a.as_uuid()),
            timestamp: ts(r.timestamp),
            note: r.note.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CaseView {
    pub id: Uuid,
    pub case_number: String,
    pub debtor_id: Uuid,
    pub amount: String,
    pub recovered_amount: String,
    pub outstanding: String,
    pub status: String,
    pub priority: String,
    pub assigned_manager_id: Option<Uuid>,
    pub assigned_agent_id: Option<Uuid>,
    pub sla_due_date: Option<String>,
    pub due_date: Option<String>,
    pub created_by: Option<Uuid>,
    pub last_contact_at: Option<String>,
    pub next_follow_up: Option<String>,
    pub escalation_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub version: u64,
    pub transitions: Vec<TransitionView>,
}

impl From<&Case> for CaseView {
    fn from(c: &Case) -> Self {
        Self {
            id: *c.id.as_uuid(),
            case_number: c.case_number.clone(),
            debtor_id: *c.debtor_id.as_uuid(),
            amount: money(c.amount),
            recovered_amount: money(c.recovered_amount),
            outstanding: money(c.outstanding()),
            status: c.status.as_str().to_string(),
            priority: c.priority.as_str().to_string(),
            assigned_manager_id: c.assigned_manager_id.map(|u| *u.as_uuid()),
            assigned_agent_id: c.assigned_agent_id.map(|u| *u.as_uuid()),
            sla_due_date: opt_ts(c.sla_due_date),
            due_date: opt_ts(c.due_date),
            created_by: c.created_by.map(|u| *u.as_uuid()),
            last_contact_at: opt_ts(c.last_contact_at),
            next_follow_up: opt_ts(c.next_follow_up),
            escalation_reason: c.escalation_reason.clone(),
            created_at: ts(c.created_at),
            updated_at: ts(c.updated_at),
            version: c.version,
            transitions: c.transitions.iter().map(TransitionView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssignmentView {
    pub id: Uuid,
    pub case_id: Uuid,
    pub assigned_to: Uuid,
    pub assigned_by: Uuid,
    pub assignment_date: String,
    pub is_active: bool,
    pub deactivated_at: Option<String>,
}

impl From<&CaseAssignment> for AssignmentView {
    fn from(a: &CaseAssignment) -> Self {
        Self {
            id: *a.id.as_uuid(),
            case_id: *a.case_id.as_uuid(),
            assigned_to: *a.assigned_to.as_uuid(),
            assigned_by: *a.assigned_by.as_uuid(),
            assignment_date: ts(a.assignment_date),
            is_active: a.is_active,
            deactivated_at: opt_ts(a.deactivated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssignedView {
    pub case_id: Uuid,
    pub assignment_id: Uuid,
    pub previous_agent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FailedView {
    pub case_id: Uuid,
    pub code: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchAssignView {
    pub succeeded: Vec<AssignedView>,
    pub failed: Vec<FailedView>,
}

impl From<&BatchAssignOutcome> for BatchAssignView {
    fn from(o: &BatchAssignOutcome) -> Self {
        Self {
            succeeded: o
                .succeeded
                .iter()
                .map(|s| AssignedView {
                    case_id: *s.case_id.as_uuid(),
                    assignment_id: *s.assignment_id.as_uuid(),
                    previous_agent_id: s.previous_agent_id.map(|u| *u.as_uuid()),
                })
                .collect(),
            failed: o
                .failed
                .iter()
                .map(|f| FailedView {
                    case_id: *f.case_id.as_uuid(),
                    code: f.error.code().to_string(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

// ── Parties ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DebtorView {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Debtor> for DebtorView {
    fn from(d: &Debtor) -> Self {
        Self {
            id: *d.id.as_uuid(),
            full_name: d.full_name.clone(),
            email: d.email.clone(),
            phone: d.phone.clone(),
            address: d.address.clone(),
            city: d.city.clone(),
            state: d.state.clone(),
            postal_code: d.postal_code.clone(),
            created_at: ts(d.created_at),
            updated_at: ts(d.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileView {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub department: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<String>,
}

impl From<&UserProfile> for ProfileView {
    fn from(p: &UserProfile) -> Self {
        Self {
            id: *p.id.as_uuid(),
            email: p.email.clone(),
            full_name: p.full_name.clone(),
            role: p.role.as_str().to_string(),
            department: p.department.clone(),
            is_active: p.is_active,
            last_login_at: opt_ts(p.last_login_at),
        }
    }
}

// ── Ledger ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActionView {
    pub id: Uuid,
    pub sequence: u64,
    pub case_id: Uuid,
    pub agent_id: Uuid,
    pub action_type: String,
    pub outcome: Option<String>,
    pub compliant: bool,
    pub compliance_notes: Option<String>,
    pub notes: Option<String>,
    pub duration_seconds: Option<u32>,
    pub payment_amount: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_ref: Option<String>,
    pub promise_amount: Option<String>,
    pub promise_date: Option<String>,
    pub next_follow_up: Option<String>,
    pub created_at: String,
    pub previous_hash: String,
    pub entry_hash: String,
}

impl From<&AgentAction> for ActionView {
    fn from(a: &AgentAction) -> Self {
        let d = &a.draft;
        Self {
            id: *a.id.as_uuid(),
            sequence: a.sequence,
            case_id: *d.case_id.as_uuid(),
            agent_id: *d.agent_id.as_uuid(),
            action_type: d.action_type.as_str().to_string(),
            outcome: d.outcome.map(|o| o.as_str().to_string()),
            compliant: d.compliant,
            compliance_notes: d.compliance_notes.clone(),
            notes: d.notes.clone(),
            duration_seconds: d.duration_seconds,
            payment_amount: d.payment_amount.map(money),
            payment_method: d.payment_method.map(|m| m.as_str().to_string()),
            transaction_ref: d.transaction_ref.clone(),
            promise_amount: d.promise_amount.map(money),
            promise_date: opt_ts(d.promise_date),
            next_follow_up: opt_ts(d.next_follow_up),
            created_at: ts(a.created_at),
            previous_hash: a.previous_hash.clone(),
            entry_hash: a.entry_hash.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentView {
    pub case: CaseView,
    pub action: ActionView,
    pub resolved: bool,
    pub overpayment: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerificationView {
    pub total_entries: usize,
    pub broken_links: usize,
    pub tampered_entries: usize,
    pub chain_valid: bool,
}

impl From<&ChainVerification> for VerificationView {
    fn from(v: &ChainVerification) -> Self {
        Self {
            total_entries: v.total_entries,
            broken_links: v.broken_links,
            tampered_entries: v.tampered_entries,
            chain_valid: v.chain_valid,
        }
    }
}

// ── Compliance ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RateView {
    pub total: usize,
    pub compliant: usize,
    pub rate: f64,
}

impl From<&ComplianceRate> for RateView {
    fn from(r: &ComplianceRate) -> Self {
        Self {
            total: r.total,
            compliant: r.compliant,
            rate: r.rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SummaryView {
    pub rate: RateView,
    pub total_violations: usize,
    pub open_violations: usize,
    pub critical_open_violations: usize,
    pub avg_resolution_hours: Option<f64>,
}

impl From<&ComplianceSummary> for SummaryView {
    fn from(s: &ComplianceSummary) -> Self {
        Self {
            rate: RateView::from(&s.rate),
            total_violations: s.total_violations,
            open_violations: s.open_violations,
            critical_open_violations: s.critical_open_violations,
            avg_resolution_hours: s.avg_resolution_hours,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ViolationView {
    pub id: Uuid,
    pub case_id: Uuid,
    pub agent_id: Uuid,
    pub action_id: Option<Uuid>,
    pub violation_type: String,
    pub severity: String,
    pub description: String,
    pub status: String,
    pub occurred_at: String,
    pub flagged_by: Uuid,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<String>,
    pub resolution_notes: Option<String>,
}

impl From<&ComplianceViolation> for ViolationView {
    fn from(v: &ComplianceViolation) -> Self {
        Self {
            id: *v.id.as_uuid(),
            case_id: *v.case_id.as_uuid(),
            agent_id: *v.agent_id.as_uuid(),
            action_id: v.action_id.map(|a| *a.as_uuid()),
            violation_type: v.violation_type.clone(),
            severity: v.severity.as_str().to_string(),
            description: v.description.clone(),
            status: v.status.as_str().to_string(),
            occurred_at: ts(v.occurred_at),
            flagged_by: *v.flagged_by.as_uuid(),
            reviewed_by: v.reviewed_by.map(|u| *u.as_uuid()),
            reviewed_at: opt_ts(v.reviewed_at),
            resolution_notes: v.resolution_notes.clone(),
        }
    }
}

// ── Allocation & intake ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RuleView {
    pub id: Uuid,
    pub name: String,
    /// Tagged condition, e.g. `{"type":"VALUE_BASED","min":100000,"max":null}`.
    #[schema(value_type = Object)]
    pub kind: serde_json::Value,
    pub priority: u32,
    pub is_active: bool,
    pub target_manager_id: Uuid,
    pub times_applied: u64,
    pub created_at: String,
}

impl From<&AllocationRule> for RuleView {
    fn from(r: &AllocationRule) -> Self {
        Self {
            id: *r.id.as_uuid(),
            name: r.name.clone(),
            kind: serde_json::to_value(&r.kind).unwrap_or(serde_json::Value::Null),
            priority: r.priority,
            is_active: r.is_active,
            target_manager_id: *r.target_manager_id.as_uuid(),
            times_applied: r.times_applied,
            created_at: ts(r.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AllocationRunView {
    /// `{case_id, manager_id, rule_id}` per placed case.
    #[schema(value_type = Vec<Object>)]
    pub allocated: Vec<serde_json::Value>,
    pub unmatched: Vec<Uuid>,
    pub failed: Vec<FailedView>,
}

impl From<&AllocationRun> for AllocationRunView {
    fn from(r: &AllocationRun) -> Self {
        Self {
            allocated: r
                .allocated
                .iter()
                .map(|a| {
                    serde_json::json!({
                        "case_id": a.case_id.as_uuid(),
                        "manager_id": a.manager_id.as_uuid(),
                        "rule_id": a.rule_id.map(|id| *id.as_uuid()),
                    })
                })
                .collect(),
            unmatched: r.unmatched.iter().map(|c| *c.as_uuid()).collect(),
            failed: r
                .failed
                .iter()
                .map(|f| FailedView {
                    case_id: *f.case_id.as_uuid(),
                    code: "ALLOCATION_FAILED".to_string(),
                    error: f.error.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RowErrorView {
    pub row: usize,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImportView {
    pub status: String,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<RowErrorView>,
    pub created: Vec<Uuid>,
}

impl From<&ImportReport> for ImportView {
    fn from(r: &ImportReport) -> Self {
        let status = serde_json::to_value(r.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            status,
            total: r.total,
            successful: r.successful,
            failed: r.failed,
            errors: r
                .errors
                .iter()
                .map(|e| RowErrorView {
                    row: e.row,
                    error: e.error.clone(),
                })
                .collect(),
            created: r.created.iter().map(|c| *c.as_uuid()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorklistSummaryView {
    pub total: usize,
    pub high_priority: usize,
    pub due_today: usize,
    pub sla_breached: usize,
}

impl From<&WorklistSummary> for WorklistSummaryView {
    fn from(s: &WorklistSummary) -> Self {
        Self {
            total: s.total,
            high_priority: s.high_priority,
            due_today: s.due_today,
            sla_breached: s.sla_breached,
        }
    }
}
