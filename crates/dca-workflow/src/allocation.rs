//! # Allocation Rules
//!
//! Declarative rules that route PENDING cases to managers, and the
//! recovery-probability score the RECOVERY_BASED kind keys on.
//!
//! `auto_allocate` does not bypass the Assignment Engine: every match is
//! applied through [`CaseEngine::allocate`], so the same role, profile and
//! version checks run as for a manual allocation.

use dca_core::{CaseId, Money, Principal, Priority, Role, RuleId, Timestamp, UserId};
use dca_state::{Case, CaseStatus, Debtor};
use serde::{Deserialize, Serialize};

use crate::engine::{require_active, require_roles, CaseEngine};
use crate::error::WorkflowError;
use crate::store::CaseStore;

/// Score bounds.
pub const MIN_SCORE: u8 = 0;
pub const MAX_SCORE: u8 = 100;

/// Condition a rule tests a case against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    /// Original amount within `[min, max]`; either bound may be open.
    ValueBased {
        #[serde(default)]
        min: Option<Money>,
        #[serde(default)]
        max: Option<Money>,
    },
    /// Debtor city, compared case-insensitively.
    GeoBased { city: String },
    /// Recovery probability at or above the threshold.
    RecoveryBased { min_probability: u8 },
    PriorityBased { priority: Priority },
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValueBased { .. } => "VALUE_BASED",
            Self::GeoBased { .. } => "GEO_BASED",
            Self::RecoveryBased { .. } => "RECOVERY_BASED",
            Self::PriorityBased { .. } => "PRIORITY_BASED",
        }
    }

    /// Reject conditions that can never match.
    pub fn validate(&self) -> Result<(), dca_core::ValidationError> {
        match self {
            Self::ValueBased { min: Some(lo), max: Some(hi) } if lo > hi => Err(
                dca_core::ValidationError::invalid("max", "must not be below min"),
            ),
            Self::GeoBased { city } => dca_core::error::require_non_empty("city", city),
            Self::RecoveryBased { min_probability } if *min_probability > MAX_SCORE => Err(
                dca_core::ValidationError::invalid("min_probability", "must be 0..=100"),
            ),
            _ => Ok(()),
        }
    }
}

/// A routing rule. Lower `priority` is tried first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRule {
    pub id: RuleId,
    pub name: String,
    pub kind: RuleKind,
    pub priority: u32,
    pub is_active: bool,
    pub target_manager_id: UserId,
    #[serde(default)]
    pub times_applied: u64,
    pub created_at: Timestamp,
}

impl AllocationRule {
    /// Whether `case` (owned by `debtor`) satisfies this rule at `now`.
    pub fn matches(&self, case: &Case, debtor: Option<&Debtor>, now: Timestamp) -> bool {
        match &self.kind {
            RuleKind::ValueBased { min, max } => {
                min.map_or(true, |lo| case.amount >= lo) && max.map_or(true, |hi| case.amount <= hi)
            }
            RuleKind::GeoBased { city } => debtor
                .and_then(|d| d.city.as_deref())
                .is_some_and(|c| c.trim().eq_ignore_ascii_case(city.trim())),
            RuleKind::RecoveryBased { min_probability } => {
                recovery_probability(case, now) >= *min_probability
            }
            RuleKind::PriorityBased { priority } => case.priority == *priority,
        }
    }
}

/// Input for [`CaseEngine::create_rule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRule {
    pub name: String,
    pub kind: RuleKind,
    pub priority: u32,
    pub target_manager_id: UserId,
}

/// Heuristic likelihood (0–100) that a case will be recovered.
///
/// Starts at 50 and adjusts for size, priority, age past `due_date` and
/// any recovery so far. A case without a due date counts as current.
pub fn recovery_probability(case: &Case, now: Timestamp) -> u8 {
    let mut score: i32 = 50;

    let major = case.amount.whole_major();
    if major < 50_000 {
        score += 15;
    } else if major > 200_000 {
        score -= 10;
    }

    match case.priority {
        Priority::Critical => score += 10,
        Priority::Low => score -= 5,
        Priority::Medium | Priority::High => {}
    }

    let days_overdue = case.due_date.map_or(0, |due| now.days_since(&due));
    if days_overdue < 30 {
        score += 20;
    } else if days_overdue > 180 {
        score -= 25;
    } else if days_overdue > 90 {
        score -= 10;
    }

    if case.recovered_amount.is_positive() {
        score += 10;
    }

    score.clamp(i32::from(MIN_SCORE), i32::from(MAX_SCORE)) as u8
}

/// One case the run placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedCase {
    pub case_id: CaseId,
    pub manager_id: UserId,
    /// `None` when the policy default manager was used.
    pub rule_id: Option<RuleId>,
}

/// One case the run could not place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnallocatedCase {
    pub case_id: CaseId,
    pub error: String,
}

/// Result of [`CaseEngine::auto_allocate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationRun {
    pub allocated: Vec<AllocatedCase>,
    /// No rule matched and no default manager is configured.
    pub unmatched: Vec<CaseId>,
    pub failed: Vec<UnallocatedCase>,
}

impl<S: CaseStore> CaseEngine<S> {
    /// Add a routing rule. ADMIN only. The target must be an active
    /// MANAGER or ADMIN.
    pub fn create_rule(
        &self,
        input: NewRule,
        actor: &Principal,
    ) -> Result<AllocationRule, WorkflowError> {
        require_roles(actor, &[Role::Admin])?;
        dca_core::error::require_non_empty("name", &input.name)?;
        input.kind.validate()?;
        let target = self.load_profile("manager", input.target_manager_id)?;
        if !(target.is_active_as(Role::Manager) || target.is_active_as(Role::Admin)) {
            return Err(WorkflowError::PreconditionFailed(format!(
                "{} is not an active manager",
                target.id
            )));
        }

        let rule = AllocationRule {
            id: RuleId::new(),
            name: input.name.trim().to_string(),
            kind: input.kind,
            priority: input.priority,
            is_active: true,
            target_manager_id: input.target_manager_id,
            times_applied: 0,
            created_at: self.now(),
        };
        let saved = self.store().put_rule(rule)?;
        tracing::info!(rule = %saved.id, kind = saved.kind.as_str(), priority = saved.priority, "allocation rule created");
        Ok(saved)
    }

    /// All rules in evaluation order.
    pub fn list_rules(&self, actor: &Principal) -> Result<Vec<AllocationRule>, WorkflowError> {
        require_active(actor)?;
        let mut rules = self.store().rules()?;
        rules.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.created_at.cmp(&b.created_at)));
        Ok(rules)
    }

    /// Enable or disable a rule. ADMIN only.
    pub fn set_rule_active(
        &self,
        id: RuleId,
        is_active: bool,
        actor: &Principal,
    ) -> Result<AllocationRule, WorkflowError> {
        require_roles(actor, &[Role::Admin])?;
        let mut rule = self
            .store()
            .rule(id)?
            .ok_or_else(|| WorkflowError::not_found("rule", id))?;
        rule.is_active = is_active;
        Ok(self.store().put_rule(rule)?)
    }

    /// Route every PENDING case. ADMIN only.
    ///
    /// Cases are visited highest priority first, oldest first within a
    /// priority. Each goes to the first active matching rule's manager, or
    /// to the policy default manager when none matches. A failure on one
    /// case is reported and the run continues.
    pub fn auto_allocate(&self, actor: &Principal) -> Result<AllocationRun, WorkflowError> {
        require_roles(actor, &[Role::Admin])?;
        let now = self.now();
        let rules: Vec<_> = self
            .list_rules(actor)?
            .into_iter()
            .filter(|r| r.is_active)
            .collect();

        let mut pending: Vec<_> = self
            .store()
            .cases()?
            .into_iter()
            .filter(|c| c.status == CaseStatus::Pending)
            .collect();
        pending.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
        });

        let mut run = AllocationRun::default();
        for case in pending {
            let debtor = self.store().debtor(case.debtor_id)?;
            let matched = rules.iter().find(|r| r.matches(&case, debtor.as_ref(), now));
            let (manager_id, rule_id) = match (matched, self.policy().default_manager_id) {
                (Some(rule), _) => (rule.target_manager_id, Some(rule.id)),
                (None, Some(fallback)) => (fallback, None),
                (None, None) => {
                    run.unmatched.push(case.id);
                    continue;
                }
            };

            match self.allocate(case.id, manager_id, actor) {
                Ok(_) => {
                    if let Some(id) = rule_id {
                        self.bump_rule(id)?;
                    }
                    run.allocated.push(AllocatedCase {
                        case_id: case.id,
                        manager_id,
                        rule_id,
                    });
                }
                Err(err) => {
                    tracing::warn!(case = %case.id, manager = %manager_id, error = %err, "auto-allocation failed");
                    run.failed.push(UnallocatedCase {
                        case_id: case.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            allocated = run.allocated.len(),
            unmatched = run.unmatched.len(),
            failed = run.failed.len(),
            "auto-allocation finished"
        );
        Ok(run)
    }

    fn bump_rule(&self, id: RuleId) -> Result<(), WorkflowError> {
        if let Some(mut rule) = self.store().rule(id)? {
            rule.times_applied += 1;
            self.store().put_rule(rule)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use dca_core::DebtorId;

    fn at() -> Timestamp {
        Timestamp::parse("2026-03-01T00:00:00Z").unwrap()
    }

    fn case(major: i64, priority: Priority) -> Case {
        Case::open("CASE-R", DebtorId::new(), Money::from_major(major), priority, None, at()).unwrap()
    }

    // ── Recovery probability ─────────────────────────────────────────

    #[test]
    fn small_fresh_debt_scores_high() {
        // 50 + 15 (small) + 20 (not overdue)
        assert_eq!(recovery_probability(&case(10_000, Priority::Medium), at()), 85);
    }

    #[test]
    fn large_stale_low_priority_scores_low() {
        let mut c = case(500_000, Priority::Low);
        c.due_date = Some(at().plus_days(-200));
        // 50 - 10 - 5 - 25
        assert_eq!(recovery_probability(&c, at()), 10);
    }

    #[test]
    fn middle_band_overdue_and_partial_recovery() {
        let mut c = case(100_000, Priority::Critical);
        c.due_date = Some(at().plus_days(-100));
        c.recovered_amount = Money::from_major(1);
        // 50 + 10 - 10 + 10
        assert_eq!(recovery_probability(&c, at()), 60);
    }

    #[test]
    fn score_is_clamped() {
        let mut c = case(10_000, Priority::Critical);
        c.recovered_amount = Money::from_major(1);
        // 50 + 15 + 10 + 20 + 10 = 105
        assert_eq!(recovery_probability(&c, at()), MAX_SCORE);
    }

    // ── Matching ─────────────────────────────────────────────────────

    fn rule(kind: RuleKind) -> AllocationRule {
        AllocationRule {
            id: RuleId::new(),
            name: "r".into(),
            kind,
            priority: 1,
            is_active: true,
            target_manager_id: UserId::new(),
            times_applied: 0,
            created_at: at(),
        }
    }

    #[test]
    fn value_rule_bounds_are_inclusive() {
        let r = rule(RuleKind::ValueBased {
            min: Some(Money::from_major(1_000)),
            max: Some(Money::from_major(5_000)),
        });
        assert!(r.matches(&case(1_000, Priority::Low), None, at()));
        assert!(r.matches(&case(5_000, Priority::Low), None, at()));
        assert!(!r.matches(&case(5_001, Priority::Low), None, at()));
    }

    #[test]
    fn geo_rule_needs_debtor_city() {
        let r = rule(RuleKind::GeoBased { city: "Pune".into() });
        let c = case(1_000, Priority::Low);
        assert!(!r.matches(&c, None, at()));
        let debtor = Debtor::new(
            "Asha Rao",
            dca_state::ContactDetails {
                city: Some("PUNE".into()),
                ..Default::default()
            },
            at(),
        )
        .unwrap();
        assert!(r.matches(&c, Some(&debtor), at()));
    }

    #[test]
    fn rule_kind_serializes_with_type_tag() {
        let r = rule(RuleKind::PriorityBased { priority: Priority::High });
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["kind"]["type"], "PRIORITY_BASED");
        assert_eq!(json["kind"]["priority"], "HIGH");
        assert_eq!(json["priority"], 1);
        let back: AllocationRule = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn inverted_value_bounds_are_rejected() {
        let kind = RuleKind::ValueBased {
            min: Some(Money::from_major(10)),
            max: Some(Money::from_major(1)),
        };
        assert!(kind.validate().is_err());
    }

    // ── Auto-allocation ──────────────────────────────────────────────

    #[test]
    fn run_routes_by_first_matching_rule() {
        let fx = Fixture::new();
        let other = fx.add_user(Role::Manager);
        let big = fx
            .engine
            .create_rule(
                NewRule {
                    name: "large balances".into(),
                    kind: RuleKind::ValueBased { min: Some(Money::from_major(40_000)), max: None },
                    priority: 1,
                    target_manager_id: fx.manager.id,
                },
                &fx.admin,
            )
            .unwrap();
        fx.engine
            .create_rule(
                NewRule {
                    name: "everything else".into(),
                    kind: RuleKind::ValueBased { min: None, max: None },
                    priority: 2,
                    target_manager_id: other.id,
                },
                &fx.admin,
            )
            .unwrap();

        let large = fx.pending_case();
        let small = fx.pending_case_with(Money::from_major(100), Priority::High);

        let run = fx.engine.auto_allocate(&fx.admin).unwrap();
        assert_eq!(run.allocated.len(), 2);
        assert!(run.failed.is_empty());
        // HIGH before MEDIUM
        assert_eq!(run.allocated[0].case_id, small.id);

        let large_now = fx.engine.get_case(large.id, &fx.admin).unwrap();
        assert_eq!(large_now.status, CaseStatus::Allocated);
        assert_eq!(large_now.assigned_manager_id, Some(fx.manager.id));
        let small_now = fx.engine.get_case(small.id, &fx.admin).unwrap();
        assert_eq!(small_now.assigned_manager_id, Some(other.id));

        assert_eq!(fx.engine.store().rule(big.id).unwrap().unwrap().times_applied, 1);
    }

    #[test]
    fn unmatched_without_default_manager() {
        let fx = Fixture::new();
        let c = fx.pending_case();
        let run = fx.engine.auto_allocate(&fx.admin).unwrap();
        assert_eq!(run.unmatched, vec![c.id]);
    }

    #[test]
    fn inactive_rules_are_skipped() {
        let fx = Fixture::new();
        let r = fx
            .engine
            .create_rule(
                NewRule {
                    name: "all".into(),
                    kind: RuleKind::ValueBased { min: None, max: None },
                    priority: 1,
                    target_manager_id: fx.manager.id,
                },
                &fx.admin,
            )
            .unwrap();
        fx.engine.set_rule_active(r.id, false, &fx.admin).unwrap();
        fx.pending_case();
        let run = fx.engine.auto_allocate(&fx.admin).unwrap();
        assert!(run.allocated.is_empty());
        assert_eq!(run.unmatched.len(), 1);
    }

    #[test]
    fn only_admin_runs_allocation() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.engine.auto_allocate(&fx.manager),
            Err(WorkflowError::Unauthorized(_))
        ));
    }
}
