//! # Case Store
//!
//! [`CaseStore`] is the persistence seam the engines write through. The
//! single-case unit of work is [`CaseCommit`]: the updated case, the
//! version it was read at, an optional new assignment, and any ledger
//! entries to append. A store applies all of it or none of it, and
//! refuses the commit with [`StoreError::ConcurrentModification`] when the
//! stored version has moved on.
//!
//! [`MemoryStore`] keeps cases, assignments and the ledger under one
//! lock so a commit is atomic, and holds the independent tables
//! (debtors, profiles, violations, rules) in per-table [`Table`]s.
//! All locks are `parking_lot` and are never held across `.await`.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use dca_core::{CaseId, DebtorId, RuleId, Timestamp, UserId, ViolationId, GENESIS_HASH};
use dca_state::{
    ActionDraft, AgentAction, Case, CaseAssignment, ComplianceViolation, Debtor, UserProfile,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::allocation::AllocationRule;
use crate::error::StoreError;

// ── Unit of work ────────────────────────────────────────────────────

/// Everything one operation changes about a single case.
#[derive(Debug, Clone)]
pub struct CaseCommit {
    /// Desired state of the case. Its `version` is ignored; the store sets it.
    pub case: Case,
    /// Version the writer read before validating.
    pub expected_version: u64,
    /// New active assignment; any prior active one for the case is deactivated.
    pub assignment: Option<CaseAssignment>,
    /// Ledger entries to seal and append, in order.
    pub actions: Vec<ActionDraft>,
    /// Commit time, used to seal entries and stamp deactivations.
    pub at: Timestamp,
}

impl CaseCommit {
    /// A commit that only updates the case row.
    pub fn case_only(case: Case, expected_version: u64, at: Timestamp) -> Self {
        Self {
            case,
            expected_version,
            assignment: None,
            actions: Vec::new(),
            at,
        }
    }
}

/// What a successful commit wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub case: Case,
    pub assignment: Option<CaseAssignment>,
    pub deactivated: Option<CaseAssignment>,
    pub actions: Vec<AgentAction>,
}

/// Full contents of a store, used to hydrate from durable storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub cases: Vec<Case>,
    pub debtors: Vec<Debtor>,
    pub assignments: Vec<CaseAssignment>,
    /// In ledger order.
    pub actions: Vec<AgentAction>,
    pub profiles: Vec<UserProfile>,
    pub violations: Vec<ComplianceViolation>,
    pub rules: Vec<AllocationRule>,
}

// ── Trait ───────────────────────────────────────────────────────────

/// Repository of cases and their satellite records.
pub trait CaseStore: Send + Sync {
    fn case(&self, id: CaseId) -> Result<Option<Case>, StoreError>;
    fn cases(&self) -> Result<Vec<Case>, StoreError>;
    fn case_by_number(&self, case_number: &str) -> Result<Option<Case>, StoreError>;
    /// Insert a new case at version 1. Fails on a duplicate `case_number`.
    fn insert_case(&self, case: Case) -> Result<Case, StoreError>;
    /// Apply a single-case unit of work atomically.
    fn commit(&self, commit: CaseCommit) -> Result<CommitReceipt, StoreError>;

    fn assignments_for(&self, case_id: CaseId) -> Result<Vec<CaseAssignment>, StoreError>;
    fn active_assignment(&self, case_id: CaseId) -> Result<Option<CaseAssignment>, StoreError>;

    /// The whole ledger in append order.
    fn actions(&self) -> Result<Vec<AgentAction>, StoreError>;
    fn actions_for_case(&self, case_id: CaseId) -> Result<Vec<AgentAction>, StoreError>;

    fn debtor(&self, id: DebtorId) -> Result<Option<Debtor>, StoreError>;
    fn debtors(&self) -> Result<Vec<Debtor>, StoreError>;
    fn find_debtor_by_contact(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<Debtor>, StoreError>;
    fn put_debtor(&self, debtor: Debtor) -> Result<Debtor, StoreError>;

    fn profile(&self, id: UserId) -> Result<Option<UserProfile>, StoreError>;
    fn profiles(&self) -> Result<Vec<UserProfile>, StoreError>;
    fn put_profile(&self, profile: UserProfile) -> Result<UserProfile, StoreError>;

    fn violation(&self, id: ViolationId) -> Result<Option<ComplianceViolation>, StoreError>;
    fn violations(&self) -> Result<Vec<ComplianceViolation>, StoreError>;
    fn put_violation(&self, violation: ComplianceViolation)
        -> Result<ComplianceViolation, StoreError>;

    fn rule(&self, id: RuleId) -> Result<Option<AllocationRule>, StoreError>;
    fn rules(&self) -> Result<Vec<AllocationRule>, StoreError>;
    fn put_rule(&self, rule: AllocationRule) -> Result<AllocationRule, StoreError>;
}

// ── Generic table ───────────────────────────────────────────────────

/// Thread-safe, cloneable keyed table.
#[derive(Debug)]
pub struct Table<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Table<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Copy, T: Clone> Table<K, T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// First record satisfying `pred`.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// Read-validate-update under one write lock.
    pub fn try_update<R, E>(
        &self,
        id: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Copy, T: Clone> Default for Table<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── In-memory store ─────────────────────────────────────────────────

#[derive(Debug, Default)]
struct CaseTables {
    cases: HashMap<CaseId, Case>,
    numbers: HashMap<String, CaseId>,
    assignments: HashMap<CaseId, Vec<CaseAssignment>>,
    ledger: Vec<AgentAction>,
}

impl CaseTables {
    fn last_hash(&self) -> &str {
        self.ledger
            .last()
            .map(|a| a.entry_hash.as_str())
            .unwrap_or(GENESIS_HASH)
    }
}

/// Process-local [`CaseStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    case_tables: Arc<RwLock<CaseTables>>,
    debtors: Table<DebtorId, Debtor>,
    profiles: Table<UserId, UserProfile>,
    violations: Table<ViolationId, ComplianceViolation>,
    rules: Table<RuleId, AllocationRule>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from durable contents. Ledger entries are taken as-is.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        {
            let mut tables = store.case_tables.write();
            for case in snapshot.cases {
                tables.numbers.insert(case.case_number.clone(), case.id);
                tables.cases.insert(case.id, case);
            }
            for assignment in snapshot.assignments {
                tables
                    .assignments
                    .entry(assignment.case_id)
                    .or_default()
                    .push(assignment);
            }
            let mut actions = snapshot.actions;
            actions.sort_by_key(|a| a.sequence);
            tables.ledger = actions;
        }
        for d in snapshot.debtors {
            store.debtors.insert(d.id, d);
        }
        for p in snapshot.profiles {
            store.profiles.insert(p.id, p);
        }
        for v in snapshot.violations {
            store.violations.insert(v.id, v);
        }
        for r in snapshot.rules {
            store.rules.insert(r.id, r);
        }
        store
    }

    /// Full contents, ledger in order.
    pub fn snapshot(&self) -> Snapshot {
        let tables = self.case_tables.read();
        Snapshot {
            cases: tables.cases.values().cloned().collect(),
            debtors: self.debtors.list(),
            assignments: tables.assignments.values().flatten().cloned().collect(),
            actions: tables.ledger.clone(),
            profiles: self.profiles.list(),
            violations: self.violations.list(),
            rules: self.rules.list(),
        }
    }
}

impl CaseStore for MemoryStore {
    fn case(&self, id: CaseId) -> Result<Option<Case>, StoreError> {
        Ok(self.case_tables.read().cases.get(&id).cloned())
    }

    fn cases(&self) -> Result<Vec<Case>, StoreError> {
        Ok(self.case_tables.read().cases.values().cloned().collect())
    }

    fn case_by_number(&self, case_number: &str) -> Result<Option<Case>, StoreError> {
        let tables = self.case_tables.read();
        Ok(tables
            .numbers
            .get(case_number)
            .and_then(|id| tables.cases.get(id))
            .cloned())
    }

    fn insert_case(&self, mut case: Case) -> Result<Case, StoreError> {
        let mut tables = self.case_tables.write();
        if tables.numbers.contains_key(&case.case_number) {
            return Err(StoreError::Duplicate {
                field: "case_number",
                value: case.case_number,
            });
        }
        if let Some(reason) = case.invariant_violation() {
            return Err(StoreError::Rejected(reason.to_string()));
        }
        case.version = 1;
        tables.numbers.insert(case.case_number.clone(), case.id);
        tables.cases.insert(case.id, case.clone());
        Ok(case)
    }

    fn commit(&self, commit: CaseCommit) -> Result<CommitReceipt, StoreError> {
        let CaseCommit {
            mut case,
            expected_version,
            assignment,
            actions,
            at,
        } = commit;

        let mut tables = self.case_tables.write();
        let stored = tables.cases.get(&case.id).ok_or_else(|| StoreError::NotFound {
            kind: "case",
            id: case.id.to_string(),
        })?;

        if stored.version != expected_version {
            return Err(StoreError::ConcurrentModification {
                case_id: case.id,
                expected: expected_version,
                found: stored.version,
            });
        }
        if case.recovered_amount < stored.recovered_amount {
            return Err(StoreError::Rejected("recovered_amount may not decrease".into()));
        }
        if case.amount != stored.amount || case.case_number != stored.case_number {
            return Err(StoreError::Rejected("amount and case_number are immutable".into()));
        }
        if let Some(reason) = case.invariant_violation() {
            return Err(StoreError::Rejected(reason.to_string()));
        }

        case.version = stored.version + 1;
        tables.cases.insert(case.id, case.clone());

        let mut deactivated = None;
        if let Some(new_assignment) = &assignment {
            let history = tables.assignments.entry(case.id).or_default();
            for prior in history.iter_mut().filter(|a| a.is_active) {
                prior.deactivate(at);
                deactivated = Some(prior.clone());
            }
            history.push(new_assignment.clone());
        }

        let mut sealed = Vec::with_capacity(actions.len());
        for draft in actions {
            let sequence = tables.ledger.len() as u64 + 1;
            let entry = AgentAction::seal(draft, sequence, tables.last_hash(), at);
            tables.ledger.push(entry.clone());
            sealed.push(entry);
        }

        Ok(CommitReceipt {
            case,
            assignment,
            deactivated,
            actions: sealed,
        })
    }

    fn assignments_for(&self, case_id: CaseId) -> Result<Vec<CaseAssignment>, StoreError> {
        Ok(self
            .case_tables
            .read()
            .assignments
            .get(&case_id)
            .cloned()
            .unwrap_or_default())
    }

    fn active_assignment(&self, case_id: CaseId) -> Result<Option<CaseAssignment>, StoreError> {
        Ok(self
            .case_tables
            .read()
            .assignments
            .get(&case_id)
            .and_then(|h| h.iter().find(|a| a.is_active).cloned()))
    }

    fn actions(&self) -> Result<Vec<AgentAction>, StoreError> {
        Ok(self.case_tables.read().ledger.clone())
    }

    fn actions_for_case(&self, case_id: CaseId) -> Result<Vec<AgentAction>, StoreError> {
        Ok(self
            .case_tables
            .read()
            .ledger
            .iter()
            .filter(|a| a.case_id() == case_id)
            .cloned()
            .collect())
    }

    fn debtor(&self, id: DebtorId) -> Result<Option<Debtor>, StoreError> {
        Ok(self.debtors.get(&id))
    }

    fn debtors(&self) -> Result<Vec<Debtor>, StoreError> {
        Ok(self.debtors.list())
    }

    fn find_debtor_by_contact(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<Debtor>, StoreError> {
        Ok(self.debtors.find(|d| d.matches_contact(email, phone)))
    }

    fn put_debtor(&self, debtor: Debtor) -> Result<Debtor, StoreError> {
        self.debtors.insert(debtor.id, debtor.clone());
        Ok(debtor)
    }

    fn profile(&self, id: UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.get(&id))
    }

    fn profiles(&self) -> Result<Vec<UserProfile>, StoreError> {
        Ok(self.profiles.list())
    }

    fn put_profile(&self, profile: UserProfile) -> Result<UserProfile, StoreError> {
        self.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    fn violation(&self, id: ViolationId) -> Result<Option<ComplianceViolation>, StoreError> {
        Ok(self.violations.get(&id))
    }

    fn violations(&self) -> Result<Vec<ComplianceViolation>, StoreError> {
        Ok(self.violations.list())
    }

    fn put_violation(
        &self,
        violation: ComplianceViolation,
    ) -> Result<ComplianceViolation, StoreError> {
        self.violations.insert(violation.id, violation.clone());
        Ok(violation)
    }

    fn rule(&self, id: RuleId) -> Result<Option<AllocationRule>, StoreError> {
        Ok(self.rules.get(&id))
    }

    fn rules(&self) -> Result<Vec<AllocationRule>, StoreError> {
        Ok(self.rules.list())
    }

    fn put_rule(&self, rule: AllocationRule) -> Result<AllocationRule, StoreError> {
        self.rules.insert(rule.id, rule.clone());
        Ok(rule)
    }
}
