//! Shared test fixture: an engine over a [`MemoryStore`] with a manual
//! clock, one active user per role and a debtor, plus builders that walk
//! a case to each lifecycle state through the public operations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dca_core::{Clock, ManualClock, Money, Principal, Priority, Role, Timestamp, UserId};
use dca_state::{Case, CaseStatus, ContactDetails, Debtor, PaymentMethod, UserProfile};

use crate::engine::CaseEngine;
use crate::intake::NewCase;
use crate::payment::PaymentRequest;
use crate::policy::PolicyConfig;
use crate::store::{CaseStore, MemoryStore};

pub(crate) struct Fixture {
    pub engine: CaseEngine<MemoryStore>,
    pub clock: ManualClock,
    pub admin: Principal,
    pub manager: Principal,
    pub agent: Principal,
    pub viewer: Principal,
    pub debtor: Debtor,
    seq: AtomicUsize,
}

impl Fixture {
    pub fn new() -> Self {
        let clock = ManualClock::new(Timestamp::parse("2026-03-02T09:00:00Z").unwrap());
        let store = Arc::new(MemoryStore::new());
        let engine = CaseEngine::new(store, Arc::new(clock.clone()), PolicyConfig::default());
        let debtor = engine
            .store()
            .put_debtor(
                Debtor::new(
                    "Priya Sharma",
                    ContactDetails {
                        email: Some("debtor@example.com".into()),
                        phone: Some("+91 90000 00001".into()),
                        city: Some("Mumbai".into()),
                        ..Default::default()
                    },
                    clock.now(),
                )
                .unwrap(),
            )
            .unwrap();

        let placeholder = Principal::active(UserId::new(), Role::Viewer);
        let mut fx = Self {
            engine,
            clock,
            admin: placeholder,
            manager: placeholder,
            agent: placeholder,
            viewer: placeholder,
            debtor,
            seq: AtomicUsize::new(0),
        };
        fx.admin = fx.add_user(Role::Admin);
        fx.manager = fx.add_user(Role::Manager);
        fx.agent = fx.add_user(Role::Agent);
        fx.viewer = fx.add_user(Role::Viewer);
        fx
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Store an active profile and return its principal.
    pub fn add_user(&self, role: Role) -> Principal {
        let id = UserId::new();
        let profile = UserProfile {
            id,
            email: format!("{}-{}@example.com", role.as_str().to_ascii_lowercase(), id.as_uuid()),
            full_name: format!("Test {role}"),
            role,
            department: None,
            is_active: true,
            last_login_at: None,
        };
        self.engine.store().put_profile(profile).unwrap();
        self.engine.principal_for(id, role).unwrap()
    }

    fn reload(&self, case: &Case) -> Case {
        self.engine.store().case(case.id).unwrap().unwrap()
    }

    // ── Builders ─────────────────────────────────────────────────────

    pub fn pending_case(&self) -> Case {
        self.pending_case_with(Money::from_major(50_000), Priority::Medium)
    }

    pub fn pending_case_with(&self, amount: Money, priority: Priority) -> Case {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.engine
            .create_case(
                NewCase {
                    case_number: Some(format!("FX-{n:04}")),
                    debtor_id: self.debtor.id,
                    amount,
                    priority,
                    due_date: None,
                    sla_due_date: None,
                },
                &self.admin,
            )
            .unwrap()
    }

    pub fn allocated_case(&self) -> Case {
        let case = self.pending_case();
        self.engine
            .allocate(case.id, self.manager.id, &self.manager)
            .unwrap()
    }

    pub fn assigned_case(&self) -> Case {
        let case = self.allocated_case();
        let out = self
            .engine
            .assign(&[case.id], self.agent.id, self.manager.id, &self.manager)
            .unwrap();
        assert!(out.all_succeeded());
        self.reload(&case)
    }

    pub fn in_progress_case(&self) -> Case {
        let case = self.assigned_case();
        self.engine
            .transition(case.id, CaseStatus::InProgress, &self.agent, None)
            .unwrap()
    }

    /// An IN_PROGRESS case owned by `manager` and worked by `agent`.
    pub fn in_progress_case_for(&self, manager: &Principal, agent: &Principal) -> Case {
        let case = self.pending_case();
        self.engine.allocate(case.id, manager.id, &self.admin).unwrap();
        let out = self
            .engine
            .assign(&[case.id], agent.id, manager.id, &self.admin)
            .unwrap();
        assert!(out.all_succeeded());
        self.engine
            .transition(case.id, CaseStatus::InProgress, agent, None)
            .unwrap()
    }

    pub fn resolved_case(&self) -> Case {
        let case = self.in_progress_case();
        let receipt = self
            .engine
            .apply_payment(
                case.id,
                PaymentRequest {
                    amount: case.amount,
                    method: PaymentMethod::BankTransfer,
                    transaction_ref: None,
                    notes: None,
                },
                &self.agent,
            )
            .unwrap();
        assert_eq!(receipt.case.status, CaseStatus::Resolved);
        receipt.case
    }

    pub fn closed_case(&self) -> Case {
        let case = self.resolved_case();
        self.engine
            .transition(case.id, CaseStatus::Closed, &self.manager, None)
            .unwrap()
    }
}
