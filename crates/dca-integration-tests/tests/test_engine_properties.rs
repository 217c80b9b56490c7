//! # Engine Properties
//!
//! Property tests over payment accumulation, import status reporting and
//! the recovery score.

use std::sync::Arc;

use dca_core::{ManualClock, Money, Principal, Priority, Role, Timestamp, UserId};
use dca_state::{Case, CaseStatus, ContactDetails, PaymentMethod, UserProfile};
use dca_workflow::{
    recovery_probability, CaseEngine, CaseStore, ImportRow, ImportStatus, MemoryStore, NewCase,
    PaymentRequest, PolicyConfig,
};
use proptest::prelude::*;

fn now() -> Timestamp {
    Timestamp::parse("2026-06-01T08:00:00Z").unwrap()
}

fn engine() -> CaseEngine<MemoryStore> {
    CaseEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new(now())),
        PolicyConfig::default(),
    )
}

fn user(engine: &CaseEngine<MemoryStore>, role: Role) -> Principal {
    let id = UserId::new();
    engine
        .store()
        .put_profile(UserProfile {
            id,
            email: format!("{}@example.com", id.as_uuid()),
            full_name: format!("{role} user"),
            role,
            department: None,
            is_active: true,
            last_login_at: None,
        })
        .unwrap();
    engine.principal_for(id, role).unwrap()
}

fn payment(minor: i64) -> PaymentRequest {
    PaymentRequest {
        amount: Money::from_minor(minor),
        method: PaymentMethod::Card,
        transaction_ref: None,
        notes: None,
    }
}

fn good_row(n: usize) -> ImportRow {
    ImportRow {
        full_name: format!("Debtor {n}"),
        email: Some(format!("debtor{n}@example.com")),
        amount: format!("{}.50", 1_000 + n),
        ..Default::default()
    }
}

fn bad_row(n: usize) -> ImportRow {
    ImportRow {
        full_name: format!("Broken {n}"),
        amount: "not-a-number".into(),
        ..Default::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn recovered_amount_only_grows_and_resolves_at_the_total(
        installments in prop::collection::vec(1i64..=20_000, 1..12),
    ) {
        let engine = engine();
        let admin = user(&engine, Role::Admin);
        let manager = user(&engine, Role::Manager);
        let agent = user(&engine, Role::Agent);
        let debtor = engine
            .create_debtor("Prop Debtor", ContactDetails::default(), &admin)
            .unwrap();
        let total = Money::from_minor(1_000_000);
        let case = engine
            .create_case(
                NewCase {
                    case_number: None,
                    debtor_id: debtor.id,
                    amount: total,
                    priority: Priority::Medium,
                    due_date: None,
                    sla_due_date: None,
                },
                &admin,
            )
            .unwrap();
        engine.allocate(case.id, manager.id, &admin).unwrap();
        engine.assign(&[case.id], agent.id, manager.id, &admin).unwrap();

        let mut expected = 0i64;
        let mut previous = Money::ZERO;
        for minor in &installments {
            let receipt = engine.apply_payment(case.id, payment(*minor), &agent).unwrap();
            expected += minor;
            prop_assert!(receipt.case.recovered_amount >= previous);
            prop_assert_eq!(receipt.case.recovered_amount, Money::from_minor(expected));
            prop_assert_eq!(receipt.case.status, CaseStatus::InProgress);
            previous = receipt.case.recovered_amount;
        }

        let remainder = total.minor() - expected;
        let last = engine.apply_payment(case.id, payment(remainder), &agent).unwrap();
        prop_assert!(last.resolved);
        prop_assert_eq!(last.case.recovered_amount, total);
        prop_assert_eq!(
            engine.store().actions_for_case(case.id).unwrap().len(),
            installments.len() + 1
        );
    }

    #[test]
    fn import_status_tracks_row_outcomes(good in 0usize..6, bad in 0usize..6) {
        let engine = engine();
        let admin = user(&engine, Role::Admin);
        let rows: Vec<_> = (0..good).map(good_row).chain((0..bad).map(bad_row)).collect();

        let report = engine.import_rows(rows, &admin).unwrap();
        prop_assert_eq!(report.total, good + bad);
        prop_assert_eq!(report.successful, good);
        prop_assert_eq!(report.failed, bad);
        prop_assert_eq!(report.created.len(), good);
        let expected = if good == 0 {
            ImportStatus::Failed
        } else if bad == 0 {
            ImportStatus::Completed
        } else {
            ImportStatus::Partial
        };
        prop_assert_eq!(report.status, expected);
        for (i, err) in report.errors.iter().enumerate() {
            prop_assert_eq!(err.row, good + i + 1);
        }
    }

    #[test]
    fn recovery_score_stays_in_range_and_rewards_payment(
        major in 1i64..1_000_000,
        days in -30i64..400,
        priority in prop::sample::select(Priority::ALL.to_vec()),
    ) {
        let at = now();
        let mut case = Case::open(
            "SCORE-1",
            dca_core::DebtorId::new(),
            Money::from_major(major),
            priority,
            None,
            at,
        )
        .unwrap();
        case.due_date = Some(at.plus_days(-days));

        let unpaid = recovery_probability(&case, at);
        prop_assert!(unpaid <= 100);

        case.recovered_amount = Money::from_major(1);
        let paid = recovery_probability(&case, at);
        prop_assert!(paid >= unpaid);
        prop_assert!(paid <= 100);
    }
}
