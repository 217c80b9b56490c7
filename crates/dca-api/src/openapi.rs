//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented route into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer scheme described in [`crate::auth`].
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "`{role}:{user_id}:{secret}`; the secret is AUTH_TOKEN.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DCA Engine API",
        version = "0.1.0",
        description = "Debt-collection case lifecycle and assignment engine.\n\nAll `/v1/*` endpoints require `Authorization: Bearer {role}:{user_id}:{secret}`. Health probes and `/metrics` are unauthenticated. Amounts are decimal strings in major units.",
        license(name = "AGPL-3.0-or-later")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Cases ───────────────────────────────────────────────────────
        crate::routes::cases::create_case,
        crate::routes::cases::list_cases,
        crate::routes::cases::get_case,
        crate::routes::cases::transition_case,
        crate::routes::cases::allocate_case,
        crate::routes::cases::case_assignments,
        // ── Debtors ─────────────────────────────────────────────────────
        crate::routes::debtors::create_debtor,
        crate::routes::debtors::list_debtors,
        crate::routes::debtors::payment_history,
        crate::routes::debtors::get_debtor,
        crate::routes::debtors::update_debtor,
        // ── Assignment & payments ───────────────────────────────────────
        crate::routes::assignments::assign_cases,
        crate::routes::payments::record_payment,
        // ── Ledger & compliance ─────────────────────────────────────────
        crate::routes::actions::record_action,
        crate::routes::actions::list_actions,
        crate::routes::compliance::compliance_rate,
        crate::routes::compliance::compliance_summary,
        crate::routes::compliance::verify_ledger,
        crate::routes::compliance::flag_violation,
        crate::routes::compliance::review_violation,
        // ── Allocation ──────────────────────────────────────────────────
        crate::routes::allocation::create_rule,
        crate::routes::allocation::list_rules,
        crate::routes::allocation::set_rule_active,
        crate::routes::allocation::run_allocation,
        // ── Intake, profiles, worklist ──────────────────────────────────
        crate::routes::import::import_cases,
        crate::routes::profiles::put_profile,
        crate::routes::worklist::worklist_summary,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            // ── Views ───────────────────────────────────────────────────
            crate::views::CaseView,
            crate::views::TransitionView,
            crate::views::AssignmentView,
            crate::views::AssignedView,
            crate::views::FailedView,
            crate::views::BatchAssignView,
            crate::views::DebtorView,
            crate::views::ProfileView,
            crate::views::ActionView,
            crate::views::PaymentView,
            crate::views::VerificationView,
            crate::views::RateView,
            crate::views::SummaryView,
            crate::views::ViolationView,
            crate::views::RuleView,
            crate::views::AllocationRunView,
            crate::views::RowErrorView,
            crate::views::ImportView,
            crate::views::WorklistSummaryView,
            // ── Requests ────────────────────────────────────────────────
            crate::routes::cases::CreateCaseRequest,
            crate::routes::cases::TransitionRequest,
            crate::routes::cases::AllocateRequest,
            crate::routes::debtors::CreateDebtorRequest,
            crate::routes::debtors::ContactRequest,
            crate::routes::assignments::AssignRequest,
            crate::routes::payments::RecordPaymentRequest,
            crate::routes::actions::RecordActionRequest,
            crate::routes::compliance::FlagViolationRequest,
            crate::routes::compliance::ReviewViolationRequest,
            crate::routes::allocation::CreateRuleRequest,
            crate::routes::allocation::RuleActiveRequest,
            crate::routes::import::ImportRequest,
            crate::routes::profiles::PutProfileRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "cases", description = "Case entry, worklists, lifecycle transitions and allocation"),
        (name = "debtors", description = "Debtor records and contact details"),
        (name = "assignments", description = "Batch handoff of cases to agents"),
        (name = "payments", description = "Payment application and automatic resolution"),
        (name = "actions", description = "Hash-chained agent action ledger"),
        (name = "compliance", description = "Compliance rate, ledger verification and violation review"),
        (name = "allocation", description = "Routing rules and automatic allocation"),
        (name = "import", description = "Bulk debtor and case import"),
        (name = "profiles", description = "User roles and activation"),
        (name = "worklist", description = "Worklist counters"),
    )
)]
pub struct ApiDoc;

/// Serves the document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "DCA Engine API");
        assert!(!spec.paths.paths.is_empty());
    }

    #[test]
    fn spec_has_case_paths() {
        let spec = ApiDoc::openapi();
        for path in [
            "/v1/cases",
            "/v1/cases/{id}",
            "/v1/cases/{id}/transition",
            "/v1/cases/{id}/payments",
            "/v1/cases/{id}/actions",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn spec_has_compliance_and_allocation_paths() {
        let spec = ApiDoc::openapi();
        assert!(spec.paths.paths.contains_key("/v1/compliance/rate"));
        assert!(spec.paths.paths.contains_key("/v1/compliance/violations/{id}/review"));
        assert!(spec.paths.paths.contains_key("/v1/allocation/run"));
    }

    #[test]
    fn spec_declares_bearer_auth() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
