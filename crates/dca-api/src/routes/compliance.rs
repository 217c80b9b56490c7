//! # Compliance API
//!
//! Compliance rate and summary per scope, ledger chain verification, and
//! the violation review workflow.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dca_core::{ActionId, CaseId, Principal, Role, UserId, ViolationId};
use dca_state::{Severity, ViolationStatus};
use dca_workflow::{ComplianceScope, NewViolation};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, parse_enum, Validate};
use crate::state::AppState;
use crate::views::{RateView, SummaryView, VerificationView, ViolationView};

/// Scope selector. Without `scope`, managers and agents get their own
/// figures and everyone else gets ALL.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScopeParams {
    /// ALL, MANAGER, AGENT or CASE.
    pub scope: Option<String>,
    /// User or case ID for scoped figures.
    pub id: Option<Uuid>,
}

impl ScopeParams {
    fn resolve(&self, caller: &Principal) -> Result<ComplianceScope, AppError> {
        let Some(kind) = self.scope.as_deref() else {
            return Ok(match caller.role {
                Role::Manager => ComplianceScope::Manager(caller.id),
                Role::Agent => ComplianceScope::Agent(caller.id),
                Role::Admin | Role::Viewer => ComplianceScope::All,
            });
        };
        let need_id = || {
            self.id
                .ok_or_else(|| AppError::Validation(format!("scope {kind} requires id")))
        };
        match kind.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(ComplianceScope::All),
            "MANAGER" => Ok(ComplianceScope::Manager(UserId::from_uuid(need_id()?))),
            "AGENT" => Ok(ComplianceScope::Agent(UserId::from_uuid(need_id()?))),
            "CASE" => Ok(ComplianceScope::Case(CaseId::from_uuid(need_id()?))),
            other => Err(AppError::Validation(format!("unknown scope '{other}'"))),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FlagViolationRequest {
    pub case_id: Uuid,
    pub agent_id: Uuid,
    /// The ledger entry the violation concerns, if any.
    pub action_id: Option<Uuid>,
    /// Free-form category, e.g. "CALL_OUTSIDE_HOURS".
    pub violation_type: String,
    /// LOW, MEDIUM, HIGH or CRITICAL.
    pub severity: String,
    pub description: String,
}

impl Validate for FlagViolationRequest {
    fn validate(&self) -> Result<(), String> {
        if self.violation_type.trim().is_empty() {
            return Err("violation_type must not be empty".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("description must not be empty".to_string());
        }
        parse_enum::<Severity>("severity", &self.severity).map(|_| ())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewViolationRequest {
    /// UNDER_REVIEW, RESOLVED or DISMISSED.
    pub status: String,
    pub resolution_notes: Option<String>,
}

impl Validate for ReviewViolationRequest {
    fn validate(&self) -> Result<(), String> {
        parse_enum::<ViolationStatus>("status", &self.status).map(|_| ())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/compliance/rate", get(compliance_rate))
        .route("/v1/compliance/summary", get(compliance_summary))
        .route("/v1/compliance/verify", get(verify_ledger))
        .route("/v1/compliance/violations", post(flag_violation))
        .route("/v1/compliance/violations/{id}/review", post(review_violation))
}

/// GET /v1/compliance/rate: Share of compliant actions in a scope.
#[utoipa::path(
    get,
    path = "/v1/compliance/rate",
    params(ScopeParams),
    responses(
        (status = 200, description = "Compliance rate (100 when no actions)", body = RateView),
        (status = 404, description = "Scope outside the caller's authority", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
async fn compliance_rate(
    State(state): State<AppState>,
    Caller(actor): Caller,
    params: Result<Query<ScopeParams>, QueryRejection>,
) -> Result<Json<RateView>, AppError> {
    let scope = extract_query(params)?.resolve(&actor)?;
    let rate = state.engine.compliance_rate(scope, &actor)?;
    Ok(Json(RateView::from(&rate)))
}

/// GET /v1/compliance/summary: Rate plus violation counters.
#[utoipa::path(
    get,
    path = "/v1/compliance/summary",
    params(ScopeParams),
    responses(
        (status = 200, description = "Compliance summary", body = SummaryView),
        (status = 404, description = "Scope outside the caller's authority", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
async fn compliance_summary(
    State(state): State<AppState>,
    Caller(actor): Caller,
    params: Result<Query<ScopeParams>, QueryRejection>,
) -> Result<Json<SummaryView>, AppError> {
    let scope = extract_query(params)?.resolve(&actor)?;
    let summary = state.engine.compliance_summary(scope, &actor)?;
    Ok(Json(SummaryView::from(&summary)))
}

/// GET /v1/compliance/verify: Recompute the ledger hash chain.
#[utoipa::path(
    get,
    path = "/v1/compliance/verify",
    responses(
        (status = 200, description = "Chain verification result", body = VerificationView),
        (status = 404, description = "Managers and admins only", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
async fn verify_ledger(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<VerificationView>, AppError> {
    let result = state.engine.verify_ledger(&actor)?;
    if !result.chain_valid {
        tracing::error!(
            broken_links = result.broken_links,
            tampered = result.tampered_entries,
            "action ledger failed verification"
        );
    }
    Ok(Json(VerificationView::from(&result)))
}

/// POST /v1/compliance/violations: Flag a violation.
#[utoipa::path(
    post,
    path = "/v1/compliance/violations",
    request_body = FlagViolationRequest,
    responses(
        (status = 201, description = "Violation opened", body = ViolationView),
        (status = 404, description = "Case or action not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
async fn flag_violation(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Result<Json<FlagViolationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ViolationView>), AppError> {
    let req = extract_validated_json(body)?;
    let severity = parse_enum::<Severity>("severity", &req.severity).map_err(AppError::Validation)?;
    let input = NewViolation {
        case_id: CaseId::from_uuid(req.case_id),
        agent_id: UserId::from_uuid(req.agent_id),
        action_id: req.action_id.map(ActionId::from_uuid),
        violation_type: req.violation_type,
        severity,
        description: req.description,
    };
    let violation = state.engine.flag_violation(input, &actor)?;
    state.persist_violation(&violation).await?;
    Ok((StatusCode::CREATED, Json(ViolationView::from(&violation))))
}

/// POST /v1/compliance/violations/{id}/review: Move a violation through review.
#[utoipa::path(
    post,
    path = "/v1/compliance/violations/{id}/review",
    params(("id" = Uuid, Path, description = "Violation ID")),
    request_body = ReviewViolationRequest,
    responses(
        (status = 200, description = "Violation updated", body = ViolationView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Violation already closed", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
async fn review_violation(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<ReviewViolationRequest>, JsonRejection>,
) -> Result<Json<ViolationView>, AppError> {
    let req = extract_validated_json(body)?;
    let target =
        parse_enum::<ViolationStatus>("status", &req.status).map_err(AppError::Validation)?;
    let violation = state.engine.review_violation(
        ViolationId::from_uuid(id),
        target,
        req.resolution_notes,
        &actor,
    )?;
    state.persist_violation(&violation).await?;
    Ok(Json(ViolationView::from(&violation)))
}
