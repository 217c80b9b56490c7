//! # Case API
//!
//! Case entry, role-scoped listing, lifecycle transitions and manager
//! allocation. Every handler acts as the authenticated [`Caller`]; a case
//! outside the caller's scope answers 404 exactly like a missing one.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dca_core::{CaseId, DebtorId, Priority, UserId};
use dca_state::CaseStatus;
use dca_workflow::{CaseQuery, NewCase};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{
    extract_query, extract_validated_json, parse_amount, parse_optional_date, Validate,
};
use crate::state::AppState;
use crate::views::{AssignmentView, CaseView};

/// Request to open a case against an existing debtor.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCaseRequest {
    /// Generated as `CASE-YYYYMMDD-XXXXXXXX` when omitted.
    pub case_number: Option<String>,
    pub debtor_id: Uuid,
    /// Decimal amount in major units, e.g. "50000" or "1234.50".
    pub amount: String,
    /// LOW, MEDIUM (default), HIGH or CRITICAL.
    pub priority: Option<String>,
    /// Original due date, `YYYY-MM-DD` or RFC 3339.
    pub due_date: Option<String>,
    /// Overrides the SLA derived from priority.
    pub sla_due_date: Option<String>,
}

impl CreateCaseRequest {
    fn to_new_case(&self) -> Result<NewCase, String> {
        let priority = match &self.priority {
            Some(p) => p.parse::<Priority>().map_err(|e| e.to_string())?,
            None => Priority::default(),
        };
        Ok(NewCase {
            case_number: self.case_number.clone(),
            debtor_id: DebtorId::from_uuid(self.debtor_id),
            amount: parse_amount("amount", &self.amount)?,
            priority,
            due_date: parse_optional_date("due_date", self.due_date.as_deref())?,
            sla_due_date: parse_optional_date("sla_due_date", self.sla_due_date.as_deref())?,
        })
    }
}

impl Validate for CreateCaseRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(number) = &self.case_number {
            if number.trim().is_empty() {
                return Err("case_number must not be empty when given".to_string());
            }
            if number.len() > 64 {
                return Err("case_number must not exceed 64 characters".to_string());
            }
        }
        self.to_new_case().map(|_| ())
    }
}

/// Worklist filters. Comma-separated lists for status and priority.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCasesParams {
    pub agent_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    /// e.g. `ASSIGNED,IN_PROGRESS`
    pub status: Option<String>,
    /// e.g. `HIGH,CRITICAL`
    pub priority: Option<String>,
    /// Only cases whose SLA falls before this instant.
    pub sla_due_before: Option<String>,
    pub high_priority_only: Option<bool>,
    pub limit: Option<usize>,
}

impl ListCasesParams {
    fn to_query(&self) -> Result<CaseQuery, String> {
        fn list<T: std::str::FromStr>(raw: Option<&str>) -> Result<Vec<T>, String>
        where
            T::Err: std::fmt::Display,
        {
            raw.map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| p.parse::<T>().map_err(|e| e.to_string()))
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
        }

        Ok(CaseQuery {
            agent_id: self.agent_id.map(UserId::from_uuid),
            manager_id: self.manager_id.map(UserId::from_uuid),
            statuses: list::<CaseStatus>(self.status.as_deref())?,
            priorities: list::<Priority>(self.priority.as_deref())?,
            sla_due_before: parse_optional_date("sla_due_before", self.sla_due_before.as_deref())?,
            high_priority_only: self.high_priority_only.unwrap_or(false),
            limit: self.limit,
        })
    }
}

/// Request to move a case to another lifecycle state.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionRequest {
    /// Target state, e.g. ESCALATED.
    pub target_state: String,
    /// Reason; required when escalating.
    pub note: Option<String>,
}

impl Validate for TransitionRequest {
    fn validate(&self) -> Result<(), String> {
        self.target_state
            .parse::<CaseStatus>()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Request to place a pending case in a manager's portfolio.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AllocateRequest {
    pub manager_id: Uuid,
}

impl Validate for AllocateRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/cases", get(list_cases).post(create_case))
        .route("/v1/cases/{id}", get(get_case))
        .route("/v1/cases/{id}/transition", post(transition_case))
        .route("/v1/cases/{id}/allocate", post(allocate_case))
        .route("/v1/cases/{id}/assignments", get(case_assignments))
}

/// POST /v1/cases: Open a case.
#[utoipa::path(
    post,
    path = "/v1/cases",
    request_body = CreateCaseRequest,
    responses(
        (status = 201, description = "Case opened in PENDING", body = CaseView),
        (status = 404, description = "Debtor not found", body = crate::error::ErrorBody),
        (status = 409, description = "Duplicate case number", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
async fn create_case(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Result<Json<CreateCaseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CaseView>), AppError> {
    let req = extract_validated_json(body)?;
    let input = req.to_new_case().map_err(AppError::Validation)?;
    let case = state.engine.create_case(input, &actor)?;
    state.persist_case(case.id, &[]).await?;
    Ok((StatusCode::CREATED, Json(CaseView::from(&case))))
}

/// GET /v1/cases: The caller's worklist.
#[utoipa::path(
    get,
    path = "/v1/cases",
    params(ListCasesParams),
    responses(
        (status = 200, description = "Cases in worklist order", body = Vec<CaseView>),
        (status = 404, description = "Filter names another user's portfolio", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
async fn list_cases(
    State(state): State<AppState>,
    Caller(actor): Caller,
    params: Result<Query<ListCasesParams>, QueryRejection>,
) -> Result<Json<Vec<CaseView>>, AppError> {
    let params = extract_query(params)?;
    let query = params.to_query().map_err(AppError::Validation)?;
    let cases = state.engine.list_cases(query, &actor)?;
    Ok(Json(cases.iter().map(CaseView::from).collect()))
}

/// GET /v1/cases/{id}: Fetch a case with its transition history.
#[utoipa::path(
    get,
    path = "/v1/cases/{id}",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Case found", body = CaseView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
async fn get_case(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<CaseView>, AppError> {
    let case = state.engine.get_case(CaseId::from_uuid(id), &actor)?;
    Ok(Json(CaseView::from(&case)))
}

/// POST /v1/cases/{id}/transition: Move a case through its lifecycle.
#[utoipa::path(
    post,
    path = "/v1/cases/{id}/transition",
    params(("id" = Uuid, Path, description = "Case ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Transition applied, or already in the target state", body = CaseView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorBody),
        (status = 422, description = "Precondition not met", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
async fn transition_case(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<Json<CaseView>, AppError> {
    let req = extract_validated_json(body)?;
    let target = req
        .target_state
        .parse::<CaseStatus>()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let case = state.engine.transition(
        CaseId::from_uuid(id),
        target,
        &actor,
        req.note.as_deref(),
    )?;
    state.persist_case(case.id, &[]).await?;
    Ok(Json(CaseView::from(&case)))
}

/// POST /v1/cases/{id}/allocate: Allocate a pending case to a manager.
#[utoipa::path(
    post,
    path = "/v1/cases/{id}/allocate",
    params(("id" = Uuid, Path, description = "Case ID")),
    request_body = AllocateRequest,
    responses(
        (status = 200, description = "Case allocated", body = CaseView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already allocated", body = crate::error::ErrorBody),
        (status = 422, description = "Manager not eligible", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
async fn allocate_case(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<AllocateRequest>, JsonRejection>,
) -> Result<Json<CaseView>, AppError> {
    let req = extract_validated_json(body)?;
    let case = state.engine.allocate(
        CaseId::from_uuid(id),
        UserId::from_uuid(req.manager_id),
        &actor,
    )?;
    state.persist_case(case.id, &[]).await?;
    Ok(Json(CaseView::from(&case)))
}

/// GET /v1/cases/{id}/assignments: Assignment history, oldest first.
#[utoipa::path(
    get,
    path = "/v1/cases/{id}/assignments",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Assignment history", body = Vec<AssignmentView>),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
async fn case_assignments(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AssignmentView>>, AppError> {
    let history = state.engine.case_assignments(CaseId::from_uuid(id), &actor)?;
    Ok(Json(history.iter().map(AssignmentView::from).collect()))
}
