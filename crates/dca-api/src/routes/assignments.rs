//! # Assignment API
//!
//! Batch handoff of cases from a manager to an agent. Each case succeeds
//! or fails on its own; the response reports both lists.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use dca_core::{CaseId, UserId};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;
use crate::views::BatchAssignView;

/// Upper bound on cases per request.
const MAX_BATCH: usize = 500;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRequest {
    pub case_ids: Vec<Uuid>,
    pub agent_id: Uuid,
    /// The manager whose portfolio the cases are in.
    pub manager_id: Uuid,
}

impl Validate for AssignRequest {
    fn validate(&self) -> Result<(), String> {
        if self.case_ids.is_empty() {
            return Err("case_ids must not be empty".to_string());
        }
        if self.case_ids.len() > MAX_BATCH {
            return Err(format!("case_ids must not exceed {MAX_BATCH} entries"));
        }
        Ok(())
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/assignments", post(assign_cases))
}

/// POST /v1/assignments: Assign cases to an agent.
#[utoipa::path(
    post,
    path = "/v1/assignments",
    request_body = AssignRequest,
    responses(
        (status = 200, description = "Per-case outcome", body = BatchAssignView),
        (status = 404, description = "Caller may not assign for this manager", body = crate::error::ErrorBody),
        (status = 422, description = "Agent not eligible", body = crate::error::ErrorBody),
    ),
    tag = "assignments"
)]
async fn assign_cases(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Result<Json<AssignRequest>, JsonRejection>,
) -> Result<Json<BatchAssignView>, AppError> {
    let req = extract_validated_json(body)?;
    let case_ids: Vec<CaseId> = req.case_ids.iter().copied().map(CaseId::from_uuid).collect();
    let outcome = state.engine.assign(
        &case_ids,
        UserId::from_uuid(req.agent_id),
        UserId::from_uuid(req.manager_id),
        &actor,
    )?;
    for done in &outcome.succeeded {
        state.persist_case(done.case_id, &[]).await?;
    }
    if !outcome.failed.is_empty() {
        tracing::info!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "batch assignment partially applied"
        );
    }
    Ok(Json(BatchAssignView::from(&outcome)))
}
