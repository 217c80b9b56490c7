//! # Worklist Summary API

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::auth::Caller;
use crate::error::AppError;
use crate::state::AppState;
use crate::views::WorklistSummaryView;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/worklist/summary", get(worklist_summary))
}

/// GET /v1/worklist/summary: Counters over the caller's worklist.
#[utoipa::path(
    get,
    path = "/v1/worklist/summary",
    responses((status = 200, description = "Worklist counters", body = WorklistSummaryView)),
    tag = "worklist"
)]
async fn worklist_summary(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<WorklistSummaryView>, AppError> {
    let summary = state.engine.worklist_summary(&actor)?;
    Ok(Json(WorklistSummaryView::from(&summary)))
}
