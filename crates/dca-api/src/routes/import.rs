//! # Bulk Import API
//!
//! Accepts pre-parsed rows (file parsing happens upstream). Each row
//! creates or reuses a debtor and opens a case; bad rows are reported by
//! index and do not stop the batch.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use dca_workflow::{CaseStore, ImportRow};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;
use crate::views::ImportView;

/// Upper bound on rows per request.
const MAX_ROWS: usize = 5_000;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportRequest {
    /// Rows with raw text fields: full_name, email, phone, address,
    /// city, state, postal_code, case_number, amount, priority, due_date.
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<ImportRow>,
}

impl Validate for ImportRequest {
    fn validate(&self) -> Result<(), String> {
        if self.rows.len() > MAX_ROWS {
            return Err(format!("rows must not exceed {MAX_ROWS} entries"));
        }
        Ok(())
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/import", post(import_cases))
}

/// POST /v1/import: Import debtors and cases.
#[utoipa::path(
    post,
    path = "/v1/import",
    request_body = ImportRequest,
    responses(
        (status = 200, description = "Import report; status is COMPLETED, PARTIAL or FAILED", body = ImportView),
        (status = 404, description = "Managers and admins only", body = crate::error::ErrorBody),
    ),
    tag = "import"
)]
async fn import_cases(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<ImportView>, AppError> {
    let req = extract_validated_json(body)?;
    let report = state.engine.import_rows(req.rows, &actor)?;
    let store = state.engine.store();
    for case_id in &report.created {
        let Some(case) = store.case(*case_id).map_err(dca_workflow::WorkflowError::from)? else {
            continue;
        };
        if let Some(debtor) = store
            .debtor(case.debtor_id)
            .map_err(dca_workflow::WorkflowError::from)?
        {
            state.persist_debtor(&debtor).await?;
        }
        state.persist_case(case.id, &[]).await?;
    }
    tracing::info!(
        total = report.total,
        successful = report.successful,
        failed = report.failed,
        "import finished"
    );
    Ok(Json(ImportView::from(&report)))
}
