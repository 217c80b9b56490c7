//! # Agent Action API
//!
//! Contact attempts and notes on a case. Entries are appended to the
//! hash-chained ledger and never change afterwards. Payments are recorded
//! through `/v1/cases/{id}/payments`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use dca_core::{CaseId, UserId};
use dca_state::{ActionDraft, ActionOutcome, ActionType};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{
    extract_validated_json, parse_amount, parse_enum, parse_optional_date, Validate,
};
use crate::state::AppState;
use crate::views::ActionView;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordActionRequest {
    /// CALL, EMAIL, SMS, CONTACT or NOTE.
    pub action_type: String,
    /// Defaults to the caller.
    pub agent_id: Option<Uuid>,
    /// e.g. RPC, PTP, NO_CONTACT, LEFT_MESSAGE.
    pub outcome: Option<String>,
    #[serde(default = "default_compliant")]
    pub compliant: bool,
    pub compliance_notes: Option<String>,
    pub notes: Option<String>,
    pub duration_seconds: Option<u32>,
    pub promise_amount: Option<String>,
    pub promise_date: Option<String>,
    pub next_follow_up: Option<String>,
}

fn default_compliant() -> bool {
    true
}

impl RecordActionRequest {
    fn to_draft(&self, case_id: CaseId, caller: UserId) -> Result<ActionDraft, String> {
        let action_type = self
            .action_type
            .parse::<ActionType>()
            .map_err(|e| e.to_string())?;
        let agent_id = self.agent_id.map_or(caller, UserId::from_uuid);
        let mut draft = ActionDraft::new(case_id, agent_id, action_type);
        draft.outcome = self
            .outcome
            .as_deref()
            .map(|o| parse_enum::<ActionOutcome>("outcome", o))
            .transpose()?;
        draft.compliant = self.compliant;
        draft.compliance_notes = self.compliance_notes.clone();
        draft.notes = self.notes.clone();
        draft.duration_seconds = self.duration_seconds;
        draft.promise_amount = self
            .promise_amount
            .as_deref()
            .map(|a| parse_amount("promise_amount", a))
            .transpose()?;
        draft.promise_date = parse_optional_date("promise_date", self.promise_date.as_deref())?;
        draft.next_follow_up =
            parse_optional_date("next_follow_up", self.next_follow_up.as_deref())?;
        Ok(draft)
    }
}

impl Validate for RecordActionRequest {
    fn validate(&self) -> Result<(), String> {
        self.to_draft(CaseId::new(), UserId::new())?;
        if self.promise_amount.is_some() && self.promise_date.is_none() {
            return Err("promise_date is required with promise_amount".to_string());
        }
        Ok(())
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/cases/{id}/actions", get(list_actions).post(record_action))
}

/// POST /v1/cases/{id}/actions: Record an agent action.
#[utoipa::path(
    post,
    path = "/v1/cases/{id}/actions",
    params(("id" = Uuid, Path, description = "Case ID")),
    request_body = RecordActionRequest,
    responses(
        (status = 201, description = "Action sealed into the ledger", body = ActionView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Case is closed", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "actions"
)]
async fn record_action(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<RecordActionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ActionView>), AppError> {
    let req = extract_validated_json(body)?;
    let draft = req
        .to_draft(CaseId::from_uuid(id), actor.id)
        .map_err(AppError::Validation)?;
    let action = state.engine.record_action(draft, &actor)?;
    state
        .persist_case(action.case_id(), std::slice::from_ref(&action))
        .await?;
    Ok((StatusCode::CREATED, Json(ActionView::from(&action))))
}

/// GET /v1/cases/{id}/actions: The case's ledger entries in order.
#[utoipa::path(
    get,
    path = "/v1/cases/{id}/actions",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Ledger entries", body = Vec<ActionView>),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "actions"
)]
async fn list_actions(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ActionView>>, AppError> {
    let actions = state.engine.case_actions(CaseId::from_uuid(id), &actor)?;
    Ok(Json(actions.iter().map(ActionView::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dca_core::Money;

    fn request(json: serde_json::Value) -> RecordActionRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn compliant_defaults_to_true() {
        let req = request(serde_json::json!({"action_type": "call"}));
        let draft = req.to_draft(CaseId::new(), UserId::new()).unwrap();
        assert!(draft.compliant);
        assert_eq!(draft.action_type, ActionType::Call);
    }

    #[test]
    fn agent_defaults_to_caller() {
        let caller = UserId::new();
        let req = request(serde_json::json!({"action_type": "NOTE"}));
        assert_eq!(req.to_draft(CaseId::new(), caller).unwrap().agent_id, caller);
    }

    #[test]
    fn promise_needs_a_date() {
        let req = request(serde_json::json!({
            "action_type": "CALL",
            "outcome": "PTP",
            "promise_amount": "2500"
        }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn promise_amount_is_parsed() {
        let req = request(serde_json::json!({
            "action_type": "CALL",
            "promise_amount": "2500.50",
            "promise_date": "2026-03-10"
        }));
        let draft = req.to_draft(CaseId::new(), UserId::new()).unwrap();
        assert_eq!(draft.promise_amount, Some(Money::from_minor(250_050)));
    }
}
