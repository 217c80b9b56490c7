//! # Payment API

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use dca_core::CaseId;
use dca_state::PaymentMethod;
use dca_workflow::PaymentRequest;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_amount, parse_enum, Validate};
use crate::state::AppState;
use crate::views::{ActionView, CaseView, PaymentView};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    /// Decimal amount in major units.
    pub amount: String,
    /// BANK_TRANSFER, UPI, CHECK, CASH or CARD.
    pub method: String,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
}

impl RecordPaymentRequest {
    fn to_request(&self) -> Result<PaymentRequest, String> {
        Ok(PaymentRequest {
            amount: parse_amount("amount", &self.amount)?,
            method: parse_enum::<PaymentMethod>("method", &self.method)?,
            transaction_ref: self.transaction_ref.clone(),
            notes: self.notes.clone(),
        })
    }
}

impl Validate for RecordPaymentRequest {
    fn validate(&self) -> Result<(), String> {
        self.to_request().map(|_| ())
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/cases/{id}/payments", post(record_payment))
}

/// POST /v1/cases/{id}/payments: Apply a payment.
///
/// A payment that covers the outstanding amount resolves the case.
#[utoipa::path(
    post,
    path = "/v1/cases/{id}/payments",
    params(("id" = Uuid, Path, description = "Case ID")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 200, description = "Payment applied", body = PaymentView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Case does not accept payments", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
async fn record_payment(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<RecordPaymentRequest>, JsonRejection>,
) -> Result<Json<PaymentView>, AppError> {
    let req = extract_validated_json(body)?;
    let request = req.to_request().map_err(AppError::Validation)?;
    let receipt = state
        .engine
        .apply_payment(CaseId::from_uuid(id), request, &actor)?;
    state
        .persist_case(receipt.case.id, std::slice::from_ref(&receipt.action))
        .await?;
    Ok(Json(PaymentView {
        case: CaseView::from(&receipt.case),
        action: ActionView::from(&receipt.action),
        resolved: receipt.resolved,
        overpayment: receipt.overpayment.to_string(),
    }))
}
