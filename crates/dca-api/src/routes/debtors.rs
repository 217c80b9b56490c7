//! # Debtor API

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dca_core::DebtorId;
use dca_state::ContactDetails;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, Validate};
use crate::state::AppState;
use crate::views::{ActionView, DebtorView};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListDebtorsParams {
    /// Case-insensitive match on name, email or phone.
    pub search: Option<String>,
}

/// Contact fields. Absent fields are left unchanged on update.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ContactRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

impl ContactRequest {
    fn into_details(self) -> ContactDetails {
        ContactDetails {
            email: self.email,
            phone: self.phone,
            address: self.address,
            city: self.city,
            state: self.state,
            postal_code: self.postal_code,
        }
    }
}

impl Validate for ContactRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(email) = &self.email {
            if !email.trim().is_empty() && !email.contains('@') {
                return Err("email must contain '@'".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDebtorRequest {
    pub full_name: String,
    #[serde(flatten)]
    pub contact: ContactRequest,
}

impl Validate for CreateDebtorRequest {
    fn validate(&self) -> Result<(), String> {
        if self.full_name.trim().is_empty() {
            return Err("full_name must not be empty".to_string());
        }
        if self.full_name.len() > 255 {
            return Err("full_name must not exceed 255 characters".to_string());
        }
        self.contact.validate()
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/debtors", post(create_debtor).get(list_debtors))
        .route("/v1/debtors/{id}", get(get_debtor).patch(update_debtor))
        .route("/v1/debtors/{id}/payments", get(payment_history))
}

/// POST /v1/debtors: Register a debtor.
#[utoipa::path(
    post,
    path = "/v1/debtors",
    request_body = CreateDebtorRequest,
    responses(
        (status = 201, description = "Debtor created", body = DebtorView),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "debtors"
)]
async fn create_debtor(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Result<Json<CreateDebtorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DebtorView>), AppError> {
    let req = extract_validated_json(body)?;
    let debtor = state
        .engine
        .create_debtor(&req.full_name, req.contact.into_details(), &actor)?;
    state.persist_debtor(&debtor).await?;
    Ok((StatusCode::CREATED, Json(DebtorView::from(&debtor))))
}

/// GET /v1/debtors: Debtors, newest first.
#[utoipa::path(
    get,
    path = "/v1/debtors",
    params(ListDebtorsParams),
    responses(
        (status = 200, description = "Matching debtors", body = Vec<DebtorView>),
        (status = 400, description = "Malformed query", body = crate::error::ErrorBody),
    ),
    tag = "debtors"
)]
async fn list_debtors(
    State(state): State<AppState>,
    Caller(actor): Caller,
    params: Result<Query<ListDebtorsParams>, QueryRejection>,
) -> Result<Json<Vec<DebtorView>>, AppError> {
    let params = extract_query(params)?;
    let debtors = state.engine.list_debtors(params.search.as_deref(), &actor)?;
    Ok(Json(debtors.iter().map(DebtorView::from).collect()))
}

/// GET /v1/debtors/{id}/payments: PAYMENT entries across the debtor's
/// cases, newest first.
#[utoipa::path(
    get,
    path = "/v1/debtors/{id}/payments",
    params(("id" = Uuid, Path, description = "Debtor ID")),
    responses(
        (status = 200, description = "Payment ledger entries", body = Vec<ActionView>),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "debtors"
)]
async fn payment_history(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ActionView>>, AppError> {
    let payments = state
        .engine
        .debtor_payment_history(DebtorId::from_uuid(id), &actor)?;
    Ok(Json(payments.iter().map(ActionView::from).collect()))
}

/// GET /v1/debtors/{id}
#[utoipa::path(
    get,
    path = "/v1/debtors/{id}",
    params(("id" = Uuid, Path, description = "Debtor ID")),
    responses(
        (status = 200, description = "Debtor found", body = DebtorView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "debtors"
)]
async fn get_debtor(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<DebtorView>, AppError> {
    let debtor = state.engine.get_debtor(DebtorId::from_uuid(id), &actor)?;
    Ok(Json(DebtorView::from(&debtor)))
}

/// PATCH /v1/debtors/{id}: Update contact details.
#[utoipa::path(
    patch,
    path = "/v1/debtors/{id}",
    params(("id" = Uuid, Path, description = "Debtor ID")),
    request_body = ContactRequest,
    responses(
        (status = 200, description = "Debtor updated", body = DebtorView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "debtors"
)]
async fn update_debtor(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<DebtorView>, AppError> {
    let req = extract_validated_json(body)?;
    let debtor =
        state
            .engine
            .update_debtor_contact(DebtorId::from_uuid(id), req.into_details(), &actor)?;
    state.persist_debtor(&debtor).await?;
    Ok(Json(DebtorView::from(&debtor)))
}
