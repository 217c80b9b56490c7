//! # User Profile API
//!
//! Profiles carry the role and active flag every request is checked
//! against. Identity issuance stays outside this service.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::put;
use axum::{Json, Router};
use dca_core::{Role, UserId};
use dca_state::UserProfile;
use dca_workflow::CaseStore;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;
use crate::views::ProfileView;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PutProfileRequest {
    pub email: String,
    pub full_name: String,
    /// ADMIN, MANAGER, AGENT or VIEWER.
    pub role: String,
    pub department: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Validate for PutProfileRequest {
    fn validate(&self) -> Result<(), String> {
        if !self.email.contains('@') {
            return Err("email must contain '@'".to_string());
        }
        if self.full_name.trim().is_empty() {
            return Err("full_name must not be empty".to_string());
        }
        self.role.parse::<Role>().map(|_| ()).map_err(|e| e.to_string())
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/profiles/{id}", put(put_profile))
}

/// PUT /v1/profiles/{id}: Create or replace a user profile.
#[utoipa::path(
    put,
    path = "/v1/profiles/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = PutProfileRequest,
    responses(
        (status = 200, description = "Profile saved", body = ProfileView),
        (status = 404, description = "Admins only", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "profiles"
)]
async fn put_profile(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<PutProfileRequest>, JsonRejection>,
) -> Result<Json<ProfileView>, AppError> {
    let req = extract_validated_json(body)?;
    let role = req
        .role
        .parse::<Role>()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let id = UserId::from_uuid(id);
    let last_login_at = state
        .engine
        .store()
        .profile(id)
        .map_err(dca_workflow::WorkflowError::from)?
        .and_then(|p| p.last_login_at);
    let profile = state.engine.put_profile(
        UserProfile {
            id,
            email: req.email.trim().to_string(),
            full_name: req.full_name.trim().to_string(),
            role,
            department: req.department,
            is_active: req.is_active,
            last_login_at,
        },
        &actor,
    )?;
    state.persist_profile(&profile).await?;
    Ok(Json(ProfileView::from(&profile)))
}
