//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`WorkflowError`] kinds to HTTP status codes and returns a JSON
//! body with a machine-readable code and a message.
//!
//! A case the caller may not touch answers exactly like a case that does
//! not exist: both become 404 `NOT_FOUND` with the same message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dca_workflow::WorkflowError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "INVALID_TRANSITION").
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found, or outside the caller's scope (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// A business precondition does not hold (422).
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict with current resource state (409). The code names the kind.
    #[error("{message}")]
    Conflict {
        code: &'static str,
        message: String,
    },

    /// Backing store unreachable (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::PreconditionFailed(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PRECONDITION_FAILED")
            }
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Conflict { code, .. } => (StatusCode::CONFLICT, code),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

const HIDDEN: &str = "resource not found";

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::NotFound { .. } | WorkflowError::Unauthorized(_) => {
                tracing::debug!(error = %err, "request refused as not found");
                Self::NotFound(HIDDEN.to_string())
            }
            WorkflowError::InvalidTransition { .. }
            | WorkflowError::AlreadyAllocated { .. }
            | WorkflowError::AlreadyAssigned { .. }
            | WorkflowError::ConcurrentModification { .. } => Self::Conflict {
                code: err.code(),
                message: err.to_string(),
            },
            WorkflowError::PreconditionFailed(msg) => Self::PreconditionFailed(msg),
            WorkflowError::Validation(e) => Self::Validation(e.to_string()),
            WorkflowError::StoreUnavailable(msg) => Self::ServiceUnavailable(msg),
        }
    }
}

impl From<dca_core::ValidationError> for AppError {
    fn from(err: dca_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dca_core::{CaseId, UserId};
    use dca_state::CaseStatus;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    // ── Workflow mapping ─────────────────────────────────────────────

    #[tokio::test]
    async fn missing_and_out_of_scope_look_identical() {
        let (s1, b1) = body_json(WorkflowError::Unauthorized("case:x is outside".into()).into()).await;
        let (s2, b2) = body_json(
            WorkflowError::NotFound {
                kind: "case",
                id: "x".into(),
            }
            .into(),
        )
        .await;
        assert_eq!(s1, StatusCode::NOT_FOUND);
        assert_eq!(s1, s2);
        assert_eq!(b1, b2);
    }

    #[tokio::test]
    async fn conflicts_carry_their_kind() {
        let (status, body) = body_json(
            WorkflowError::AlreadyAssigned {
                case_id: CaseId::new(),
                agent_id: UserId::new(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "ALREADY_ASSIGNED");

        let (status, body) = body_json(
            WorkflowError::AlreadyAllocated {
                case_id: CaseId::new(),
                status: CaseStatus::Allocated,
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "ALREADY_ALLOCATED");
    }

    #[test]
    fn precondition_and_validation_are_422() {
        let p: AppError = WorkflowError::PreconditionFailed("no agent".into()).into();
        assert_eq!(p.status_and_code().0, StatusCode::UNPROCESSABLE_ENTITY);
        let v: AppError = dca_core::ValidationError::EmptyField("name").into();
        assert_eq!(v.status_and_code().0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn store_outage_is_503() {
        let e: AppError = WorkflowError::StoreUnavailable("pool closed".into()).into();
        assert_eq!(e.status_and_code().0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn internal_message_is_hidden() {
        let (status, body) = body_json(AppError::Internal("db password wrong".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }
}
