//! # Allocation Rules API
//!
//! Rule administration and the automatic allocation run over PENDING
//! cases.

use std::collections::HashSet;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use dca_core::{Priority, RuleId, UserId};
use dca_workflow::{NewRule, RuleKind};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_amount, Validate};
use crate::state::AppState;
use crate::views::{AllocationRunView, RuleView};

/// Request to create a routing rule.
///
/// Which condition fields apply depends on `rule_type`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRuleRequest {
    pub name: String,
    /// VALUE_BASED, GEO_BASED, RECOVERY_BASED or PRIORITY_BASED.
    pub rule_type: String,
    /// VALUE_BASED lower bound, decimal major units.
    pub min_amount: Option<String>,
    /// VALUE_BASED upper bound, decimal major units.
    pub max_amount: Option<String>,
    /// GEO_BASED debtor city.
    pub city: Option<String>,
    /// RECOVERY_BASED threshold, 0 to 100.
    pub min_probability: Option<u8>,
    /// PRIORITY_BASED case priority.
    pub case_priority: Option<String>,
    /// Evaluation order; lower runs first.
    #[serde(default)]
    pub priority: u32,
    pub target_manager_id: Uuid,
}

impl CreateRuleRequest {
    fn to_kind(&self) -> Result<RuleKind, String> {
        let kind = match self.rule_type.trim().to_ascii_uppercase().as_str() {
            "VALUE_BASED" => RuleKind::ValueBased {
                min: self
                    .min_amount
                    .as_deref()
                    .map(|a| parse_amount("min_amount", a))
                    .transpose()?,
                max: self
                    .max_amount
                    .as_deref()
                    .map(|a| parse_amount("max_amount", a))
                    .transpose()?,
            },
            "GEO_BASED" => RuleKind::GeoBased {
                city: self
                    .city
                    .clone()
                    .ok_or("GEO_BASED rules require city")?,
            },
            "RECOVERY_BASED" => RuleKind::RecoveryBased {
                min_probability: self
                    .min_probability
                    .ok_or("RECOVERY_BASED rules require min_probability")?,
            },
            "PRIORITY_BASED" => RuleKind::PriorityBased {
                priority: self
                    .case_priority
                    .as_deref()
                    .ok_or("PRIORITY_BASED rules require case_priority")?
                    .parse::<Priority>()
                    .map_err(|e| e.to_string())?,
            },
            other => return Err(format!("unknown rule_type '{other}'")),
        };
        kind.validate().map_err(|e| e.to_string())?;
        Ok(kind)
    }
}

impl Validate for CreateRuleRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        self.to_kind().map(|_| ())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RuleActiveRequest {
    pub is_active: bool,
}

impl Validate for RuleActiveRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/allocation/rules", get(list_rules).post(create_rule))
        .route("/v1/allocation/rules/{id}/active", put(set_rule_active))
        .route("/v1/allocation/run", post(run_allocation))
}

/// POST /v1/allocation/rules: Create a routing rule.
#[utoipa::path(
    post,
    path = "/v1/allocation/rules",
    request_body = CreateRuleRequest,
    responses(
        (status = 201, description = "Rule created", body = RuleView),
        (status = 422, description = "Invalid condition or target manager", body = crate::error::ErrorBody),
    ),
    tag = "allocation"
)]
async fn create_rule(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Result<Json<CreateRuleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RuleView>), AppError> {
    let req = extract_validated_json(body)?;
    let kind = req.to_kind().map_err(AppError::Validation)?;
    let rule = state.engine.create_rule(
        NewRule {
            name: req.name.trim().to_string(),
            kind,
            priority: req.priority,
            target_manager_id: UserId::from_uuid(req.target_manager_id),
        },
        &actor,
    )?;
    state.persist_rule(&rule).await?;
    Ok((StatusCode::CREATED, Json(RuleView::from(&rule))))
}

/// GET /v1/allocation/rules: Rules in evaluation order.
#[utoipa::path(
    get,
    path = "/v1/allocation/rules",
    responses((status = 200, description = "All rules", body = Vec<RuleView>)),
    tag = "allocation"
)]
async fn list_rules(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<Vec<RuleView>>, AppError> {
    let rules = state.engine.list_rules(&actor)?;
    Ok(Json(rules.iter().map(RuleView::from).collect()))
}

/// PUT /v1/allocation/rules/{id}/active: Enable or disable a rule.
#[utoipa::path(
    put,
    path = "/v1/allocation/rules/{id}/active",
    params(("id" = Uuid, Path, description = "Rule ID")),
    request_body = RuleActiveRequest,
    responses(
        (status = 200, description = "Rule updated", body = RuleView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "allocation"
)]
async fn set_rule_active(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<RuleActiveRequest>, JsonRejection>,
) -> Result<Json<RuleView>, AppError> {
    let req = extract_validated_json(body)?;
    let rule = state
        .engine
        .set_rule_active(RuleId::from_uuid(id), req.is_active, &actor)?;
    state.persist_rule(&rule).await?;
    Ok(Json(RuleView::from(&rule)))
}

/// POST /v1/allocation/run: Allocate every PENDING case.
#[utoipa::path(
    post,
    path = "/v1/allocation/run",
    responses(
        (status = 200, description = "Allocation report", body = AllocationRunView),
        (status = 404, description = "Admins only", body = crate::error::ErrorBody),
    ),
    tag = "allocation"
)]
async fn run_allocation(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<AllocationRunView>, AppError> {
    let run = state.engine.auto_allocate(&actor)?;
    for placed in &run.allocated {
        state.persist_case(placed.case_id, &[]).await?;
    }
    let applied: HashSet<RuleId> = run.allocated.iter().filter_map(|a| a.rule_id).collect();
    if !applied.is_empty() {
        for rule in state.engine.list_rules(&actor)? {
            if applied.contains(&rule.id) {
                state.persist_rule(&rule).await?;
            }
        }
    }
    tracing::info!(
        allocated = run.allocated.len(),
        unmatched = run.unmatched.len(),
        failed = run.failed.len(),
        "allocation run complete"
    );
    Ok(Json(AllocationRunView::from(&run)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dca_core::Money;

    fn request(json: serde_json::Value) -> CreateRuleRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn value_rule_bounds_are_decimal() {
        let req = request(serde_json::json!({
            "name": "Large balances",
            "rule_type": "value_based",
            "min_amount": "100000",
            "target_manager_id": Uuid::new_v4(),
        }));
        assert_eq!(
            req.to_kind().unwrap(),
            RuleKind::ValueBased {
                min: Some(Money::from_major(100_000)),
                max: None
            }
        );
    }

    #[test]
    fn missing_condition_field_is_rejected() {
        let req = request(serde_json::json!({
            "name": "Mumbai",
            "rule_type": "GEO_BASED",
            "target_manager_id": Uuid::new_v4(),
        }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let req = request(serde_json::json!({
            "name": "Broken",
            "rule_type": "VALUE_BASED",
            "min_amount": "500",
            "max_amount": "100",
            "target_manager_id": Uuid::new_v4(),
        }));
        assert!(req.to_kind().is_err());
    }
}
