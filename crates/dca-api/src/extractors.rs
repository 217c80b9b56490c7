//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers to extract
//! and validate JSON bodies and query strings in handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;

use crate::error::AppError;

/// Request types that check business rules serde cannot express.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and run [`Validate`] on it.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Extract a query string, mapping parse errors to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Parse a decimal amount field from a request body.
pub fn parse_amount(field: &'static str, raw: &str) -> Result<dca_core::Money, String> {
    let money = dca_core::Money::parse_decimal(raw).map_err(|e| e.to_string())?;
    if money.is_positive() {
        Ok(money)
    } else {
        Err(format!("{field} must be greater than zero"))
    }
}

/// Parse a SCREAMING_SNAKE enum name, case-insensitively.
pub fn parse_enum<T: serde::de::DeserializeOwned>(field: &str, raw: &str) -> Result<T, String> {
    let name = raw.trim().to_ascii_uppercase();
    serde_json::from_value(serde_json::Value::String(name))
        .map_err(|_| format!("{field}: unknown value '{raw}'"))
}

/// Parse an optional `YYYY-MM-DD` or RFC 3339 date field.
pub fn parse_optional_date(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<dca_core::Timestamp>, String> {
    raw.map(|s| dca_core::Timestamp::parse_date_or_datetime(s).map_err(|e| format!("{field}: {e}")))
        .transpose()
}
