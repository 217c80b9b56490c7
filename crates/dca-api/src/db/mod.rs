//! # Database Persistence Layer
//!
//! Optional Postgres write-through for the in-memory store via SQLx.
//!
//! When `DATABASE_URL` is set, every mutating request persists the rows it
//! changed and startup hydrates the store from the database. When absent,
//! the service runs in-memory only.
//!
//! Records are stored as JSONB documents with the columns needed for
//! ordering and lookup lifted out. Ledger rows are insert-only.

pub mod cases;
pub mod ledger;
pub mod parties;

use dca_workflow::Snapshot;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Everything the in-memory store holds, read back from Postgres.
pub async fn load_snapshot(pool: &PgPool) -> Result<Snapshot, sqlx::Error> {
    Ok(Snapshot {
        cases: cases::load_all(pool).await?,
        debtors: parties::load_debtors(pool).await?,
        assignments: cases::load_assignments(pool).await?,
        actions: ledger::load_all(pool).await?,
        profiles: parties::load_profiles(pool).await?,
        violations: parties::load_violations(pool).await?,
        rules: parties::load_rules(pool).await?,
    })
}

// ── Document codec ──────────────────────────────────────────────────

pub(crate) fn encode<T: Serialize>(
    table: &str,
    value: &T,
) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(table, error = %e, "failed to serialize record document");
        sqlx::Error::Encode(Box::new(e))
    })
}

/// A row that no longer decodes fails hydration rather than being skipped.
pub(crate) fn decode<T: DeserializeOwned>(
    table: &str,
    document: serde_json::Value,
) -> Result<T, sqlx::Error> {
    serde_json::from_value(document).map_err(|e| {
        tracing::error!(table, error = %e, "failed to deserialize record document");
        sqlx::Error::Decode(Box::new(e))
    })
}

/// Document-only row shape shared by the load queries.
#[derive(sqlx::FromRow)]
pub(crate) struct DocumentRow {
    pub document: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dca_core::{Money, Priority, Timestamp};
    use dca_state::Case;

    #[test]
    fn case_document_round_trips() {
        let at = Timestamp::parse("2026-03-02T09:00:00Z").unwrap();
        let case = Case::open(
            "CASE-1",
            dca_core::DebtorId::new(),
            Money::from_major(500),
            Priority::High,
            None,
            at,
        )
        .unwrap();
        let doc = encode("cases", &case).unwrap();
        let back: Case = decode("cases", doc).unwrap();
        assert_eq!(back, case);
    }

    #[test]
    fn malformed_document_is_a_decode_error() {
        let err = decode::<Case>("cases", serde_json::json!({"id": 7})).unwrap_err();
        assert!(matches!(err, sqlx::Error::Decode(_)));
    }
}
