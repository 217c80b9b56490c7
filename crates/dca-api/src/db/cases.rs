//! Case and assignment persistence.
//!
//! Cases are upserted whole after every committed change; the in-memory
//! store has already checked the version, so the row simply takes the
//! newer document.

use dca_state::{Case, CaseAssignment};
use sqlx::PgPool;

use super::{decode, encode, DocumentRow};

/// Insert or replace a case row.
pub async fn upsert(pool: &PgPool, case: &Case) -> Result<(), sqlx::Error> {
    let document = encode("cases", case)?;
    sqlx::query(
        "INSERT INTO cases (id, case_number, debtor_id, status, version, document, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (id) DO UPDATE SET
             status = EXCLUDED.status,
             version = EXCLUDED.version,
             document = EXCLUDED.document,
             updated_at = EXCLUDED.updated_at
         WHERE cases.version <= EXCLUDED.version",
    )
    .bind(case.id.as_uuid())
    .bind(&case.case_number)
    .bind(case.debtor_id.as_uuid())
    .bind(case.status.as_str())
    .bind(case.version as i64)
    .bind(&document)
    .bind(case.created_at.as_datetime())
    .bind(case.updated_at.as_datetime())
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert or replace an assignment row.
///
/// Deactivations arrive as updates to the previously active row.
pub async fn upsert_assignment(
    pool: &PgPool,
    assignment: &CaseAssignment,
) -> Result<(), sqlx::Error> {
    let document = encode("case_assignments", assignment)?;
    sqlx::query(
        "INSERT INTO case_assignments (id, case_id, is_active, document, assignment_date)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (id) DO UPDATE SET
             is_active = EXCLUDED.is_active,
             document = EXCLUDED.document",
    )
    .bind(assignment.id.as_uuid())
    .bind(assignment.case_id.as_uuid())
    .bind(assignment.is_active)
    .bind(&document)
    .bind(assignment.assignment_date.as_datetime())
    .execute(pool)
    .await?;
    Ok(())
}

/// Load all cases on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Case>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        "SELECT document FROM cases ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(|r| decode("cases", r.document)).collect()
}

/// Load the full assignment history on startup.
pub async fn load_assignments(pool: &PgPool) -> Result<Vec<CaseAssignment>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        "SELECT document FROM case_assignments ORDER BY assignment_date",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|r| decode("case_assignments", r.document))
        .collect()
}
