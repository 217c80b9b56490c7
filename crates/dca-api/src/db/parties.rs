//! Debtor, profile, violation and allocation-rule persistence.

use dca_state::{ComplianceViolation, Debtor, UserProfile};
use dca_workflow::AllocationRule;
use sqlx::PgPool;

use super::{decode, encode, DocumentRow};

pub async fn upsert_debtor(pool: &PgPool, debtor: &Debtor) -> Result<(), sqlx::Error> {
    let document = encode("debtors", debtor)?;
    sqlx::query(
        "INSERT INTO debtors (id, email, phone, document, updated_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (id) DO UPDATE SET
             email = EXCLUDED.email,
             phone = EXCLUDED.phone,
             document = EXCLUDED.document,
             updated_at = EXCLUDED.updated_at",
    )
    .bind(debtor.id.as_uuid())
    .bind(&debtor.email)
    .bind(&debtor.phone)
    .bind(&document)
    .bind(debtor.updated_at.as_datetime())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_profile(pool: &PgPool, profile: &UserProfile) -> Result<(), sqlx::Error> {
    let document = encode("user_profiles", profile)?;
    sqlx::query(
        "INSERT INTO user_profiles (id, role, is_active, document)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (id) DO UPDATE SET
             role = EXCLUDED.role,
             is_active = EXCLUDED.is_active,
             document = EXCLUDED.document",
    )
    .bind(profile.id.as_uuid())
    .bind(profile.role.as_str())
    .bind(profile.is_active)
    .bind(&document)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_violation(
    pool: &PgPool,
    violation: &ComplianceViolation,
) -> Result<(), sqlx::Error> {
    let document = encode("compliance_violations", violation)?;
    sqlx::query(
        "INSERT INTO compliance_violations (id, case_id, status, document, occurred_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (id) DO UPDATE SET
             status = EXCLUDED.status,
             document = EXCLUDED.document",
    )
    .bind(violation.id.as_uuid())
    .bind(violation.case_id.as_uuid())
    .bind(violation.status.as_str())
    .bind(&document)
    .bind(violation.occurred_at.as_datetime())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_rule(pool: &PgPool, rule: &AllocationRule) -> Result<(), sqlx::Error> {
    let document = encode("allocation_rules", rule)?;
    sqlx::query(
        "INSERT INTO allocation_rules (id, priority, is_active, document, created_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (id) DO UPDATE SET
             priority = EXCLUDED.priority,
             is_active = EXCLUDED.is_active,
             document = EXCLUDED.document",
    )
    .bind(rule.id.as_uuid())
    .bind(rule.priority as i32)
    .bind(rule.is_active)
    .bind(&document)
    .bind(rule.created_at.as_datetime())
    .execute(pool)
    .await?;
    Ok(())
}

async fn load_documents<T: serde::de::DeserializeOwned>(
    pool: &PgPool,
    table: &'static str,
    sql: &'static str,
) -> Result<Vec<T>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>(sql).fetch_all(pool).await?;
    rows.into_iter().map(|r| decode(table, r.document)).collect()
}

pub async fn load_debtors(pool: &PgPool) -> Result<Vec<Debtor>, sqlx::Error> {
    load_documents(pool, "debtors", "SELECT document FROM debtors").await
}

pub async fn load_profiles(pool: &PgPool) -> Result<Vec<UserProfile>, sqlx::Error> {
    load_documents(pool, "user_profiles", "SELECT document FROM user_profiles").await
}

pub async fn load_violations(pool: &PgPool) -> Result<Vec<ComplianceViolation>, sqlx::Error> {
    load_documents(
        pool,
        "compliance_violations",
        "SELECT document FROM compliance_violations ORDER BY occurred_at",
    )
    .await
}

pub async fn load_rules(pool: &PgPool) -> Result<Vec<AllocationRule>, sqlx::Error> {
    load_documents(
        pool,
        "allocation_rules",
        "SELECT document FROM allocation_rules ORDER BY priority, created_at",
    )
    .await
}
