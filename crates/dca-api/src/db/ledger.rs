//! Agent action ledger persistence.
//!
//! Insert-only. Entries arrive already sealed by the store, so the hash
//! columns are copied, never recomputed here.

use dca_state::AgentAction;
use sqlx::PgPool;

use super::{decode, encode, DocumentRow};

/// Append sealed entries in one transaction.
///
/// A duplicate `sequence` fails the whole batch.
pub async fn append(pool: &PgPool, actions: &[AgentAction]) -> Result<(), sqlx::Error> {
    if actions.is_empty() {
        return Ok(());
    }
    let mut tx = pool.begin().await?;
    for action in actions {
        let document = encode("agent_actions", action)?;
        sqlx::query(
            "INSERT INTO agent_actions (id, sequence, case_id, entry_hash, previous_hash, document, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(action.id.as_uuid())
        .bind(action.sequence as i64)
        .bind(action.case_id().as_uuid())
        .bind(&action.entry_hash)
        .bind(&action.previous_hash)
        .bind(&document)
        .bind(action.created_at.as_datetime())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Load the ledger in append order.
pub async fn load_all(pool: &PgPool) -> Result<Vec<AgentAction>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        "SELECT document FROM agent_actions ORDER BY sequence",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|r| decode("agent_actions", r.document))
        .collect()
}
