use plg_common::{MicroToken, MicroUsdt};
use sqlx::SqliteConnection;

use crate::db_types::{GlobalMetrics, PhaseMetrics};

/// Adds a sale to the global and per-phase counters. Both statements are server-side
/// `x = x + delta` increments — the hot shared counters are never read-modify-written from the
/// caller.
pub async fn record_sale(
    phase: i64,
    tokens: MicroToken,
    value: MicroUsdt,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE global_metrics SET
       total_tokens_sold = total_tokens_sold + $1,
       total_value_contributed = total_value_contributed + $2,
       updated_at = CURRENT_TIMESTAMP
       WHERE id = 1
       "#,
    )
    .bind(tokens)
    .bind(value)
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        r#"INSERT INTO phase_metrics (phase, tokens_sold) VALUES ($1, $2)
       ON CONFLICT (phase) DO UPDATE SET tokens_sold = tokens_sold + excluded.tokens_sold
       "#,
    )
    .bind(phase)
    .bind(tokens)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_global(conn: &mut SqliteConnection) -> Result<GlobalMetrics, sqlx::Error> {
    sqlx::query_as("SELECT * FROM global_metrics WHERE id = 1").fetch_one(conn).await
}

pub async fn fetch_phase(phase: i64, conn: &mut SqliteConnection) -> Result<Option<PhaseMetrics>, sqlx::Error> {
    let metrics =
        sqlx::query_as("SELECT * FROM phase_metrics WHERE phase = $1").bind(phase).fetch_optional(conn).await?;
    Ok(metrics)
}
