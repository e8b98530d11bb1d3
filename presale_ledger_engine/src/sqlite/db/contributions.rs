use plg_common::{MicroToken, MicroUsdt};
use sqlx::SqliteConnection;

use crate::db_types::ContributionRecord;

/// Appends one immutable audit row for a credited payment.
pub async fn insert_contribution(
    payment_id: i64,
    user_id: &str,
    tokens: MicroToken,
    value: MicroUsdt,
    sale_phase: i64,
    conn: &mut SqliteConnection,
) -> Result<ContributionRecord, sqlx::Error> {
    let record = sqlx::query_as(
        r#"
            INSERT INTO contributions (payment_id, user_id, token_amount, value_usdt, sale_phase)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(payment_id)
    .bind(user_id)
    .bind(tokens)
    .bind(value)
    .bind(sale_phase)
    .fetch_one(conn)
    .await?;
    Ok(record)
}

pub async fn fetch_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<ContributionRecord>, sqlx::Error> {
    let records = sqlx::query_as("SELECT * FROM contributions WHERE user_id = $1 ORDER BY created_at ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(records)
}
