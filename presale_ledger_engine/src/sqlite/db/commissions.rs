use sqlx::SqliteConnection;

use crate::{commissions::CommissionPlan, db_types::CommissionRecord, traits::LedgerEngineError};

/// Inserts one planned commission for a payment. The UNIQUE (payment_id, level) constraint backs
/// the exactly-once-per-(payment, level) invariant independently of the credit transaction.
pub async fn insert_commission(
    payment_id: i64,
    plan: &CommissionPlan,
    conn: &mut SqliteConnection,
) -> Result<CommissionRecord, LedgerEngineError> {
    let record = sqlx::query_as(
        r#"
            INSERT INTO commissions (payment_id, beneficiary_id, source_user_id, level, amount, rate_bps)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(payment_id)
    .bind(&plan.beneficiary_id)
    .bind(&plan.source_user_id)
    .bind(plan.level)
    .bind(plan.amount)
    .bind(plan.rate_bps as i64)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => LedgerEngineError::PaymentStatusUpdateError(
            format!("Commission for payment #{payment_id} level {} already exists", plan.level),
        ),
        _ => LedgerEngineError::from(e),
    })?;
    Ok(record)
}

pub async fn fetch_for_beneficiary(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<CommissionRecord>, sqlx::Error> {
    let records = sqlx::query_as("SELECT * FROM commissions WHERE beneficiary_id = $1 ORDER BY created_at ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(records)
}

pub async fn fetch_for_payment(payment_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CommissionRecord>, sqlx::Error> {
    let records = sqlx::query_as("SELECT * FROM commissions WHERE payment_id = $1 ORDER BY level ASC")
        .bind(payment_id)
        .fetch_all(conn)
        .await?;
    Ok(records)
}
