use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPaymentRecord, OrderId, PaymentRecord, PaymentStatus},
    traits::LedgerEngineError,
};

/// Inserts the purchase intent, returning `false` in the second slot if the order already exists.
pub async fn idempotent_insert(
    payment: NewPaymentRecord,
    conn: &mut SqliteConnection,
) -> Result<(PaymentRecord, bool), LedgerEngineError> {
    let inserted = match fetch_by_order_id(&payment.order_id, conn).await? {
        Some(existing) => (existing, false),
        None => match insert_payment(payment, conn).await {
            Ok(record) => {
                debug!("📝️ Payment {} recorded with id {}", record.order_id, record.id);
                (record, true)
            },
            // A racing insert beat us to the unique constraint; the order is already being
            // processed, so hand back the winner's record.
            Err(LedgerEngineError::PaymentAlreadyExists(order_id)) => {
                let record = fetch_by_order_id(&order_id, conn)
                    .await?
                    .ok_or(LedgerEngineError::PaymentAlreadyExists(order_id))?;
                (record, false)
            },
            Err(e) => return Err(e),
        },
    };
    Ok(inserted)
}

/// Inserts a new payment record using the given connection. Not atomic on its own; embed the call
/// in a transaction and pass `&mut *tx` when atomicity is required.
async fn insert_payment(
    payment: NewPaymentRecord,
    conn: &mut SqliteConnection,
) -> Result<PaymentRecord, LedgerEngineError> {
    let order_id = payment.order_id.clone();
    let record = sqlx::query_as(
        r#"
            INSERT INTO payments (
                order_id,
                user_id,
                external_payment_id,
                network,
                pay_currency,
                value_usdt,
                token_amount,
                unit_price,
                sale_phase,
                raw_payload
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(payment.user_id)
    .bind(payment.external_payment_id)
    .bind(payment.network.to_string())
    .bind(payment.pay_currency)
    .bind(payment.value_usdt)
    .bind(payment.token_amount)
    .bind(payment.unit_price)
    .bind(payment.sale_phase)
    .bind(payment.raw_payload)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            LedgerEngineError::PaymentAlreadyExists(order_id)
        },
        _ => LedgerEngineError::from(e),
    })?;
    Ok(record)
}

pub async fn fetch_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    let record = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(record)
}

pub async fn fetch_by_tx_hash(tx_hash: &str, conn: &mut SqliteConnection) -> Result<Option<PaymentRecord>, sqlx::Error> {
    let record =
        sqlx::query_as("SELECT * FROM payments WHERE tx_hash = $1").bind(tx_hash).fetch_optional(conn).await?;
    Ok(record)
}

pub async fn fetch_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<PaymentRecord>, sqlx::Error> {
    let records = sqlx::query_as("SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(records)
}

/// Links an on-chain transaction hash to the record. The UNIQUE constraint on `tx_hash` fires if
/// another record already carries it — the cross-intake-path dedup backstop.
pub async fn attach_tx_hash(
    order_id: &OrderId,
    tx_hash: &str,
    conn: &mut SqliteConnection,
) -> Result<PaymentRecord, LedgerEngineError> {
    let record = sqlx::query_as(
        "UPDATE payments SET tx_hash = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 RETURNING *",
    )
    .bind(tx_hash)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            LedgerEngineError::TxHashAlreadyExists(tx_hash.to_string())
        },
        _ => LedgerEngineError::from(e),
    })?;
    record.ok_or_else(|| LedgerEngineError::PaymentNotFound(order_id.clone()))
}

/// Writes a new lifecycle status. The caller is responsible for having validated the transition;
/// this is a plain single-statement update stamping `updated_at`.
pub async fn update_status(
    order_id: &OrderId,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<PaymentRecord, LedgerEngineError> {
    let status = status.to_string();
    let record: Option<PaymentRecord> =
        sqlx::query_as("UPDATE payments SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 RETURNING *")
            .bind(status)
            .bind(order_id.as_str())
            .fetch_optional(conn)
            .await?;
    record.ok_or_else(|| LedgerEngineError::PaymentNotFound(order_id.clone()))
}

/// The idempotency commit point: flips the record to `Confirmed` and stamps `confirmed_at`. Made
/// deliberately the last write of the credit transaction.
pub async fn mark_confirmed(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<PaymentRecord, LedgerEngineError> {
    let record: Option<PaymentRecord> = sqlx::query_as(
        r#"UPDATE payments SET
            status = 'Confirmed',
            confirmed_at = CURRENT_TIMESTAMP,
            updated_at = CURRENT_TIMESTAMP
        WHERE order_id = $1
        RETURNING *"#,
    )
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    record.ok_or_else(|| LedgerEngineError::PaymentNotFound(order_id.clone()))
}
