use thiserror::Error;

use crate::{
    db_types::{NewPaymentRecord, OrderId, PaymentRecord, PaymentStatus},
    traits::{AccountApiError, AccountManagement, CreditOutcome},
};

/// The write-side contract a storage backend must fulfil to host the ledger engine.
///
/// The backend owns the two correctness-critical mechanisms:
/// * "insert or fail on conflict" semantics for `order_id` and `tx_hash` — the serialization point
///   for duplicate deliveries across all intake paths;
/// * a single atomic transaction around [`credit_payment`](Self::credit_payment), so the account
///   update, metrics update, commission cascade and status flip commit together or not at all.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone + AccountManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Records a purchase intent. Idempotent: if a record with this `order_id` already exists it
    /// is returned unchanged, with `false` in the second slot.
    async fn insert_payment(&self, payment: NewPaymentRecord) -> Result<(PaymentRecord, bool), LedgerEngineError>;

    async fn fetch_payment_by_order_id(&self, order_id: &OrderId)
        -> Result<Option<PaymentRecord>, LedgerEngineError>;

    /// Looks a payment up by its on-chain transaction hash. Required so the same transaction can
    /// never be credited twice even when submitted through two different intake paths.
    async fn fetch_payment_by_tx_hash(&self, tx_hash: &str) -> Result<Option<PaymentRecord>, LedgerEngineError>;

    /// Attaches a transaction hash to an existing record. Fails with
    /// [`LedgerEngineError::TxHashAlreadyExists`] if another record already carries the hash.
    async fn attach_tx_hash(&self, order_id: &OrderId, tx_hash: &str) -> Result<PaymentRecord, LedgerEngineError>;

    /// Records a non-terminal lifecycle progression (e.g. `Waiting → Confirming`). Transitions
    /// that the state machine forbids return [`LedgerEngineError::PaymentStatusUpdateError`].
    async fn advance_payment_status(
        &self,
        order_id: &OrderId,
        status: PaymentStatus,
    ) -> Result<PaymentRecord, LedgerEngineError>;

    /// Moves a record into a terminal no-credit state (`Failed`, `Expired` or `Cancelled`).
    /// A record that is already terminal is returned unchanged.
    async fn annul_payment(&self, order_id: &OrderId, status: PaymentStatus)
        -> Result<PaymentRecord, LedgerEngineError>;

    /// Executes the exactly-once credit for a validated payment, in a single atomic transaction:
    ///
    /// 1. Re-fetches the record; if it is already in a credited terminal state the existing record
    ///    is returned without any mutation.
    /// 2. Loads the owning account ([`LedgerEngineError::AccountNotFound`] if missing).
    /// 3. Credits `token_balance`, `tokens_purchased` and `contributed_value` from the *recorded*
    ///    order amounts, marks the account an active contributor, and bumps the yield accrual
    ///    rate.
    /// 4. Appends the immutable contribution record.
    /// 5. Increments the global and per-phase sale counters server-side.
    /// 6. Walks the referral chain and credits up to three levels of commissions.
    /// 7. Flips the record to `Confirmed` — the commit point.
    ///
    /// Any failure aborts the whole transaction; the record keeps its pre-credit status so a later
    /// retry can re-attempt safely.
    async fn credit_payment(&self, order_id: &OrderId) -> Result<CreditOutcome, LedgerEngineError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerEngineError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerEngineError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Cannot insert payment, since one already exists with order id {0}")]
    PaymentAlreadyExists(OrderId),
    #[error("Transaction hash {0} is already linked to another payment")]
    TxHashAlreadyExists(String),
    #[error("The requested payment {0} does not exist")]
    PaymentNotFound(OrderId),
    #[error("The ledger account for user {0} does not exist")]
    AccountNotFound(String),
    #[error("Illegal payment status change. {0}")]
    PaymentStatusUpdateError(String),
    #[error("An external collaborator is unavailable: {0}")]
    ExternalServiceUnavailable(String),
    #[error("{0}")]
    AccountError(#[from] AccountApiError),
}

impl From<sqlx::Error> for LedgerEngineError {
    fn from(e: sqlx::Error) -> Self {
        LedgerEngineError::DatabaseError(e.to_string())
    }
}
