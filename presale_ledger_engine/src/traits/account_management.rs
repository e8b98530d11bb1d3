use thiserror::Error;

use crate::db_types::{
    CommissionRecord,
    ContributionRecord,
    GlobalMetrics,
    LedgerAccount,
    PaymentRecord,
    PhaseMetrics,
};

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        AccountApiError::DatabaseError(e.to_string())
    }
}

/// The `AccountManagement` trait defines the read side of the ledger store: account state,
/// payment and commission history, sale metrics, and the derived referral counts.
///
/// The [`LedgerDatabase`](crate::traits::LedgerDatabase) trait handles the actual machinery of
/// recording payments and crediting balances; `AccountManagement` only answers questions.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Fetches the ledger account for the given user id. If no account exists, `None` is returned.
    async fn fetch_account(&self, user_id: &str) -> Result<Option<LedgerAccount>, AccountApiError>;

    /// Fetches the ledger account for the given user id, creating an empty one (optionally linked
    /// to a referrer) if it does not exist yet.
    async fn fetch_or_create_account(
        &self,
        user_id: &str,
        referred_by: Option<&str>,
    ) -> Result<LedgerAccount, AccountApiError>;

    /// All payment records for the account, oldest first.
    async fn fetch_payments_for_account(&self, user_id: &str) -> Result<Vec<PaymentRecord>, AccountApiError>;

    /// All commissions credited to the account, oldest first.
    async fn fetch_commissions_for_account(&self, user_id: &str) -> Result<Vec<CommissionRecord>, AccountApiError>;

    /// The account's immutable contribution audit trail, oldest first.
    async fn fetch_contributions_for_account(&self, user_id: &str)
        -> Result<Vec<ContributionRecord>, AccountApiError>;

    /// The singleton global sale counters.
    async fn fetch_global_metrics(&self) -> Result<GlobalMetrics, AccountApiError>;

    /// Counters for a single sale phase, if the phase has seen any activity.
    async fn fetch_phase_metrics(&self, phase: i64) -> Result<Option<PhaseMetrics>, AccountApiError>;

    /// Number of direct and indirect referrals at levels 1 to 3. Derived by a bounded walk of the
    /// referral graph, never stored.
    async fn referral_counts(&self, user_id: &str) -> Result<[i64; 3], AccountApiError>;
}
