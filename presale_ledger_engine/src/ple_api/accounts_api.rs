//! Unified read API for ledger accounts and sale metrics.

use std::fmt::Debug;

use chrono::Utc;

use crate::{
    db_types::{CommissionRecord, ContributionRecord, GlobalMetrics, LedgerAccount, PaymentRecord, PhaseMetrics},
    rates::HOURLY_YIELD_RATE_BPS,
    traits::{AccountApiError, AccountManagement},
    yield_accrual::{accrue, accrue_capped, YieldAccrual},
};

/// The `AccountApi` provides a unified API for reading accounts, balances and sale metrics.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Fetches the ledger account for the given user id. If no account exists, `None` is returned.
    pub async fn account_by_id(&self, user_id: &str) -> Result<Option<LedgerAccount>, AccountApiError> {
        self.db.fetch_account(user_id).await
    }

    pub async fn payments_for_account(&self, user_id: &str) -> Result<Vec<PaymentRecord>, AccountApiError> {
        self.db.fetch_payments_for_account(user_id).await
    }

    pub async fn commissions_for_account(&self, user_id: &str) -> Result<Vec<CommissionRecord>, AccountApiError> {
        self.db.fetch_commissions_for_account(user_id).await
    }

    pub async fn contributions_for_account(&self, user_id: &str) -> Result<Vec<ContributionRecord>, AccountApiError> {
        self.db.fetch_contributions_for_account(user_id).await
    }

    pub async fn global_metrics(&self) -> Result<GlobalMetrics, AccountApiError> {
        self.db.fetch_global_metrics().await
    }

    pub async fn phase_metrics(&self, phase: i64) -> Result<Option<PhaseMetrics>, AccountApiError> {
        self.db.fetch_phase_metrics(phase).await
    }

    /// Direct and indirect referral counts at levels 1 to 3, derived from the referral graph.
    pub async fn referral_counts(&self, user_id: &str) -> Result<[i64; 3], AccountApiError> {
        self.db.referral_counts(user_id).await
    }

    /// The live, uncapped yield accrual as of now. This is what the client's 1Hz display polls;
    /// it never writes a checkpoint.
    pub async fn yield_preview(&self, user_id: &str) -> Result<Option<YieldAccrual>, AccountApiError> {
        let Some(account) = self.db.fetch_account(user_id).await? else {
            return Ok(None);
        };
        Ok(Some(accrue(
            account.tokens_purchased,
            account.accumulated_yield,
            account.last_yield_update,
            Utc::now(),
            HOURLY_YIELD_RATE_BPS,
        )))
    }

    /// The monthly-capped accrual for the vesting-summary view.
    pub async fn vesting_summary(&self, user_id: &str) -> Result<Option<YieldAccrual>, AccountApiError> {
        let Some(account) = self.db.fetch_account(user_id).await? else {
            return Ok(None);
        };
        Ok(Some(accrue_capped(
            account.tokens_purchased,
            account.accumulated_yield,
            account.last_yield_update,
            Utc::now(),
            HOURLY_YIELD_RATE_BPS,
        )))
    }
}
