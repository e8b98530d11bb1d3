//! `SqliteDatabase` is a concrete storage backend for the presale ledger engine.
//!
//! It implements the [`LedgerDatabase`] and [`AccountManagement`] traits on top of a sqlx
//! connection pool. The exactly-once credit runs as a single transaction here; the uniqueness
//! constraints in the schema do the cross-invocation serialization.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{accounts, commissions as commission_rows, contributions, db_url, metrics, new_pool, payments};
use crate::{
    commissions::plan_commissions,
    db_types::{
        CommissionRecord,
        ContributionRecord,
        GlobalMetrics,
        LedgerAccount,
        NewPaymentRecord,
        OrderId,
        PaymentRecord,
        PaymentStatus,
        PhaseMetrics,
    },
    rates,
    traits::{
        AccountApiError,
        AccountManagement,
        CreditOutcome,
        CreditResult,
        LedgerDatabase,
        LedgerEngineError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_payment(&self, payment: NewPaymentRecord) -> Result<(PaymentRecord, bool), LedgerEngineError> {
        let mut tx = self.pool.begin().await?;
        let result = payments::idempotent_insert(payment, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_payment_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<PaymentRecord>, LedgerEngineError> {
        let mut conn = self.pool.acquire().await?;
        let record = payments::fetch_by_order_id(order_id, &mut conn).await?;
        Ok(record)
    }

    async fn fetch_payment_by_tx_hash(&self, tx_hash: &str) -> Result<Option<PaymentRecord>, LedgerEngineError> {
        let mut conn = self.pool.acquire().await?;
        let record = payments::fetch_by_tx_hash(tx_hash, &mut conn).await?;
        Ok(record)
    }

    async fn attach_tx_hash(&self, order_id: &OrderId, tx_hash: &str) -> Result<PaymentRecord, LedgerEngineError> {
        let mut conn = self.pool.acquire().await?;
        let record = payments::attach_tx_hash(order_id, tx_hash, &mut conn).await?;
        debug!("🗃️ Transaction {tx_hash} linked to payment {order_id}");
        Ok(record)
    }

    async fn advance_payment_status(
        &self,
        order_id: &OrderId,
        status: PaymentStatus,
    ) -> Result<PaymentRecord, LedgerEngineError> {
        let mut tx = self.pool.begin().await?;
        let record = payments::fetch_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerEngineError::PaymentNotFound(order_id.clone()))?;
        if !record.status.can_transition_to(status) {
            return Err(LedgerEngineError::PaymentStatusUpdateError(format!(
                "Payment {order_id} cannot move from {} to {status}",
                record.status
            )));
        }
        let record = payments::update_status(order_id, status, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payment {order_id} advanced to {status}");
        Ok(record)
    }

    async fn annul_payment(
        &self,
        order_id: &OrderId,
        status: PaymentStatus,
    ) -> Result<PaymentRecord, LedgerEngineError> {
        if status.is_credited() || !status.is_terminal() {
            return Err(LedgerEngineError::PaymentStatusUpdateError(format!(
                "{status} is not a no-credit terminal status"
            )));
        }
        let mut tx = self.pool.begin().await?;
        let record = payments::fetch_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerEngineError::PaymentNotFound(order_id.clone()))?;
        if record.status.is_terminal() {
            // Terminal states are sticky; annulment of an annulled (or credited) record is a no-op.
            debug!("🗃️ Payment {order_id} is already {}; annulment skipped", record.status);
            tx.commit().await?;
            return Ok(record);
        }
        let record = payments::update_status(order_id, status, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Payment {order_id} annulled as {status}");
        Ok(record)
    }

    /// The exactly-once credit. Everything from the idempotency re-check to the status flip
    /// happens inside one transaction; the flip to `Confirmed` is deliberately the last write, so
    /// a crash anywhere earlier leaves the record uncredited and safely retryable.
    async fn credit_payment(&self, order_id: &OrderId) -> Result<CreditOutcome, LedgerEngineError> {
        let mut tx = self.pool.begin().await?;
        let record = payments::fetch_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerEngineError::PaymentNotFound(order_id.clone()))?;

        if record.status.is_credited() {
            debug!("🗃️ Payment {order_id} is already credited; returning the existing record");
            tx.commit().await?;
            return Ok(CreditOutcome::AlreadyCredited(record));
        }
        if record.status.is_terminal() {
            return Err(LedgerEngineError::PaymentStatusUpdateError(format!(
                "Payment {order_id} is {} and can never be credited",
                record.status
            )));
        }

        let account = accounts::fetch_account(&record.user_id, &mut tx).await?.ok_or_else(|| {
            error!("🗃️ Payment {order_id} references user {} who has no ledger account", record.user_id);
            LedgerEngineError::AccountNotFound(record.user_id.clone())
        })?;

        // The credited amounts come from the recorded order, never from the incoming signal.
        let tokens = record.token_amount;
        let value = record.value_usdt;
        let rate_delta = rates::yield_rate_per_minute(tokens);
        let updated = accounts::apply_purchase_credit(&record.user_id, tokens, value, rate_delta, &mut tx).await?;
        trace!("🗃️ Balance for {} is now {}", record.user_id, updated.token_balance);

        contributions::insert_contribution(record.id, &record.user_id, tokens, value, record.sale_phase, &mut tx)
            .await
            .map_err(LedgerEngineError::from)?;
        metrics::record_sale(record.sale_phase, tokens, value, &mut tx).await.map_err(LedgerEngineError::from)?;

        let ancestors = accounts::referral_chain(&record.user_id, account.referred_by.clone(), &mut tx).await?;
        let plans = plan_commissions(&record.user_id, tokens, &ancestors);
        let mut commissions = Vec::with_capacity(plans.len());
        for plan in &plans {
            let commission_rate_delta = rates::yield_rate_per_minute(plan.amount);
            accounts::apply_commission_credit(&plan.beneficiary_id, plan.amount, commission_rate_delta, &mut tx)
                .await?;
            let row = commission_rows::insert_commission(record.id, plan, &mut tx).await?;
            trace!("🗃️ Level {} commission of {} paid to {}", row.level, row.amount, row.beneficiary_id);
            commissions.push(row);
        }

        let confirmed = payments::mark_confirmed(order_id, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🗃️ Payment {order_id} credited: {tokens} tokens to {}, {} commission(s) cascaded",
            record.user_id,
            commissions.len()
        );
        Ok(CreditOutcome::Credited(CreditResult {
            order_id: confirmed.order_id,
            user_id: record.user_id,
            tokens_credited: tokens,
            value,
            new_balance: updated.token_balance,
            commissions,
        }))
    }

    async fn close(&mut self) -> Result<(), LedgerEngineError> {
        self.pool.close().await;
        Ok(())
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_account(&self, user_id: &str) -> Result<Option<LedgerAccount>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_account(user_id, &mut conn).await
    }

    async fn fetch_or_create_account(
        &self,
        user_id: &str,
        referred_by: Option<&str>,
    ) -> Result<LedgerAccount, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_or_create_account(user_id, referred_by, &mut conn).await
    }

    async fn fetch_payments_for_account(&self, user_id: &str) -> Result<Vec<PaymentRecord>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let records = payments::fetch_for_user(user_id, &mut conn).await?;
        Ok(records)
    }

    async fn fetch_commissions_for_account(&self, user_id: &str) -> Result<Vec<CommissionRecord>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let records = commission_rows::fetch_for_beneficiary(user_id, &mut conn).await?;
        Ok(records)
    }

    async fn fetch_contributions_for_account(
        &self,
        user_id: &str,
    ) -> Result<Vec<ContributionRecord>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let records = contributions::fetch_for_user(user_id, &mut conn).await?;
        Ok(records)
    }

    async fn fetch_global_metrics(&self) -> Result<GlobalMetrics, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let metrics = metrics::fetch_global(&mut conn).await?;
        Ok(metrics)
    }

    async fn fetch_phase_metrics(&self, phase: i64) -> Result<Option<PhaseMetrics>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let metrics = metrics::fetch_phase(phase, &mut conn).await?;
        Ok(metrics)
    }

    async fn referral_counts(&self, user_id: &str) -> Result<[i64; 3], AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        accounts::referral_counts(user_id, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
