use std::collections::HashSet;

use log::{debug, trace, warn};
use plg_common::{MicroToken, MicroUsdt};
use sqlx::SqliteConnection;

use crate::db_types::LedgerAccount;
use crate::rates::MAX_REFERRAL_DEPTH;
use crate::traits::AccountApiError;

pub async fn fetch_account(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<LedgerAccount>, AccountApiError> {
    let account = sqlx::query_as("SELECT * FROM ledger_accounts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

/// Fetches the account, creating an empty one first if none exists. The referrer link is only set
/// at creation time; it is never rewritten for an existing account.
pub async fn fetch_or_create_account(
    user_id: &str,
    referred_by: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<LedgerAccount, AccountApiError> {
    if let Some(account) = fetch_account(user_id, &mut *conn).await? {
        return Ok(account);
    }
    let account = sqlx::query_as("INSERT INTO ledger_accounts (user_id, referred_by) VALUES ($1, $2) RETURNING *")
        .bind(user_id)
        .bind(referred_by)
        .fetch_one(conn)
        .await?;
    debug!("🧑️ Created new ledger account for user {user_id}");
    Ok(account)
}

/// The parent in the referral chain, if any.
pub async fn referrer_of(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<String>, AccountApiError> {
    let parent = sqlx::query_scalar::<_, Option<String>>("SELECT referred_by FROM ledger_accounts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(parent.flatten())
}

/// Applies a direct-purchase credit: balance, purchase basis, contributed value, contributor flag
/// and the additive yield-rate bump, all as one server-side update.
pub async fn apply_purchase_credit(
    user_id: &str,
    tokens: MicroToken,
    value: MicroUsdt,
    yield_rate_delta: MicroToken,
    conn: &mut SqliteConnection,
) -> Result<LedgerAccount, AccountApiError> {
    let account: Option<LedgerAccount> = sqlx::query_as(
        r#"UPDATE ledger_accounts SET
       token_balance = token_balance + $1,
       tokens_purchased = tokens_purchased + $1,
       contributed_value = contributed_value + $2,
       yield_rate_per_minute = yield_rate_per_minute + $3,
       last_yield_update = CURRENT_TIMESTAMP,
       is_active_contributor = 1,
       updated_at = CURRENT_TIMESTAMP
       WHERE user_id = $4
       RETURNING *
       "#,
    )
    .bind(tokens)
    .bind(value)
    .bind(yield_rate_delta)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    trace!("🧑️ Credited {tokens} tokens to user {user_id}");
    account.ok_or_else(|| AccountApiError::QueryError(format!("No ledger account for user {user_id}")))
}

/// Applies a referral commission credit to an ancestor: balance, commission subset, and the same
/// additive yield-rate bump a purchase gets.
pub async fn apply_commission_credit(
    user_id: &str,
    amount: MicroToken,
    yield_rate_delta: MicroToken,
    conn: &mut SqliteConnection,
) -> Result<LedgerAccount, AccountApiError> {
    let account: Option<LedgerAccount> = sqlx::query_as(
        r#"UPDATE ledger_accounts SET
       token_balance = token_balance + $1,
       commission_balance = commission_balance + $1,
       yield_rate_per_minute = yield_rate_per_minute + $2,
       last_yield_update = CURRENT_TIMESTAMP,
       updated_at = CURRENT_TIMESTAMP
       WHERE user_id = $3
       RETURNING *
       "#,
    )
    .bind(amount)
    .bind(yield_rate_delta)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    trace!("🧑️ Credited {amount} commission tokens to user {user_id}");
    account.ok_or_else(|| AccountApiError::QueryError(format!("No ledger account for user {user_id}")))
}

/// Resolves the payer's ancestor chain, nearest first, bounded at [`MAX_REFERRAL_DEPTH`] levels.
///
/// Only ancestors with an existing ledger account are returned; a dangling `referred_by` ends the
/// walk. The data model disallows referral cycles by construction, but the walk still tracks
/// visited ids and stops on the first repeat, so corrupted data cannot loop.
pub async fn referral_chain(
    payer_id: &str,
    first_parent: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Vec<String>, AccountApiError> {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(payer_id.to_string());
    let mut chain = Vec::with_capacity(MAX_REFERRAL_DEPTH);
    let mut cursor = first_parent;
    while chain.len() < MAX_REFERRAL_DEPTH {
        let Some(ancestor_id) = cursor.take() else { break };
        if !visited.insert(ancestor_id.clone()) {
            warn!("💸️ Referral cycle detected at user {ancestor_id}; halting the cascade walk");
            break;
        }
        let Some(ancestor) = fetch_account(&ancestor_id, &mut *conn).await? else {
            warn!("💸️ User {ancestor_id} is referenced as a referrer but has no ledger account");
            break;
        };
        cursor = ancestor.referred_by;
        chain.push(ancestor_id);
    }
    Ok(chain)
}

/// Direct and indirect referral counts at levels 1 to 3. The recursive walk is bounded at depth 3,
/// so even corrupted (cyclic) data cannot run away.
pub async fn referral_counts(user_id: &str, conn: &mut SqliteConnection) -> Result<[i64; 3], AccountApiError> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        WITH RECURSIVE downline(user_id, depth) AS (
            SELECT user_id, 1 FROM ledger_accounts WHERE referred_by = $1
            UNION ALL
            SELECT la.user_id, d.depth + 1
            FROM ledger_accounts la JOIN downline d ON la.referred_by = d.user_id
            WHERE d.depth < 3
        )
        SELECT depth, COUNT(*) FROM downline GROUP BY depth
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    let mut counts = [0i64; 3];
    for (depth, n) in rows {
        if (1..=3).contains(&depth) {
            counts[(depth - 1) as usize] = n;
        }
    }
    Ok(counts)
}
