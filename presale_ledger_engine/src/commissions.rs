//! Referral commission planning.
//!
//! Given a completed purchase and the payer's ancestor chain, this module computes the commissions
//! to pay — a bounded, pure computation. Resolving the chain (including cycle-breaking on
//! corrupted data) and applying the plan is the storage backend's job, inside the credit
//! transaction.

use plg_common::MicroToken;

use crate::rates::{referral_rate_bps, MAX_REFERRAL_DEPTH};

/// One planned commission payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionPlan {
    pub beneficiary_id: String,
    pub source_user_id: String,
    /// 1-based referral level.
    pub level: i64,
    pub rate_bps: u32,
    pub amount: MicroToken,
}

/// Plans commissions for a purchase of `tokens` by `source_user_id`, given the ancestor chain
/// (nearest first). Fewer than [`MAX_REFERRAL_DEPTH`] ancestors is normal termination, not an
/// error; surplus ancestors are ignored.
pub fn plan_commissions(source_user_id: &str, tokens: MicroToken, ancestors: &[String]) -> Vec<CommissionPlan> {
    ancestors
        .iter()
        .take(MAX_REFERRAL_DEPTH)
        .enumerate()
        .filter_map(|(i, beneficiary)| {
            let level = i + 1;
            let rate_bps = referral_rate_bps(level)?;
            Some(CommissionPlan {
                beneficiary_id: beneficiary.clone(),
                source_user_id: source_user_id.to_string(),
                level: level as i64,
                rate_bps,
                amount: tokens.scale_bps(rate_bps),
            })
        })
        .collect()
}
