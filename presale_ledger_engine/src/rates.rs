//! Canonical rate tables for yield accrual and referral commissions.
//!
//! All rates are expressed in basis points and applied with 128-bit integer arithmetic; nothing in
//! the engine multiplies balances by floats.

use plg_common::MicroToken;

/// Yield accrual rate: 5 bps (0.05%) of purchased holdings per hour.
pub const HOURLY_YIELD_RATE_BPS: u32 = 5;

/// Cap applied by the vesting-summary view: accrued yield never exceeds 30% of purchased holdings
/// per month.
pub const MONTHLY_YIELD_CAP_BPS: u32 = 3000;

/// Commission rates for referral levels 1 to 3. The crediting path's 5/2/1 table is canonical;
/// the 3/2/1 table that appeared in display copy is a documentation bug.
pub const REFERRAL_RATES_BPS: [u32; 3] = [500, 200, 100];

/// Commissions are paid at most this many ancestors up the referral chain.
pub const MAX_REFERRAL_DEPTH: usize = 3;

/// The commission rate for a 1-based referral level, if the level is paid at all.
pub fn referral_rate_bps(level: usize) -> Option<u32> {
    if level == 0 {
        return None;
    }
    REFERRAL_RATES_BPS.get(level - 1).copied()
}

/// The accrual-rate increase a credit of `tokens` contributes, in micro-tokens per minute.
///
/// `tokens * HOURLY_YIELD_RATE_BPS / 10_000 / 60`, rounded down. Rates are additive across
/// purchases; callers add this to the stored rate, never replace it.
pub fn yield_rate_per_minute(tokens: MicroToken) -> MicroToken {
    let per_minute = tokens.value() as i128 * HOURLY_YIELD_RATE_BPS as i128 / 10_000 / 60;
    MicroToken::from(per_minute as i64)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn level_rates() {
        assert_eq!(referral_rate_bps(1), Some(500));
        assert_eq!(referral_rate_bps(2), Some(200));
        assert_eq!(referral_rate_bps(3), Some(100));
        assert_eq!(referral_rate_bps(0), None);
        assert_eq!(referral_rate_bps(4), None);
    }

    #[test]
    fn rate_per_minute_from_purchase() {
        // 66.666666 tokens at 5 bps/hour accrue 555 micro-tokens per minute.
        assert_eq!(yield_rate_per_minute(MicroToken::from(66_666_666)), MicroToken::from(555));
        assert_eq!(yield_rate_per_minute(MicroToken::from(0)), MicroToken::from(0));
    }
}
