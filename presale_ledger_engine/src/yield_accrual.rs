//! Time-based yield accrual.
//!
//! Pure functions over checkpointed account state: callers pass the purchased amount, the last
//! persisted accumulator and timestamp, and an explicit `now`. Safe to call at arbitrary polling
//! frequency; the authoritative checkpoint is only written at claim time, which is outside this
//! engine.

use chrono::{DateTime, Utc};
use plg_common::MicroToken;

use crate::rates::MONTHLY_YIELD_CAP_BPS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YieldAccrual {
    /// Total yield as of `now`: the persisted accumulator plus this session's accrual.
    pub current: MicroToken,
    /// Yield accrued since the last checkpoint.
    pub session: MicroToken,
}

/// Uncapped accrual, as shown by the live per-second display.
///
/// `session = purchased * hourly_rate_bps / 10_000 / 3600 * elapsed_seconds`, with elapsed time
/// clamped at zero so a clock skew can never produce negative yield.
pub fn accrue(
    purchased: MicroToken,
    accumulated: MicroToken,
    last_update: DateTime<Utc>,
    now: DateTime<Utc>,
    hourly_rate_bps: u32,
) -> YieldAccrual {
    let elapsed_secs = (now - last_update).num_seconds().max(0);
    let session = purchased.value() as i128 * hourly_rate_bps as i128 * elapsed_secs as i128 / 10_000 / 3600;
    let session = MicroToken::from(session.max(0) as i64);
    YieldAccrual { current: accumulated + session, session }
}

/// The monthly-capped variant used by the vesting-summary view: `current` is clamped to
/// `[0, purchased * monthly_cap_bps / 10_000]`.
pub fn accrue_capped(
    purchased: MicroToken,
    accumulated: MicroToken,
    last_update: DateTime<Utc>,
    now: DateTime<Utc>,
    hourly_rate_bps: u32,
) -> YieldAccrual {
    let uncapped = accrue(purchased, accumulated, last_update, now, hourly_rate_bps);
    let cap = purchased.scale_bps(MONTHLY_YIELD_CAP_BPS);
    let current = uncapped.current.min(cap).max(MicroToken::from(0));
    YieldAccrual { current, session: uncapped.session }
}
