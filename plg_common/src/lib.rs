mod helpers;
mod micro_token;
mod micro_usdt;
pub mod numeric;

pub mod op;

pub use helpers::parse_boolean_flag;
pub use micro_token::{MicroToken, MicroTokenConversionError};
pub use micro_usdt::{MicroUsdt, MicroUsdtConversionError, USDT_CURRENCY_CODE, USDT_CURRENCY_CODE_LOWER};

/// Number of micro-units in one whole unit, for both [`MicroUsdt`] and [`MicroToken`].
pub const MICRO_PER_UNIT: i64 = 1_000_000;

/// Denominator for basis-point rate arithmetic.
pub const BPS_DENOMINATOR: i64 = 10_000;
