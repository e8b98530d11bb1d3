//! Defensive parsing for externally-sourced monetary values.
//!
//! Every monetary field in the store round-trips through a dynamically-typed transport (JSON from
//! the payment provider, RPC responses, client-submitted strings). These helpers guarantee that
//! whatever arrives, what reaches ledger arithmetic is a finite, non-negative number. They never
//! panic and never return NaN, infinities or negatives.

use serde_json::Value;

/// Clamps an arbitrary float to a finite, non-negative value. Non-finite input maps to
/// `max(0, default)`.
pub fn sanitize(value: f64, default: f64) -> f64 {
    let fallback = if default.is_finite() { default.max(0.0) } else { 0.0 };
    if value.is_finite() {
        value.max(0.0)
    } else {
        fallback
    }
}

/// Parses a decimal amount from a string. Whitespace is trimmed; anything that does not parse as a
/// finite number maps to `max(0, default)`.
pub fn parse_str_amount(s: &str, default: f64) -> f64 {
    match s.trim().parse::<f64>() {
        Ok(v) => sanitize(v, default),
        Err(_) => sanitize(f64::NAN, default),
    }
}

/// Parses a decimal amount from a JSON value. Numbers and numeric strings are accepted; null,
/// booleans, arrays and objects map to `max(0, default)`.
pub fn parse_json_amount(value: &Value, default: f64) -> f64 {
    match value {
        Value::Number(n) => sanitize(n.as_f64().unwrap_or(f64::NAN), default),
        Value::String(s) => parse_str_amount(s, default),
        _ => sanitize(f64::NAN, default),
    }
}

/// Converts a sanitized decimal to integer micro-units, rounding to nearest and saturating at
/// `i64::MAX`.
pub fn micro_from_f64(value: f64) -> i64 {
    let micro = (sanitize(value, 0.0) * 1_000_000.0).round();
    if micro >= i64::MAX as f64 {
        i64::MAX
    } else {
        micro as i64
    }
}
