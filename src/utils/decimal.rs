//! Decimal arithmetic utilities for financial calculations.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

/// Parse an exchange numeric string, returning `None` for blank or malformed input.
///
/// Bybit encodes every number as a string and uses `""` for "not set"
/// (e.g. `liqPrice` on a position without liquidation risk). Scientific
/// notation shows up on tiny values and is accepted too.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Parse an exchange numeric string, falling back to `default` when absent or malformed.
pub fn parse_decimal_or(raw: &str, default: Decimal) -> Decimal {
    parse_decimal(raw).unwrap_or(default)
}

/// Calculate percentage difference between two values.
pub fn percentage_diff(a: Decimal, b: Decimal) -> Decimal {
    if b == Decimal::ZERO {
        return Decimal::ZERO;
    }
    ((a - b) / b).abs() * dec!(100)
}

/// Safe division that returns zero if divisor is zero.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator == Decimal::ZERO {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}
