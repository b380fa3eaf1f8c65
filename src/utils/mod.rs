//! Shared utilities: lenient decimal parsing and display formatting.

pub mod decimal;
pub mod format;

pub use decimal::{parse_decimal, parse_decimal_or, safe_div};
pub use format::{format_currency, format_fixed, format_percentage, format_signed_currency, split_message};
