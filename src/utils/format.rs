//! Number and message formatting shared by the terminal, HTTP and Telegram front ends.

use rust_decimal::{Decimal, RoundingStrategy};

/// Format an amount with thousands separators and two decimals (`1234.5` -> `1,234.50`).
pub fn format_currency(amount: Decimal) -> String {
    format_grouped(amount, 2)
}

/// Format an amount with an explicit sign and dollar prefix (`+$12.00`, `-$3.50`).
pub fn format_signed_currency(amount: Decimal) -> String {
    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-${}", format_currency(amount.abs()))
    } else {
        format!("+${}", format_currency(amount))
    }
}

/// Round half away from zero to `decimals` places and pad to exactly that many (`12.55`, 1 -> `12.6`).
///
/// `Decimal`'s own `{:.N}` truncates instead.
pub fn format_fixed(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", decimals as usize, rounded)
}

/// Format a percentage value with two decimals (`12.345` -> `12.35%`).
pub fn format_percentage(value: Decimal) -> String {
    format!("{}%", format_fixed(value, 2))
}

fn format_grouped(amount: Decimal, decimals: u32) -> String {
    let rendered = format_fixed(amount, decimals);
    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Split a long message into chunks of at most `limit` characters.
///
/// Splits on line boundaries so HTML tags opened on a line stay intact;
/// a single line longer than `limit` is hard-split by characters.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_currency_groups_thousands() {
        assert_eq!(format_currency(dec!(1234567.891)), "1,234,567.89");
        assert_eq!(format_currency(dec!(999.5)), "999.50");
        assert_eq!(format_currency(dec!(-21600)), "-21,600.00");
        assert_eq!(format_currency(Decimal::ZERO), "0.00");
    }

    #[test]
    fn test_format_signed_currency() {
        assert_eq!(format_signed_currency(dec!(525)), "+$525.00");
        assert_eq!(format_signed_currency(dec!(-1250.5)), "-$1,250.50");
        assert_eq!(format_signed_currency(Decimal::ZERO), "+$0.00");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(dec!(7.8703)), "7.87%");
        assert_eq!(format_percentage(dec!(100)), "100.00%");
        assert_eq!(format_percentage(dec!(12.345)), "12.35%");
        assert_eq!(format_percentage(dec!(9.999)), "10.00%");
        assert_eq!(format_percentage(dec!(-0.125)), "-0.13%");
    }

    #[test]
    fn test_format_fixed_rounds_instead_of_truncating() {
        let distance = (dec!(43200) - dec!(40000)) / dec!(43200) * dec!(100);
        assert_eq!(format_fixed(distance, 2), "7.41");
        assert_eq!(format_fixed(dec!(12.55), 1), "12.6");
        assert_eq!(format_fixed(dec!(12.99), 1), "13.0");
        assert_eq!(format_fixed(dec!(0.125), 2), "0.13");
        assert_eq!(format_fixed(dec!(95.5), 4), "95.5000");
        assert_eq!(format_fixed(dec!(-2.5), 2), "-2.50");
    }

    #[test]
    fn test_split_message_short_is_untouched() {
        assert_eq!(split_message("hello", 4096), vec!["hello".to_string()]);
    }

    #[test]
    fn test_split_message_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc\n";
        let chunks = split_message(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n".to_string(), "cccc\n".to_string()]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_split_message_hard_splits_long_line() {
        let text = "x".repeat(25);
        let chunks = split_message(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), text);
    }
}
