//! Display helpers for Moroccan Dirham amounts.
//!
//! Amounts are shown the way the campaign pages render them: at most two
//! fraction digits, no trailing zeros, `.` between thousands and a decimal
//! comma.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::monetary::AMOUNT_DECIMAL_PLACES;

const GROUP_SEPARATOR: char = '.';
const DECIMAL_SEPARATOR: char = ',';

/// Format an amount, optionally followed by `MAD`.
pub fn format_currency(amount: Decimal, show_currency: bool) -> String {
    let formatted = format_number(amount);
    if show_currency {
        format!("{formatted} MAD")
    } else {
        formatted
    }
}

/// Format an amount followed by the short `DH` symbol.
pub fn format_currency_short(amount: Decimal) -> String {
    format!("{} DH", format_number(amount))
}

/// Plain number string for input fields.
pub fn format_currency_input(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// Parse a formatted amount back into a number.
///
/// Everything except digits, `.` and `-` is discarded, then the longest
/// leading number is read. Text with no number parses as zero.
pub fn parse_currency(text: &str) -> Decimal {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in cleaned.char_indices() {
        match c {
            '-' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            d if d.is_ascii_digit() => {
                seen_digit = true;
                end = i + 1;
            }
            _ => break,
        }
    }

    if !seen_digit {
        return Decimal::ZERO;
    }
    Decimal::from_str(&cleaned[..end]).unwrap_or(Decimal::ZERO)
}

fn format_number(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(AMOUNT_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let text = rounded.abs().to_string();
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut out = String::new();
    if rounded.is_sign_negative() && !rounded.is_zero() {
        out.push('-');
    }
    let digits = whole.len();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(c);
    }
    if let Some(fraction) = fraction {
        out.push(DECIMAL_SEPARATOR);
        out.push_str(fraction);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(dec!(1500), true), "1.500 MAD");
        assert_eq!(format_currency(dec!(1234567.5), false), "1.234.567,5");
        assert_eq!(format_currency(dec!(999.999), true), "1.000 MAD");
        assert_eq!(format_currency(dec!(12.30), true), "12,3 MAD");
        assert_eq!(format_currency(dec!(0), true), "0 MAD");
    }

    #[test]
    fn test_format_negative() {
        assert_eq!(format_currency(dec!(-2500.25), false), "-2.500,25");
        assert_eq!(format_currency(dec!(-0.001), false), "0");
    }

    #[test]
    fn test_format_currency_short() {
        assert_eq!(format_currency_short(dec!(250)), "250 DH");
        assert_eq!(format_currency_short(dec!(10000.1)), "10.000,1 DH");
    }

    #[test]
    fn test_format_currency_input() {
        assert_eq!(format_currency_input(dec!(120.50)), "120.5");
        assert_eq!(format_currency_input(dec!(7)), "7");
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("1 500 MAD"), dec!(1500));
        // Grouped output does not round-trip, matching parseFloat on the cleaned text
        assert_eq!(parse_currency("1.500 MAD"), dec!(1.5));
        assert_eq!(parse_currency("12.5 DH"), dec!(12.5));
        assert_eq!(parse_currency("-40.25"), dec!(-40.25));
        assert_eq!(parse_currency("12.5.3"), dec!(12.5));
        assert_eq!(parse_currency("MAD"), dec!(0));
        assert_eq!(parse_currency(""), dec!(0));
    }
}
