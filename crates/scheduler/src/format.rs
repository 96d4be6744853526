//! Report formatting.

use rust_decimal::Decimal;

/// Formats an amount as dollars with thousands separators, e.g. `$12,345.67`.
pub fn format_usd(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{cents}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_usd(dec!(12345.67)), "$12,345.67");
        assert_eq!(format_usd(dec!(1234567.8)), "$1,234,567.80");
        assert_eq!(format_usd(dec!(103245.8)), "$103,245.80");
    }

    #[test]
    fn small_and_zero_amounts() {
        assert_eq!(format_usd(dec!(999.999)), "$1,000.00");
        assert_eq!(format_usd(dec!(5)), "$5.00");
        assert_eq!(format_usd(dec!(0)), "$0.00");
    }

    #[test]
    fn negative_amounts() {
        assert_eq!(format_usd(dec!(-1234.5)), "-$1,234.50");
    }
}
