use rust_decimal::{Decimal, RoundingStrategy};

use super::LedgerError;

/// Money is represented as `rust_decimal::Decimal` so repeated debits and
/// FX conversions never accumulate binary floating-point drift.
pub type Amount = Decimal;

/// Display symbol for the currencies the app knows about.
pub fn currency_symbol(code: &str) -> Option<&'static str> {
    match code.to_uppercase().as_str() {
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "KES" => Some("KSh"),
        "PHP" => Some("₱"),
        _ => None,
    }
}

/// Format an amount for display with exactly two decimal places.
/// Example: (1234.5, "USD") -> "$1234.50", (7, "JPY") -> "JPY 7.00"
pub fn format_currency(amount: Amount, currency: &str) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let mut abs = rounded.abs();
    abs.rescale(2);

    match currency_symbol(currency) {
        Some(symbol) => format!("{}{}{}", sign, symbol, abs),
        None => format!("{}{} {}", sign, currency.to_uppercase(), abs),
    }
}

/// Parse user input into an amount.
/// Example: "50.00" -> 50.00, " 12.5 " -> 12.5
pub fn parse_amount(input: &str) -> Result<Amount, LedgerError> {
    input
        .trim()
        .parse::<Decimal>()
        .map_err(|_| LedgerError::invalid_amount())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(dec!(120), "USD"), "$120.00");
        assert_eq!(format_currency(dec!(8129.25), "USD"), "$8129.25");
        assert_eq!(format_currency(dec!(1.5), "EUR"), "€1.50");
        assert_eq!(format_currency(dec!(0.005), "GBP"), "£0.01");
        assert_eq!(format_currency(dec!(1000), "KES"), "KSh1000.00");
        assert_eq!(format_currency(dec!(-5), "USD"), "-$5.00");
        assert_eq!(format_currency(dec!(0), "PHP"), "₱0.00");
    }

    #[test]
    fn test_format_currency_lowercase_code() {
        assert_eq!(format_currency(dec!(3), "usd"), "$3.00");
    }

    #[test]
    fn test_format_unknown_currency_uses_code_prefix() {
        assert_eq!(format_currency(dec!(42.1), "CHF"), "CHF 42.10");
    }

    #[test]
    fn test_format_truncates_extra_precision() {
        assert_eq!(format_currency(dec!(1.23456), "USD"), "$1.23");
        assert_eq!(format_currency(dec!(-0.001), "USD"), "$0.00");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("50.00").unwrap(), dec!(50));
        assert_eq!(parse_amount(" 12.5 ").unwrap(), dec!(12.5));
        assert_eq!(parse_amount("0.01").unwrap(), dec!(0.01));
    }

    #[test]
    fn test_parse_amount_invalid() {
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("").is_err());
        assert!(parse_amount("12.34.56").is_err());
        assert!(parse_amount("NaN").is_err());
    }
}
