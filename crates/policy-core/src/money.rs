//! Money helpers. All USD and spending-limit arithmetic in this
//! workspace goes through `rust_decimal`; floats are never compared for
//! money.

pub use rust_decimal::Decimal;

/// Parses a decimal string, returning `None` on malformed input rather
/// than panicking. Callers that need a hard failure should map this to
/// their own `ConfigError`/`ValidationError` variant.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    s.trim().parse::<Decimal>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_plain_decimal() {
        assert_eq!(parse_decimal("12.50"), Some(dec!(12.50)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_decimal("not a number"), None);
    }
}
