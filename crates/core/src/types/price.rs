//! Money helpers.
//!
//! Amounts are stored as `NUMERIC(12, 2)` and travel over JSON as strings
//! (`rust_decimal`'s `serde-with-str`), so no float ever touches money.

use rust_decimal::{Decimal, RoundingStrategy};

/// Largest amount a `NUMERIC(12, 2)` column can hold.
pub const MAX_MONEY: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Round a monetary amount to two decimal places, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether `amount`, once rounded to cents, fits a money column.
#[must_use]
pub fn fits_money_column(amount: Decimal) -> bool {
    let rounded = round_money(amount);
    !rounded.is_sign_negative() && rounded <= MAX_MONEY
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(1005, 3)), Decimal::new(101, 2));
        assert_eq!(round_money(Decimal::new(1004, 3)), Decimal::new(100, 2));
        assert_eq!(round_money(Decimal::new(-1005, 3)), Decimal::new(-101, 2));
        // Banker's rounding would give 0.02 here
        assert_eq!(round_money(Decimal::new(25, 3)), Decimal::new(3, 2));
    }

    #[test]
    fn test_max_money_is_ten_digits_and_cents() {
        assert_eq!(MAX_MONEY, Decimal::from_str("9999999999.99").unwrap_or_default());
        assert_eq!(MAX_MONEY.scale(), 2);
    }

    #[test]
    fn test_fits_money_column() {
        assert!(fits_money_column(Decimal::ZERO));
        assert!(fits_money_column(MAX_MONEY));
        assert!(fits_money_column(Decimal::new(99_999_999_999_94, 3)));
        assert!(!fits_money_column(Decimal::new(10_000_000_000, 0)));
        assert!(!fits_money_column(Decimal::new(99_999_999_999_95, 3)));
        assert!(!fits_money_column(Decimal::new(-1, 2)));
    }
}
