//! Commission calculation
//!
//! `amount = final_amount * rate`, the barber's own rate winning over the
//! default. Arithmetic is done in `Decimal` and rounded half away from zero.

use rust_decimal::prelude::*;

use super::DomainError;

const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
#[inline]
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to `dp` decimal places
#[inline]
fn to_f64(value: Decimal, dp: u32) -> f64 {
    value
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommissionAmount {
    pub base_amount: f64,
    /// Fraction 0..=1
    pub rate: f64,
    pub amount: f64,
    /// `rate * 100`
    pub percentage: f64,
}

pub fn calculate(
    final_amount: f64,
    barber_rate: Option<f64>,
    default_rate: f64,
) -> Result<CommissionAmount, DomainError> {
    let rate = barber_rate.unwrap_or(default_rate);
    if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
        return Err(DomainError::InvalidRate(rate));
    }
    let base = to_decimal(final_amount.max(0.0));
    let rate_dec = to_decimal(rate);

    Ok(CommissionAmount {
        base_amount: to_f64(base, DECIMAL_PLACES),
        rate,
        amount: to_f64(base * rate_dec, DECIMAL_PLACES),
        percentage: to_f64(rate_dec * Decimal::ONE_HUNDRED, DECIMAL_PLACES),
    })
}

/// Sum of money values, rounded
pub fn sum(values: impl IntoIterator<Item = f64>) -> f64 {
    let total: Decimal = values.into_iter().map(to_decimal).sum();
    to_f64(total, DECIMAL_PLACES)
}

/// Percent change from `previous` to `current`; None without a baseline
pub fn growth_percentage(current: f64, previous: f64) -> Option<f64> {
    if previous <= 0.0 {
        return None;
    }
    let change = (to_decimal(current) - to_decimal(previous)) / to_decimal(previous);
    Some(to_f64(change * Decimal::ONE_HUNDRED, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thirty_percent_of_one_hundred() {
        let c = calculate(100.0, Some(0.30), 0.25).unwrap();
        assert_eq!(c.amount, 30.00);
        assert_eq!(c.percentage, 30.0);
        assert_eq!(c.rate, 0.30);
    }

    #[test]
    fn test_default_rate_when_barber_has_none() {
        let c = calculate(80.0, None, 0.30).unwrap();
        assert_eq!(c.amount, 24.0);
        assert_eq!(c.percentage, 30.0);
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        // 33.35 * 0.5 = 16.675 → 16.68
        let c = calculate(33.35, Some(0.5), 0.3).unwrap();
        assert_eq!(c.amount, 16.68);
    }

    #[test]
    fn test_rejects_out_of_range_rate() {
        assert_eq!(
            calculate(100.0, Some(1.2), 0.3).unwrap_err(),
            DomainError::InvalidRate(1.2)
        );
    }

    #[test]
    fn test_sum_and_growth() {
        assert_eq!(sum([0.1, 0.2]), 0.3);
        assert_eq!(growth_percentage(150.0, 100.0), Some(50.0));
        assert_eq!(growth_percentage(50.0, 0.0), None);
    }
}
