//! Percent-of-equity position sizer.

use serde::{Deserialize, Serialize};

use crate::config::{validate_fraction, ConfigError};

/// Whole shares affordable with `fraction` of `equity` at `price`.
///
/// `floor(equity * fraction / price)`. Returns 0 for a non-positive price or
/// any non-finite / non-positive result; the caller treats 0 as "do not trade".
pub fn shares_for_fraction(equity: f64, price: f64, fraction: f64) -> u64 {
    if !(price > 0.0) {
        return 0;
    }
    let shares = (equity * fraction / price).floor();
    if shares.is_finite() && shares >= 1.0 {
        shares as u64
    } else {
        0
    }
}

/// Sizes entries as a fixed fraction of current equity.
///
/// The fraction is validated on construction, so a misconfigured sizer is
/// rejected before the backtest starts rather than at trade time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentOfEquity {
    fraction: f64,
}

impl PercentOfEquity {
    pub fn new(fraction: f64) -> Result<Self, ConfigError> {
        validate_fraction(fraction)?;
        Ok(Self { fraction })
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn size(&self, equity: f64, price: f64) -> u64 {
        shares_for_fraction(equity, price, self.fraction)
    }

    /// Dollar amount the sizer targets for `equity`.
    pub fn allocation(&self, equity: f64) -> f64 {
        equity * self.fraction
    }

    pub fn name(&self) -> &str {
        "PercentOfEquity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floors_rather_than_rounds() {
        // 100000 * 0.3 / 333.34 = 89.998...
        assert_eq!(shares_for_fraction(100_000.0, 333.34, 0.3), 89);
    }

    #[test]
    fn full_equity_at_exact_price() {
        assert_eq!(shares_for_fraction(1_000.0, 10.0, 1.0), 100);
        assert_eq!(shares_for_fraction(1_000.0, 11.0, 1.0), 90);
    }

    #[test]
    fn non_positive_price_returns_zero() {
        assert_eq!(shares_for_fraction(1_000.0, 0.0, 1.0), 0);
        assert_eq!(shares_for_fraction(1_000.0, -5.0, 1.0), 0);
        assert_eq!(shares_for_fraction(1_000.0, f64::NAN, 1.0), 0);
    }

    #[test]
    fn price_above_allocation_returns_zero() {
        assert_eq!(shares_for_fraction(100.0, 500.0, 0.5), 0);
    }

    #[test]
    fn zero_or_negative_equity_returns_zero() {
        assert_eq!(shares_for_fraction(0.0, 10.0, 1.0), 0);
        assert_eq!(shares_for_fraction(-100.0, 10.0, 1.0), 0);
    }

    #[test]
    fn sizer_rejects_fraction_outside_unit_interval() {
        assert!(PercentOfEquity::new(0.0).is_err());
        assert!(PercentOfEquity::new(1.01).is_err());
        assert!(PercentOfEquity::new(-0.3).is_err());
        assert!(PercentOfEquity::new(1.0).is_ok());
    }

    #[test]
    fn sizer_uses_configured_fraction() {
        let sizer = PercentOfEquity::new(0.3).unwrap();
        assert_eq!(sizer.size(100_000.0, 333.34), 89);
        assert_eq!(sizer.allocation(100_000.0), 30_000.0);
    }
}
