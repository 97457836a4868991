//! Moving average crossover detection (golden cross and death cross).
//!
//! Tracks the sign of `fast - slow` across bars. A zero difference is its own
//! state: moving from zero to positive is a cross up, and moving from zero to
//! negative is a cross down, but landing on zero is never a cross.
//!
//! "Zero" is relative: the averages count as even when they differ by at most
//! [`RELATIVE_TIE_TOLERANCE`] times the larger magnitude. Rolling sums leave
//! residue around 1e-14 when both windows hold the same prices, and that
//! residue must not read as a cross.

use serde::{Deserialize, Serialize};

/// Discrete crossover signal for one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    #[default]
    None,
    CrossUp,
    CrossDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Below,
    Even,
    Above,
}

/// Largest `|fast - slow| / max(|fast|, |slow|)` still treated as a tie.
pub const RELATIVE_TIE_TOLERANCE: f64 = 1e-9;

impl Side {
    fn of(fast: f64, slow: f64) -> Self {
        let diff = fast - slow;
        if diff.abs() <= RELATIVE_TIE_TOLERANCE * fast.abs().max(slow.abs()) {
            Side::Even
        } else if diff > 0.0 {
            Side::Above
        } else {
            Side::Below
        }
    }
}

/// Stateful detector holding only the previous defined bar's side.
#[derive(Debug, Clone, Default)]
pub struct CrossoverDetector {
    previous: Option<Side>,
}

impl CrossoverDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current fast/slow values.
    ///
    /// Undefined inputs return `Signal::None` and leave the stored side intact.
    pub fn observe(&mut self, fast: Option<f64>, slow: Option<f64>) -> Signal {
        let (Some(fast), Some(slow)) = (fast, slow) else {
            return Signal::None;
        };

        let current = Side::of(fast, slow);
        let signal = match (self.previous, current) {
            (Some(Side::Below | Side::Even), Side::Above) => Signal::CrossUp,
            (Some(Side::Above | Side::Even), Side::Below) => Signal::CrossDown,
            _ => Signal::None,
        };
        self.previous = Some(current);
        signal
    }

    /// Whether at least one bar with both averages defined has been seen.
    pub fn is_primed(&self) -> bool {
        self.previous.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(pairs: &[(f64, f64)]) -> Vec<Signal> {
        let mut det = CrossoverDetector::new();
        pairs
            .iter()
            .map(|&(f, s)| det.observe(Some(f), Some(s)))
            .collect()
    }

    #[test]
    fn first_defined_bar_is_none() {
        assert_eq!(feed(&[(11.0, 10.0)]), vec![Signal::None]);
    }

    #[test]
    fn golden_cross() {
        let signals = feed(&[(9.0, 10.0), (11.0, 10.0)]);
        assert_eq!(signals, vec![Signal::None, Signal::CrossUp]);
    }

    #[test]
    fn death_cross() {
        let signals = feed(&[(11.0, 10.0), (9.0, 10.0)]);
        assert_eq!(signals, vec![Signal::None, Signal::CrossDown]);
    }

    #[test]
    fn touching_is_not_a_cross() {
        let signals = feed(&[(9.0, 10.0), (10.0, 10.0)]);
        assert_eq!(signals, vec![Signal::None, Signal::None]);
    }

    #[test]
    fn leaving_zero_upward_is_cross_up() {
        let signals = feed(&[(10.0, 10.0), (10.0, 10.0), (10.5, 10.0)]);
        assert_eq!(signals, vec![Signal::None, Signal::None, Signal::CrossUp]);
    }

    #[test]
    fn leaving_zero_downward_is_cross_down() {
        let signals = feed(&[(11.0, 10.0), (10.0, 10.0), (9.0, 10.0)]);
        assert_eq!(signals, vec![Signal::None, Signal::None, Signal::CrossDown]);
    }

    #[test]
    fn rounding_residue_counts_as_even() {
        // Both windows full of 348.22 after a rolling sum: slow lands one ulp low.
        let slow = 348.219_999_999_999_97;
        let signals = feed(&[(340.0, 350.0), (348.22, slow), (348.22, slow)]);
        assert_eq!(signals, vec![Signal::None, Signal::None, Signal::None]);
        assert_eq!(Side::of(348.22, slow), Side::Even);
        assert_eq!(Side::of(348.23, 348.22), Side::Above);
    }

    #[test]
    fn staying_above_is_none() {
        let signals = feed(&[(11.0, 10.0), (12.0, 10.0), (13.0, 10.0)]);
        assert!(signals.iter().all(|s| *s == Signal::None));
    }

    #[test]
    fn undefined_inputs_do_not_touch_state() {
        let mut det = CrossoverDetector::new();
        assert_eq!(det.observe(Some(9.0), Some(10.0)), Signal::None);
        assert_eq!(det.observe(Some(12.0), None), Signal::None);
        assert_eq!(det.observe(None, None), Signal::None);
        // Compared against the last defined bar (below), not the skipped ones.
        assert_eq!(det.observe(Some(11.0), Some(10.0)), Signal::CrossUp);
    }

    #[test]
    fn not_primed_until_both_defined() {
        let mut det = CrossoverDetector::new();
        det.observe(Some(1.0), None);
        assert!(!det.is_primed());
        det.observe(Some(1.0), Some(2.0));
        assert!(det.is_primed());
    }
}
