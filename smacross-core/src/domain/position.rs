use serde::{Deserialize, Serialize};

/// The single open position (long or flat).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub size: u64,
    pub entry_price: f64,
}

impl Position {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn long(size: u64, entry_price: f64) -> Self {
        Self { size, entry_price }
    }

    pub fn is_flat(&self) -> bool {
        self.size == 0
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.size as f64 * current_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_has_no_value() {
        let pos = Position::flat();
        assert!(pos.is_flat());
        assert_eq!(pos.market_value(123.0), 0.0);
    }

    #[test]
    fn long_marks_to_market() {
        let pos = Position::long(10, 100.0);
        assert!(!pos.is_flat());
        assert_eq!(pos.market_value(110.0), 1100.0);
    }
}
