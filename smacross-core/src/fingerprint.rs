//! Run fingerprinting: deterministic identification of configs and datasets.
//!
//! - `ConfigHash`: every engine parameter (periods, fraction, cash, commission, fill timing).
//! - `DatasetHash`: content hash of the bar rows.
//! - `RunId`: config + dataset. Two runs with the same `RunId` produce identical results.
//! - `RunFingerprint`: the identity block recorded in the run manifest.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::EngineConfig;
use crate::domain::{Bar, BarSeries};

/// BLAKE3 hash of the canonical engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    /// Canonical JSON with a fixed key order, so the hash is stable across builds.
    pub fn of(config: &EngineConfig) -> Self {
        let canonical = json!({
            "commission_rate": config.commission_rate,
            "fast_period": config.strategy.fast_period,
            "fill_timing": config.fill_timing,
            "fraction": config.strategy.fraction,
            "slow_period": config.strategy.slow_period,
            "starting_cash": config.starting_cash,
        });
        Self(blake3::hash(canonical.to_string().as_bytes()).to_hex().to_string())
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// BLAKE3 hash over the bar rows in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn of(bars: &[Bar]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for bar in bars {
            hasher.update(&bar.timestamp.and_utc().timestamp().to_le_bytes());
            for value in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
                hasher.update(&value.to_bits().to_le_bytes());
            }
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic run ID (config + dataset).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new(config: &ConfigHash, dataset: &DatasetHash) -> Self {
        let canonical = json!({
            "config_hash": &config.0,
            "dataset_hash": &dataset.0,
        });
        Self(blake3::hash(canonical.to_string().as_bytes()).to_hex().to_string())
    }

    /// First 12 hex chars, for directory names and log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFingerprint {
    // ── Identity ──
    pub run_id: RunId,
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,

    // ── Dataset ──
    pub bar_count: usize,
    pub first_bar: Option<NaiveDateTime>,
    pub last_bar: Option<NaiveDateTime>,
}

impl RunFingerprint {
    pub fn new(config: &EngineConfig, bars: &BarSeries) -> Self {
        let config_hash = ConfigHash::of(config);
        let dataset_hash = DatasetHash::of(bars.bars());
        Self {
            run_id: RunId::new(&config_hash, &dataset_hash),
            config_hash,
            dataset_hash,
            bar_count: bars.len(),
            first_bar: bars.first().map(|b| b.timestamp),
            last_bar: bars.last().map(|b| b.timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FillTiming, StrategyParams};
    use chrono::NaiveDate;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let ts = NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap();
                Bar::new(ts, c, c, c, c, 100.0)
            })
            .collect()
    }

    #[test]
    fn config_hash_is_deterministic() {
        let config = EngineConfig::default();
        assert_eq!(ConfigHash::of(&config), ConfigHash::of(&config.clone()));
        assert_eq!(ConfigHash::of(&config).0.len(), 64);
    }

    #[test]
    fn config_hash_covers_every_parameter() {
        let base = EngineConfig::default();
        let variants = [
            EngineConfig::new(50_000.0, base.commission_rate, base.strategy),
            EngineConfig::new(base.starting_cash, 0.002, base.strategy),
            EngineConfig::new(base.starting_cash, base.commission_rate, StrategyParams::new(5, 30, 0.3)),
            EngineConfig::new(base.starting_cash, base.commission_rate, StrategyParams::new(10, 20, 0.3)),
            EngineConfig::new(base.starting_cash, base.commission_rate, StrategyParams::new(10, 30, 0.5)),
            base.clone().with_fill_timing(FillTiming::NextBarOpen),
        ];
        for variant in &variants {
            assert_ne!(ConfigHash::of(&base), ConfigHash::of(variant), "{variant:?}");
        }
    }

    #[test]
    fn dataset_hash_changes_with_any_price() {
        let a = bars(&[10.0, 11.0, 12.0]);
        let mut b = a.clone();
        b[1].close = 11.000001;
        assert_eq!(DatasetHash::of(&a), DatasetHash::of(&a.clone()));
        assert_ne!(DatasetHash::of(&a), DatasetHash::of(&b));
    }

    #[test]
    fn fingerprint_records_dataset_span() {
        let series = BarSeries::new(bars(&[10.0, 11.0, 12.0])).unwrap();
        let fp = RunFingerprint::new(&EngineConfig::default(), &series);
        assert_eq!(fp.bar_count, 3);
        assert_eq!(fp.first_bar, Some(series.bars()[0].timestamp));
        assert_eq!(fp.last_bar, Some(series.bars()[2].timestamp));
        assert_eq!(fp.run_id, RunId::new(&fp.config_hash, &fp.dataset_hash));
        assert_eq!(fp.run_id.short().len(), 12);
    }
}
