use chrono::NaiveDate;
use smacross_core::data::DataSource;
use smacross_core::domain::Bar;
use smacross_runner::export::{export_json, import_json};
use smacross_runner::{run_backtest_from_bars, save_artifacts, BacktestResult, RunConfig};

fn make_result() -> BacktestResult {
    let base = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
    let bars: Vec<Bar> = (0..260)
        .map(|i| {
            let close = 50.0 + (i as f64 * 0.09).sin() * 12.0;
            let ts = (base + chrono::Duration::days(i as i64))
                .and_hms_opt(0, 0, 0)
                .unwrap();
            Bar::new(ts, close, close + 0.5, close - 0.5, close, 10_000.0)
        })
        .collect();
    let mut config = RunConfig::default();
    config.data.symbol = "TSLA".into();
    run_backtest_from_bars(&config, bars, DataSource::InMemory).unwrap()
}

#[test]
fn save_artifacts_writes_all_files() {
    let temp_dir = tempfile::tempdir().unwrap();
    let result = make_result();

    let run_dir = save_artifacts(&result, temp_dir.path()).unwrap();
    assert!(run_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("TSLA_"));
    for name in ["manifest.json", "trades.csv", "round_trips.csv", "equity.csv"] {
        assert!(run_dir.join(name).exists(), "{name} missing");
    }

    let trades = std::fs::read_to_string(run_dir.join("trades.csv")).unwrap();
    assert_eq!(trades.lines().count(), result.run.trade_log.len() + 1);

    let equity = std::fs::read_to_string(run_dir.join("equity.csv")).unwrap();
    assert_eq!(equity.lines().count(), 261);

    let manifest = std::fs::read_to_string(run_dir.join("manifest.json")).unwrap();
    let reloaded = import_json(&manifest).unwrap();
    assert_eq!(reloaded.fingerprint, result.fingerprint);
    assert_eq!(reloaded.config.data, result.config.data);
    assert_eq!(reloaded.run.trade_log.len(), result.run.trade_log.len());
    assert_eq!(reloaded.run.equity_curve.len(), result.run.equity_curve.len());
    assert!((reloaded.run.final_equity - result.run.final_equity).abs() < 1e-6);
}

#[test]
fn import_rejects_future_schema_version() {
    let mut result = make_result();
    result.schema_version = 99;
    let json = export_json(&result).unwrap();
    let err = import_json(&json).unwrap_err();
    assert!(err.to_string().contains("unsupported schema version"));
}

#[test]
fn manifest_without_schema_version_defaults_to_current() {
    let result = make_result();
    let mut value: serde_json::Value = serde_json::from_str(&export_json(&result).unwrap()).unwrap();
    value.as_object_mut().unwrap().remove("schema_version");
    let reloaded = import_json(&value.to_string()).unwrap();
    assert_eq!(reloaded.schema_version, smacross_runner::SCHEMA_VERSION);
}
