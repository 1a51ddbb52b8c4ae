//! Integration tests.
//!
//! Tests cover:
//! - Selection pipeline with a mock market port (ranking, skipping,
//!   truncation, weight overrides)
//! - Multi-strategy runs with intersection/union combination
//! - Full backtest pipeline over the CSV adapter and snapshot builder
//! - Determinism of repeated runs on identical inputs

mod common;

use common::*;
use std::fs;
use std::io::Write;
use stocksift::adapters::csv_market_adapter::CsvMarketAdapter;
use stocksift::domain::backtest::{BacktestEngine, BacktestOptions};
use stocksift::domain::error::SiftError;
use stocksift::domain::filters::{Filter, FilterSet};
use stocksift::domain::selection::{self, SelectOptions, SelectionEngine};
use stocksift::domain::snapshot::Metric;
use stocksift::domain::strategy::{StrategyCatalog, StrategyDefinition};
use stocksift::domain::weights::WeightProfile;
use tempfile::TempDir;

mod selection_pipeline {
    use super::*;

    #[test]
    fn ranks_descending_with_symbol_tiebreak() {
        let day = date(2024, 3, 1);
        let mut strong = scorable_snapshot("000002", day);
        strong.set_metric(Metric::PriceChange5d, 12.0);
        strong.set_metric(Metric::VolumeRatio, 2.5);

        let port = MockMarketPort::new()
            .with_snapshot(scorable_snapshot("000003", day))
            .with_snapshot(scorable_snapshot("000001", day))
            .with_snapshot(strong);

        let catalog = catalog_with(pass_all_strategy());
        let engine = SelectionEngine::new(&catalog, &port);
        let result = engine
            .select("pass_all", day, &SelectOptions::default())
            .unwrap();

        assert_eq!(result.records.len(), 3);
        // 000002 outranks the identical pair, which tie-break alphabetically.
        assert_eq!(result.records[0].symbol, "000002");
        assert_eq!(result.records[1].symbol, "000001");
        assert_eq!(result.records[2].symbol, "000003");
        assert!(
            result.records[0].score.composite > result.records[1].score.composite
        );
        assert_eq!(
            result.records[1].score.composite,
            result.records[2].score.composite
        );
    }

    #[test]
    fn missing_snapshots_are_skipped_not_fatal() {
        let day = date(2024, 3, 1);
        let port = MockMarketPort::new()
            .with_prices("MISSING", day, &[100.0])
            .with_snapshot(scorable_snapshot("000001", day));

        let catalog = catalog_with(pass_all_strategy());
        let engine = SelectionEngine::new(&catalog, &port);
        let result = engine
            .select("pass_all", day, &SelectOptions::default())
            .unwrap();

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.skipped, vec!["MISSING".to_string()]);
    }

    #[test]
    fn all_symbols_unscorable_is_empty_universe() {
        let day = date(2024, 3, 1);
        let port = MockMarketPort::new()
            .with_prices("A", day, &[100.0])
            .with_prices("B", day, &[100.0]);

        let catalog = catalog_with(pass_all_strategy());
        let engine = SelectionEngine::new(&catalog, &port);
        let err = engine
            .select("pass_all", day, &SelectOptions::default())
            .unwrap_err();
        assert!(matches!(err, SiftError::EmptyUniverse { skipped: 2 }));
    }

    #[test]
    fn unreachable_min_score_yields_empty_result() {
        let day = date(2024, 3, 1);
        let port = MockMarketPort::new()
            .with_snapshot(scorable_snapshot("000001", day))
            .with_snapshot(scorable_snapshot("000002", day));

        let unreachable = StrategyDefinition::new(
            "unreachable",
            "",
            WeightProfile::default(),
            FilterSet::new(vec![Filter::MinScore(101.0)]),
        );
        let catalog = catalog_with(unreachable);
        let engine = SelectionEngine::new(&catalog, &port);
        let result = engine
            .select("unreachable", day, &SelectOptions::default())
            .unwrap();
        assert!(result.records.is_empty());
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn max_results_truncates_after_ranking() {
        let day = date(2024, 3, 1);
        let mut port = MockMarketPort::new();
        for i in 0..10 {
            let symbol = format!("00000{i}");
            let mut snap = scorable_snapshot(&symbol, day);
            snap.set_metric(Metric::PriceChange5d, i as f64);
            port = port.with_snapshot(snap);
        }

        let catalog = catalog_with(pass_all_strategy());
        let engine = SelectionEngine::new(&catalog, &port);
        let options = SelectOptions {
            weights: None,
            max_results: Some(3),
        };
        let result = engine.select("pass_all", day, &options).unwrap();
        assert_eq!(result.records.len(), 3);
        // Highest 5-day change wins.
        assert_eq!(result.records[0].symbol, "000009");
    }

    #[test]
    fn weight_override_leaves_catalog_untouched() {
        let day = date(2024, 3, 1);
        let port = MockMarketPort::new().with_snapshot(scorable_snapshot("000001", day));
        let catalog = catalog_with(pass_all_strategy());
        let engine = SelectionEngine::new(&catalog, &port);

        let override_weights = WeightProfile::new(0.0, 1.0, 0.0, 0.0, 0.0);
        let options = SelectOptions {
            weights: Some(override_weights),
            max_results: None,
        };
        let with_override = engine.select("pass_all", day, &options).unwrap();
        let record = &with_override.records[0];
        assert_eq!(record.score.weights, override_weights);
        // Pure momentum weighting: composite equals the momentum sub-score.
        assert!((record.score.composite - record.score.momentum).abs() < 1e-9);

        // The catalog template still carries its own weights.
        assert_eq!(
            catalog.get("pass_all").unwrap().weights,
            WeightProfile::default()
        );
    }

    #[test]
    fn invalid_override_weights_are_a_configuration_error() {
        let day = date(2024, 3, 1);
        let port = MockMarketPort::new().with_snapshot(scorable_snapshot("000001", day));
        let catalog = catalog_with(pass_all_strategy());
        let engine = SelectionEngine::new(&catalog, &port);

        let options = SelectOptions {
            weights: Some(WeightProfile::new(0.9, 0.9, 0.0, 0.0, 0.0)),
            max_results: None,
        };
        let err = engine.select("pass_all", day, &options).unwrap_err();
        assert!(matches!(err, SiftError::InvalidWeights { .. }));
    }
}

mod multi_strategy {
    use super::*;

    fn two_strategy_setup() -> (MockMarketPort, StrategyCatalog) {
        let day = date(2024, 3, 1);
        let mut oversold = scorable_snapshot("000001", day);
        oversold.set_metric(Metric::Rsi, 25.0);
        let mut hot = scorable_snapshot("000002", day);
        hot.set_metric(Metric::PriceChange5d, 12.0);
        let middling = scorable_snapshot("000003", day);

        let port = MockMarketPort::new()
            .with_snapshot(oversold)
            .with_snapshot(hot)
            .with_snapshot(middling);

        let low_rsi = StrategyDefinition::new(
            "low_rsi",
            "",
            WeightProfile::default(),
            FilterSet::new(vec![Filter::RsiRange { min: 0.0, max: 40.0 }]),
        );
        let movers = StrategyDefinition::new(
            "movers",
            "",
            WeightProfile::default(),
            FilterSet::new(vec![Filter::MinPriceChange5d(2.0)]),
        );
        let catalog = StrategyCatalog::builtin()
            .with(low_rsi)
            .unwrap()
            .with(movers)
            .unwrap();
        (port, catalog)
    }

    #[test]
    fn run_many_keys_results_by_strategy() {
        let (port, catalog) = two_strategy_setup();
        let engine = SelectionEngine::new(&catalog, &port);
        let results = engine
            .run_many(
                &["low_rsi".to_string(), "movers".to_string()],
                date(2024, 3, 1),
                &SelectOptions::default(),
            )
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results["low_rsi"].symbols(), vec!["000001"]);
        // movers: 000002 (12%) and the neutral names at 3%.
        assert!(results["movers"].symbols().contains(&"000002"));
    }

    #[test]
    fn run_many_with_unknown_strategy_fails() {
        let (port, catalog) = two_strategy_setup();
        let engine = SelectionEngine::new(&catalog, &port);
        let err = engine
            .run_many(
                &["movers".to_string(), "nope".to_string()],
                date(2024, 3, 1),
                &SelectOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, SiftError::UnknownStrategy { name } if name == "nope"));
    }

    #[test]
    fn intersect_is_subset_of_union() {
        let (port, catalog) = two_strategy_setup();
        let engine = SelectionEngine::new(&catalog, &port);
        let results = engine
            .run_many(
                &["low_rsi".to_string(), "movers".to_string()],
                date(2024, 3, 1),
                &SelectOptions::default(),
            )
            .unwrap();

        let inputs: Vec<&selection::SelectionResult> = results.values().collect();
        let both = selection::intersect(&inputs);
        let any = selection::union(&inputs);

        let union_symbols = any.symbols();
        for record in &both.records {
            assert!(union_symbols.contains(&record.symbol.as_str()));
        }
        assert!(any.records.len() >= both.records.len());
    }

    #[test]
    fn union_records_contributing_strategies() {
        let (port, catalog) = two_strategy_setup();
        let engine = SelectionEngine::new(&catalog, &port);
        let results = engine
            .run_many(
                &["low_rsi".to_string(), "movers".to_string()],
                date(2024, 3, 1),
                &SelectOptions::default(),
            )
            .unwrap();

        let inputs: Vec<&selection::SelectionResult> = results.values().collect();
        let any = selection::union(&inputs);
        // 000001 has RSI 25 and a 3% five-day change, so both strategies
        // pick it up.
        let first = any.records.iter().find(|r| r.symbol == "000001").unwrap();
        assert_eq!(
            first.strategies,
            vec!["low_rsi".to_string(), "movers".to_string()]
        );
    }
}

mod backtest_pipeline {
    use super::*;

    fn write_symbol_csv(dir: &std::path::Path, symbol: &str, closes: &[f64]) {
        let start = date(2024, 1, 1);
        let mut file = fs::File::create(dir.join(format!("{symbol}.csv"))).unwrap();
        writeln!(file, "date,open,high,low,close,volume,turnover_rate").unwrap();
        for (i, close) in closes.iter().enumerate() {
            let d = start + chrono::Duration::days(i as i64);
            writeln!(
                file,
                "{d},{:.4},{:.4},{:.4},{close:.4},12000,3.1",
                close * 0.995,
                close * 1.01,
                close * 0.99,
            )
            .unwrap();
        }
    }

    #[test]
    fn full_pipeline_over_csv_adapter() {
        let tmp = TempDir::new().unwrap();
        let closes: Vec<f64> = (0..80).map(|i| 50.0 * 1.005f64.powi(i)).collect();
        write_symbol_csv(tmp.path(), "600519", &closes);

        let adapter = CsvMarketAdapter::open(tmp.path(), None).unwrap();
        let catalog = catalog_with(pass_all_strategy());
        let engine = BacktestEngine::new(&catalog, &adapter);

        let options = BacktestOptions {
            holding_periods: vec![1, 5],
            ..BacktestOptions::default()
        };
        let report = engine
            .run("pass_all", date(2024, 2, 15), date(2024, 3, 10), &options)
            .unwrap();

        assert_eq!(report.entry_days, 25);
        // Snapshots exist from bar 30 onward, so every entry day trades.
        assert_eq!(report.trades.len(), 50);

        let summary = &report.summaries[&5];
        assert_eq!(summary.trades, 25);
        // A steady riser wins every 5-day hold.
        assert!((summary.win_rate - 1.0).abs() < 1e-9);
        let expected = 1.005f64.powi(5) - 1.0;
        assert!((summary.mean_return - expected).abs() < 1e-9);
    }

    #[test]
    fn backtest_is_reproducible_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let closes: Vec<f64> =
            (0..70).map(|i| 80.0 + 10.0 * ((i as f64) * 0.35).sin()).collect();
        write_symbol_csv(tmp.path(), "000001", &closes);
        write_symbol_csv(tmp.path(), "000002", &closes[5..]);

        let adapter = CsvMarketAdapter::open(tmp.path(), None).unwrap();
        let catalog = catalog_with(pass_all_strategy());
        let engine = BacktestEngine::new(&catalog, &adapter);

        let options = BacktestOptions {
            holding_periods: vec![1, 3, 5],
            ..BacktestOptions::default()
        };
        let a = engine
            .run("pass_all", date(2024, 2, 10), date(2024, 3, 5), &options)
            .unwrap();
        let b = engine
            .run("pass_all", date(2024, 2, 10), date(2024, 3, 5), &options)
            .unwrap();

        assert_eq!(a.trades, b.trades);
        assert_eq!(a.summaries, b.summaries);
    }

    #[test]
    fn short_range_fails_with_insufficient_history() {
        let tmp = TempDir::new().unwrap();
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + i as f64).collect();
        write_symbol_csv(tmp.path(), "000001", &closes);

        let adapter = CsvMarketAdapter::open(tmp.path(), None).unwrap();
        let catalog = catalog_with(pass_all_strategy());
        let engine = BacktestEngine::new(&catalog, &adapter);

        let err = engine
            .run(
                "pass_all",
                date(2024, 2, 1),
                date(2024, 2, 5),
                &BacktestOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, SiftError::InsufficientHistory { days: 5, .. }));
    }
}
