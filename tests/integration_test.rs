//! End-to-end pipeline tests over the in-memory SQLite store.
//!
//! Covers the fetch-store-backtest flow and the contract-level properties:
//! cache-first idempotency, one signal per calendar date, minimum signal
//! cadence, risk/reward and price-ordering invariants, and fetcher
//! idempotency under re-fetch.

mod common;

use common::*;
use signalforge::adapters::csv_export;
use signalforge::adapters::sqlite_store::SqliteStore;
use signalforge::domain::backtest::{
    recover_missing_outcomes, run_backtest, BacktestConfig, BacktestRequest,
};
use signalforge::domain::candle::{Candle, Granularity};
use signalforge::domain::decision::Direction;
use signalforge::domain::error::SignalForgeError;
use signalforge::domain::fetcher::{FetchConfig, HistoricalFetcher, Pacer};
use signalforge::domain::frequency;
use signalforge::domain::signal::{RiskParams, SourceTag};
use signalforge::ports::candle_store::CandleStore;
use signalforge::ports::exchange_port::ExchangePort;
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::HashSet;
use std::time::Duration;

fn request(symbol: &str, start: (i32, u32, u32), end: (i32, u32, u32)) -> BacktestRequest {
    BacktestRequest {
        symbol: symbol.to_string(),
        start: date(start.0, start.1, start.2),
        end: date(end.0, end.1, end.2),
        desired_signal_count: 0,
    }
}

mod full_backtest_pipeline {
    use super::*;

    #[test]
    fn backtest_over_seeded_store_produces_simulated_signals() {
        let store = seeded_store("BTCUSDT", timestamp(2023, 9, 1), &trending_closes(300));
        let req = request("BTCUSDT", (2024, 1, 1), (2024, 5, 1));
        let report = run_backtest(&store, &req, &BacktestConfig::default()).unwrap();

        assert!(!report.signals.is_empty());
        for signal in &report.signals {
            assert_eq!(signal.symbol, "BTCUSDT");
            assert!(signal.created_at >= req.start && signal.created_at < req.end);
            assert!(signal.outcome.is_some(), "every signal must be simulated");
        }
        assert_eq!(report.summary.total_signals, report.signals.len());
    }

    #[test]
    fn empty_store_reports_no_data() {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();
        let req = request("BTCUSDT", (2024, 1, 1), (2024, 5, 1));
        let report = run_backtest(&store, &req, &BacktestConfig::default()).unwrap();
        assert!(report.signals.is_empty());
        assert!(report.signal_analysis.contains("No candle data"));
    }

    #[test]
    fn desired_signal_count_caps_the_set() {
        let store = seeded_store("BTCUSDT", timestamp(2023, 9, 1), &trending_closes(300));
        let mut req = request("BTCUSDT", (2024, 1, 1), (2024, 5, 1));
        req.desired_signal_count = 2;
        let report = run_backtest(&store, &req, &BacktestConfig::default()).unwrap();
        assert!(report.signals.len() <= 2);
    }

    #[test]
    fn exported_csv_row_per_signal() {
        let store = seeded_store("BTCUSDT", timestamp(2023, 9, 1), &trending_closes(300));
        let req = request("BTCUSDT", (2024, 1, 1), (2024, 5, 1));
        let report = run_backtest(&store, &req, &BacktestConfig::default()).unwrap();

        let mut buf = Vec::new();
        csv_export::export_signals(&report.signals, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), report.signals.len() + 1);
    }
}

mod contract_properties {
    use super::*;

    #[test]
    fn second_run_is_cached_and_identical() {
        let store = seeded_store("BTCUSDT", timestamp(2023, 9, 1), &trending_closes(300));
        let req = request("BTCUSDT", (2024, 1, 1), (2024, 5, 1));
        let cfg = BacktestConfig::default();

        let first = run_backtest(&store, &req, &cfg).unwrap();
        let second = run_backtest(&store, &req, &cfg).unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.signals, second.signals);
    }

    #[test]
    fn one_signal_per_calendar_date() {
        let store = seeded_store("BTCUSDT", timestamp(2023, 9, 1), &trending_closes(400));
        let req = request("BTCUSDT", (2024, 1, 1), (2024, 9, 1));
        let report = run_backtest(&store, &req, &BacktestConfig::default()).unwrap();

        let dates: HashSet<_> = report.signals.iter().map(|s| s.created_at).collect();
        assert_eq!(dates.len(), report.signals.len());
    }

    #[test]
    fn minimum_cadence_for_long_trending_range() {
        let store = seeded_store("BTCUSDT", timestamp(2023, 9, 1), &trending_closes(400));
        let start = date(2024, 1, 1);
        let end = date(2024, 9, 1);
        let req = request("BTCUSDT", (2024, 1, 1), (2024, 9, 1));
        let report = run_backtest(&store, &req, &BacktestConfig::default()).unwrap();

        assert!(
            report.signals.len() >= frequency::min_required(start, end),
            "expected at least {} signals, got {}",
            frequency::min_required(start, end),
            report.signals.len()
        );
    }

    #[test]
    fn risk_reward_and_price_ordering_invariants() {
        let store = seeded_store("BTCUSDT", timestamp(2023, 9, 1), &trending_closes(400));
        let req = request("BTCUSDT", (2024, 1, 1), (2024, 9, 1));
        let report = run_backtest(&store, &req, &BacktestConfig::default()).unwrap();

        for signal in &report.signals {
            let min = match signal.source_tag {
                SourceTag::Natural => RiskParams::standard().min_risk_reward,
                _ => RiskParams::conservative().min_risk_reward,
            };
            assert!(signal.risk_reward_ratio >= min);

            match signal.direction {
                Direction::Buy => {
                    assert!(signal.stop_loss < signal.entry_price);
                    assert!(signal.entry_price < signal.target_price);
                }
                Direction::Sell => {
                    assert!(signal.target_price < signal.entry_price);
                    assert!(signal.entry_price < signal.stop_loss);
                }
                Direction::Hold => panic!("persisted signal cannot be HOLD"),
            }
        }
    }

    #[test]
    fn overlapping_ranges_keep_every_cached_set_intact() {
        let store = seeded_store("BTCUSDT", timestamp(2023, 9, 1), &trending_closes(400));
        let cfg = BacktestConfig::default();
        let narrow = request("BTCUSDT", (2024, 1, 1), (2024, 5, 1));
        let wide = request("BTCUSDT", (2024, 1, 1), (2024, 6, 1));

        let first_narrow = run_backtest(&store, &narrow, &cfg).unwrap();
        let first_wide = run_backtest(&store, &wide, &cfg).unwrap();

        let second_narrow = run_backtest(&store, &narrow, &cfg).unwrap();
        assert!(second_narrow.from_cache);
        assert_eq!(second_narrow.signals, first_narrow.signals);

        let second_wide = run_backtest(&store, &wide, &cfg).unwrap();
        assert!(second_wide.from_cache);
        assert_eq!(second_wide.signals, first_wide.signals);

        // one row per (symbol, date) across both ranges
        let all = store
            .signals_between("BTCUSDT", narrow.start, wide.end)
            .unwrap();
        let dates: HashSet<_> = all.iter().map(|s| s.created_at).collect();
        assert_eq!(dates.len(), all.len());
    }

    #[test]
    fn recovery_heals_outcomes_lost_mid_run() {
        let store = seeded_store("BTCUSDT", timestamp(2023, 9, 1), &trending_closes(300));
        let cfg = BacktestConfig::default();
        let req = request("BTCUSDT", (2024, 1, 1), (2024, 5, 1));
        let report = run_backtest(&store, &req, &cfg).unwrap();

        // strip one outcome as if the run died between generation and simulation
        let mut orphan = report.signals[0].clone();
        orphan.outcome = None;
        store
            .update_signal_outcomes(&[orphan])
            .unwrap();
        assert_eq!(store.signals_missing_outcome("BTCUSDT").unwrap().len(), 1);

        let recovered = recover_missing_outcomes(&store, "BTCUSDT", &cfg).unwrap();
        assert_eq!(recovered, 1);
        assert!(store.signals_missing_outcome("BTCUSDT").unwrap().is_empty());

        let healed = store.signals_for_range("BTCUSDT", req.start, req.end).unwrap();
        assert_eq!(healed, report.signals);
    }

    #[test]
    fn cached_set_survives_a_round_trip_through_sqlite() {
        let store = seeded_store("BTCUSDT", timestamp(2023, 9, 1), &trending_closes(300));
        let req = request("BTCUSDT", (2024, 1, 1), (2024, 5, 1));
        let cfg = BacktestConfig::default();
        let report = run_backtest(&store, &req, &cfg).unwrap();

        let stored = store
            .signals_for_range("BTCUSDT", req.start, req.end)
            .unwrap();
        assert_eq!(stored, report.signals);
    }
}

mod fetcher_pipeline {
    use super::*;

    struct InstantPacer;

    impl Pacer for InstantPacer {
        fn pause(&self, _duration: Duration) {}
    }

    /// Serves the same seeded batch for every window.
    struct FixtureExchange {
        candles: Vec<Candle>,
        calls: RefCell<usize>,
    }

    impl ExchangePort for FixtureExchange {
        fn fetch_klines(
            &self,
            _symbol: &str,
            _granularity: Granularity,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
            _limit: usize,
        ) -> Result<Vec<Candle>, SignalForgeError> {
            *self.calls.borrow_mut() += 1;
            Ok(self
                .candles
                .iter()
                .filter(|c| c.timestamp >= start && c.timestamp < end)
                .cloned()
                .collect())
        }
    }

    #[test]
    fn fetch_writes_through_to_sqlite_idempotently() {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();
        let exchange = FixtureExchange {
            candles: daily_series("BTCUSDT", timestamp(2024, 1, 1), &trending_closes(30)),
            calls: RefCell::new(0),
        };
        let pacer = InstantPacer;
        let fetcher =
            HistoricalFetcher::new(&exchange, &store, FetchConfig::default(), &pacer);

        let start = timestamp(2024, 1, 1);
        let end = timestamp(2024, 1, 31);
        let first = fetcher.fetch("BTCUSDT", Granularity::OneDay, start, end).unwrap();
        let second = fetcher.fetch("BTCUSDT", Granularity::OneDay, start, end).unwrap();
        assert_eq!(first, 30);
        assert_eq!(second, 30);

        // upsert, not append: the store holds one row per bar
        let stored = store
            .candles_in_range("BTCUSDT", Granularity::OneDay, start, end)
            .unwrap();
        assert_eq!(stored.len(), 30);

        let coverage = store.coverage("BTCUSDT", Granularity::OneDay).unwrap().unwrap();
        assert_eq!(coverage.count, 30);
        assert!(coverage.complete);
    }

    #[test]
    fn fetch_then_backtest_end_to_end() {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();
        let exchange = FixtureExchange {
            candles: daily_series("BTCUSDT", timestamp(2023, 9, 1), &trending_closes(300)),
            calls: RefCell::new(0),
        };
        let pacer = InstantPacer;
        let fetcher =
            HistoricalFetcher::new(&exchange, &store, FetchConfig::default(), &pacer);
        fetcher
            .fetch(
                "BTCUSDT",
                Granularity::OneDay,
                timestamp(2023, 9, 1),
                timestamp(2024, 6, 30),
            )
            .unwrap();

        let req = request("BTCUSDT", (2024, 1, 1), (2024, 5, 1));
        let report = run_backtest(&store, &req, &BacktestConfig::default()).unwrap();
        assert!(!report.signals.is_empty());
        assert!(report.signals.iter().all(|s| s.outcome.is_some()));
    }
}
