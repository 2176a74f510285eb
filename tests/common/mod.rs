//! Shared fixtures for integration tests.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use signalforge::adapters::sqlite_store::SqliteStore;
use signalforge::domain::candle::{Candle, Granularity};
use signalforge::ports::candle_store::CandleStore;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn timestamp(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub fn make_bar(symbol: &str, ts: DateTime<Utc>, close: f64) -> Candle {
    Candle {
        symbol: symbol.to_string(),
        timestamp: ts,
        granularity: Granularity::OneDay,
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 1000.0,
    }
}

/// Daily bars from a start date with the given closes.
pub fn daily_series(symbol: &str, start: DateTime<Utc>, closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(symbol, start + Duration::days(i as i64), close))
        .collect()
}

/// A gently rising series with a periodic wobble, enough movement to
/// produce a bullish bias and the occasional confirmation.
pub fn trending_closes(days: usize) -> Vec<f64> {
    (0..days)
        .map(|i| 100.0 + i as f64 * 0.5 + (i as f64 * 0.7).sin() * 3.0)
        .collect()
}

/// In-memory store seeded with daily candles.
pub fn seeded_store(symbol: &str, start: DateTime<Utc>, closes: &[f64]) -> SqliteStore {
    let store = SqliteStore::in_memory().unwrap();
    store.initialize_schema().unwrap();
    store
        .upsert_candles(&daily_series(symbol, start, closes))
        .unwrap();
    store
}
