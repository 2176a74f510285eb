//! Candle and signal persistence port trait.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::candle::{Candle, CoverageRange, Granularity};
use crate::domain::error::SignalForgeError;
use crate::domain::signal::Signal;

pub trait CandleStore {
    /// Idempotent write keyed by (symbol, timestamp, granularity); a
    /// duplicate key refreshes the row. Returns the number of bars written.
    fn upsert_candles(&self, candles: &[Candle]) -> Result<usize, SignalForgeError>;

    /// Candles in `[start, end]`, ascending by timestamp.
    fn candles_in_range(
        &self,
        symbol: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, SignalForgeError>;

    fn coverage(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<Option<CoverageRange>, SignalForgeError>;

    /// Recompute and persist the coverage record from stored candles.
    fn update_coverage(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<CoverageRange, SignalForgeError>;

    /// Persist a backtest's signal set and register every signal as a member
    /// of the request range. Signal rows are keyed by (symbol, created_at)
    /// alone; range membership is recorded separately so a row reused by an
    /// overlapping range keeps its place in every earlier range's set.
    fn store_signals(
        &self,
        signals: &[Signal],
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> Result<(), SignalForgeError>;

    /// Signals previously persisted for this exact (symbol, range) request,
    /// ascending by date. Empty means the range was never backtested.
    fn signals_for_range(
        &self,
        symbol: &str,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> Result<Vec<Signal>, SignalForgeError>;

    /// All persisted signals with a date in `[start, end)`, regardless of
    /// which backtest range produced them, ascending by date.
    fn signals_between(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Signal>, SignalForgeError>;

    /// Signals whose simulation never completed, for crash recovery.
    fn signals_missing_outcome(&self, symbol: &str) -> Result<Vec<Signal>, SignalForgeError>;

    /// Write outcomes onto existing signal rows by (symbol, created_at)
    /// without touching range membership.
    fn update_signal_outcomes(&self, signals: &[Signal]) -> Result<(), SignalForgeError>;
}
