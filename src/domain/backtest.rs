//! Backtest orchestration: cache-first signal retrieval, generation via the
//! cadence guarantor, forward simulation and summary rollup.
//!
//! Overlapping ranges share signal rows. A date already holding a persisted
//! signal inside the requested range is reused as stored rather than
//! regenerated, so every previously answered range keeps returning its exact
//! set and the one-signal-per-(symbol, date) invariant holds storewide.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::domain::candle::Granularity;
use crate::domain::error::SignalForgeError;
use crate::domain::frequency::{self, FrequencyConfig};
use crate::domain::performance::{self, PerformanceSummary};
use crate::domain::signal::Signal;
use crate::domain::simulator::{self, SimulatorConfig};
use crate::ports::CandleStore;

/// Extra history loaded before the range so indicators are warm on day one.
const WARMUP_DAYS: i64 = 120;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// 0 means unlimited.
    pub desired_signal_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub granularity: Granularity,
    pub frequency: FrequencyConfig,
    pub simulator: SimulatorConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            granularity: Granularity::OneDay,
            frequency: FrequencyConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    pub signals: Vec<Signal>,
    pub summary: PerformanceSummary,
    pub signal_analysis: String,
    pub from_cache: bool,
}

/// Run one backtest. A range already backtested for this symbol is served
/// from storage unchanged; otherwise signals are generated, simulated,
/// persisted and summarized.
pub fn run_backtest(
    store: &dyn CandleStore,
    request: &BacktestRequest,
    config: &BacktestConfig,
) -> Result<BacktestReport, SignalForgeError> {
    if request.start >= request.end {
        return Ok(BacktestReport {
            summary: performance::summarize(&[]),
            signals: Vec::new(),
            signal_analysis: "Requested range is empty: start date must precede end date."
                .to_string(),
            from_cache: false,
        });
    }

    let cached = store.signals_for_range(&request.symbol, request.start, request.end)?;
    if !cached.is_empty() {
        return Ok(report_for(cached, false, true));
    }

    let midnight = NaiveTime::default();
    let load_start = (request.start - Duration::days(WARMUP_DAYS))
        .and_time(midnight)
        .and_utc();
    let load_end = (request.end + Duration::days(config.simulator.lookahead_days + 1))
        .and_time(midnight)
        .and_utc();

    let mut candles =
        store.candles_in_range(&request.symbol, config.granularity, load_start, load_end)?;
    candles.sort_by_key(|c| c.timestamp);

    if candles.is_empty() {
        return Ok(report_for(Vec::new(), true, false));
    }

    // Dates persisted by earlier overlapping runs stay as stored; their rows
    // are reused in this range's set instead of being regenerated and re-keyed.
    let existing = store.signals_between(&request.symbol, request.start, request.end)?;
    let taken: HashSet<NaiveDate> = existing.iter().map(|s| s.created_at).collect();

    let mut signals = frequency::guarantee(
        &request.symbol,
        &candles,
        request.start,
        request.end,
        &config.frequency,
    );
    signals.retain(|s| !taken.contains(&s.created_at));
    signals.extend(existing);
    signals.sort_by_key(|s| s.created_at);

    if request.desired_signal_count > 0 && signals.len() > request.desired_signal_count {
        signals.truncate(request.desired_signal_count);
    }

    for signal in &mut signals {
        if signal.outcome.is_none() {
            signal.outcome = Some(simulator::simulate(signal, &candles, &config.simulator));
        }
    }

    store.store_signals(&signals, request.start, request.end)?;

    Ok(report_for(signals, false, false))
}

/// Re-simulate and persist outcomes for signals whose simulation never
/// completed, e.g. after a crash between generation and simulation. The
/// candle window is derived from the pending signals' own dates, and rows
/// are healed in place without touching their range membership.
pub fn recover_missing_outcomes(
    store: &dyn CandleStore,
    symbol: &str,
    config: &BacktestConfig,
) -> Result<usize, SignalForgeError> {
    let mut pending = store.signals_missing_outcome(symbol)?;
    let (Some(first), Some(last)) = (
        pending.iter().map(|s| s.created_at).min(),
        pending.iter().map(|s| s.created_at).max(),
    ) else {
        return Ok(0);
    };

    let midnight = NaiveTime::default();
    let load_start = (first - Duration::days(WARMUP_DAYS))
        .and_time(midnight)
        .and_utc();
    let load_end = (last + Duration::days(config.simulator.lookahead_days + 1))
        .and_time(midnight)
        .and_utc();
    let candles = store.candles_in_range(symbol, config.granularity, load_start, load_end)?;

    for signal in &mut pending {
        signal.outcome = Some(simulator::simulate(signal, &candles, &config.simulator));
    }
    store.update_signal_outcomes(&pending)?;
    Ok(pending.len())
}

fn report_for(signals: Vec<Signal>, no_data: bool, from_cache: bool) -> BacktestReport {
    let summary = performance::summarize(&signals);
    let signal_analysis = if from_cache {
        format!(
            "Returned {} previously generated signals for this range.",
            signals.len()
        )
    } else if signals.is_empty() && no_data {
        "No candle data available for the requested range; fetch history first.".to_string()
    } else if signals.is_empty() {
        "Candle data present but the strategy produced no qualifying signals.".to_string()
    } else {
        format!(
            "Generated {} signals: {} profitable, {} losing, {} not opened.",
            summary.total_signals,
            summary.profit_signals,
            summary.loss_signals,
            summary.not_opened
        )
    };

    BacktestReport {
        signals,
        summary,
        signal_analysis,
        from_cache,
    }
}
