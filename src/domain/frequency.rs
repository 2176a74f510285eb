//! Signal cadence guarantee over a date range.
//!
//! The natural pass runs the standard decision rules once per day. When a
//! range yields fewer signals than one per ~60 days, unused dates are filled
//! deterministically: first with relaxed-confirmation signals, then with pure
//! trend-following ones. Every step is reproducible from the candle data
//! alone, so repeated runs over the same range produce identical signal sets.
//!
//! A directionless market can leave the minimum unmet: no fill step emits a
//! signal without a direction or below its minimum risk/reward.

use chrono::NaiveDate;

use crate::domain::candle::Candle;
use crate::domain::decision::{self, DecisionRules};
use crate::domain::indicator::{IndicatorFrame, IndicatorParams};
use crate::domain::signal::{self, RiskParams, Signal, SourceTag};

/// One guaranteed signal per this many days of range.
pub const DAYS_PER_REQUIRED_SIGNAL: i64 = 60;

/// Synthetic trend-following entries move at most this fraction off the close.
const MAX_JITTER: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyConfig {
    pub indicator_params: IndicatorParams,
    pub standard_rules: DecisionRules,
    pub relaxed_rules: DecisionRules,
    pub standard_risk: RiskParams,
    pub fallback_risk: RiskParams,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        FrequencyConfig {
            indicator_params: IndicatorParams::default(),
            standard_rules: DecisionRules::standard(),
            relaxed_rules: DecisionRules::relaxed(),
            standard_risk: RiskParams::standard(),
            fallback_risk: RiskParams::conservative(),
        }
    }
}

pub fn min_required(start: NaiveDate, end: NaiveDate) -> usize {
    let days = (end - start).num_days().max(0);
    ((days / DAYS_PER_REQUIRED_SIGNAL).max(1)) as usize
}

/// Generate the signal set for `[start, end)`. `candles` must be daily bars
/// sorted ascending and should extend back far enough before `start` to warm
/// up the indicators.
pub fn guarantee(
    symbol: &str,
    candles: &[Candle],
    start: NaiveDate,
    end: NaiveDate,
    config: &FrequencyConfig,
) -> Vec<Signal> {
    if candles.is_empty() || start >= end {
        return Vec::new();
    }

    let frame = IndicatorFrame::compute(candles, &config.indicator_params);

    // (bar index, date) for every candle day inside the range
    let range_days: Vec<(usize, NaiveDate)> = candles
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            let date = c.timestamp.date_naive();
            (date >= start && date < end).then_some((i, date))
        })
        .collect();

    let mut signals: Vec<Signal> = Vec::new();

    for &(i, date) in &range_days {
        let d = decision::evaluate(candles, &frame, i, &config.standard_rules);
        if let Some(sig) = signal::synthesize(
            symbol,
            date,
            &d,
            candles[i].close,
            &config.standard_risk,
            SourceTag::Natural,
        ) {
            signals.push(sig);
        }
    }

    let required = min_required(start, end);
    if signals.len() < required {
        let used: Vec<NaiveDate> = signals.iter().map(|s| s.created_at).collect();
        let unused: Vec<(usize, NaiveDate)> = range_days
            .iter()
            .copied()
            .filter(|(_, d)| !used.contains(d))
            .collect();

        let deficit = required - signals.len();
        for (slot, &(i, date)) in evenly_spaced(&unused, deficit).iter().enumerate() {
            if let Some(sig) = synthetic_signal(symbol, candles, &frame, i, date, slot, config) {
                signals.push(sig);
            }
        }
    }

    signals.sort_by_key(|s| s.created_at);
    signals
}

/// Relaxed confirmation first, pure trend-following second. Both use the
/// conservative risk distances.
fn synthetic_signal(
    symbol: &str,
    candles: &[Candle],
    frame: &IndicatorFrame,
    i: usize,
    date: NaiveDate,
    slot: usize,
    config: &FrequencyConfig,
) -> Option<Signal> {
    let relaxed = decision::evaluate(candles, frame, i, &config.relaxed_rules);
    if let Some(sig) = signal::synthesize(
        symbol,
        date,
        &relaxed,
        candles[i].close,
        &config.fallback_risk,
        SourceTag::Relaxed,
    ) {
        return Some(sig);
    }

    let trend = decision::evaluate_trend_following(frame, i);
    let entry = candles[i].close * (1.0 + jitter(symbol, date, slot));
    signal::synthesize(
        symbol,
        date,
        &trend,
        entry,
        &config.fallback_risk,
        SourceTag::TrendFollowing,
    )
}

/// Pick `count` elements spread evenly across the slice, keeping order.
fn evenly_spaced<T: Copy>(items: &[T], count: usize) -> Vec<T> {
    if count == 0 || items.is_empty() {
        return Vec::new();
    }
    if count >= items.len() {
        return items.to_vec();
    }
    (0..count)
        .map(|k| items[k * items.len() / count])
        .collect()
}

/// Deterministic price variation in [-MAX_JITTER, +MAX_JITTER], derived from
/// an FNV-1a hash of (symbol, date, slot). No seedless randomness anywhere.
fn jitter(symbol: &str, date: NaiveDate, slot: usize) -> f64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    let key = format!("{}|{}|{}", symbol, date.format("%Y-%m-%d"), slot);
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    let unit = (hash % 10_000) as f64 / 10_000.0; // [0, 1)
    (unit * 2.0 - 1.0) * MAX_JITTER
}
