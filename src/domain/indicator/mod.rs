//! Technical indicator series over candle windows.
//!
//! Every calculation is a pure function from an ordered candle slice to an
//! [`IndicatorSeries`]; warmup bars carry `valid = false` so downstream code
//! never reads a value computed from fewer bars than the period requires.

pub mod ema;
pub mod levels;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod volatility;
pub mod volume;

use crate::domain::candle::Candle;
use chrono::{DateTime, Utc};
use std::fmt;

pub use ema::calculate_ema;
pub use levels::{calculate_resistance, calculate_support};
pub use macd::{calculate_macd, calculate_macd_default};
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use volatility::calculate_volatility;
pub use volume::calculate_volume_ratio;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Volatility(usize),
    Support(usize),
    Resistance(usize),
    VolumeRatio(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Valid simple value at bar `i`, if any.
    pub fn simple_at(&self, i: usize) -> Option<f64> {
        match self.values.get(i) {
            Some(p) if p.valid => match p.value {
                IndicatorValue::Simple(v) => Some(v),
                _ => None,
            },
            _ => None,
        }
    }

    /// Valid (line, signal, histogram) triple at bar `i`, if any.
    pub fn macd_at(&self, i: usize) -> Option<(f64, f64, f64)> {
        match self.values.get(i) {
            Some(p) if p.valid => match p.value {
                IndicatorValue::Macd {
                    line,
                    signal,
                    histogram,
                } => Some((line, signal, histogram)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Volatility(period) => write!(f, "VOLATILITY({})", period),
            IndicatorType::Support(period) => write!(f, "SUPPORT({})", period),
            IndicatorType::Resistance(period) => write!(f, "RESISTANCE({})", period),
            IndicatorType::VolumeRatio(period) => write!(f, "VOLRATIO({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}

/// Periods used by the standard indicator set.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub fast_ma: usize,
    pub slow_ma: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub structure_window: usize,
    pub volume_window: usize,
    pub volatility_window: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            fast_ma: 20,
            slow_ma: 50,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            structure_window: 20,
            volume_window: 20,
            volatility_window: 20,
        }
    }
}

/// Derived per-bar view over one candle window. Recomputed on demand,
/// never persisted.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub sma_fast: IndicatorSeries,
    pub sma_slow: IndicatorSeries,
    pub rsi: IndicatorSeries,
    pub macd: IndicatorSeries,
    pub support: IndicatorSeries,
    pub resistance: IndicatorSeries,
    pub volume_ratio: IndicatorSeries,
    pub volatility: IndicatorSeries,
}

impl IndicatorFrame {
    pub fn compute(candles: &[Candle], params: &IndicatorParams) -> Self {
        IndicatorFrame {
            sma_fast: calculate_sma(candles, params.fast_ma),
            sma_slow: calculate_sma(candles, params.slow_ma),
            rsi: calculate_rsi(candles, params.rsi_period),
            macd: calculate_macd(
                candles,
                params.macd_fast,
                params.macd_slow,
                params.macd_signal,
            ),
            support: calculate_support(candles, params.structure_window),
            resistance: calculate_resistance(candles, params.structure_window),
            volume_ratio: calculate_volume_ratio(candles, params.volume_window),
            volatility: calculate_volatility(candles, params.volatility_window),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use test_support::make_candles;

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
        assert_eq!(IndicatorType::Rsi(14).to_string(), "RSI(14)");
        assert_eq!(
            IndicatorType::Macd {
                fast: 12,
                slow: 26,
                signal: 9
            }
            .to_string(),
            "MACD(12,26,9)"
        );
        assert_eq!(IndicatorType::VolumeRatio(20).to_string(), "VOLRATIO(20)");
    }

    #[test]
    fn simple_at_skips_warmup() {
        let candles = make_candles(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let series = calculate_sma(&candles, 3);
        assert_eq!(series.simple_at(0), None);
        assert_eq!(series.simple_at(1), None);
        assert!(series.simple_at(2).is_some());
        assert_eq!(series.simple_at(99), None);
    }

    #[test]
    fn frame_computes_all_series_same_length() {
        let candles = make_candles(&(1..=60).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        let frame = IndicatorFrame::compute(&candles, &IndicatorParams::default());
        for series in [
            &frame.sma_fast,
            &frame.sma_slow,
            &frame.rsi,
            &frame.macd,
            &frame.support,
            &frame.resistance,
            &frame.volume_ratio,
            &frame.volatility,
        ] {
            assert_eq!(series.values.len(), candles.len());
        }
    }

    #[test]
    fn default_params() {
        let p = IndicatorParams::default();
        assert_eq!(p.fast_ma, 20);
        assert_eq!(p.slow_ma, 50);
        assert_eq!(p.rsi_period, 14);
        assert_eq!(p.structure_window, 20);
    }
}
