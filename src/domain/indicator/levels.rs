//! Support and resistance bands: rolling extremes of lows and highs.
//!
//! Support at bar i is the minimum low over the trailing `window` bars ending
//! at i (inclusive); resistance is the mirror over highs. The current bar is
//! included so a fresh extreme immediately becomes the level.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_support(candles: &[Candle], window: usize) -> IndicatorSeries {
    rolling_extreme(candles, window, IndicatorType::Support(window), |c| c.low, f64::min)
}

pub fn calculate_resistance(candles: &[Candle], window: usize) -> IndicatorSeries {
    rolling_extreme(
        candles,
        window,
        IndicatorType::Resistance(window),
        |c| c.high,
        f64::max,
    )
}

fn rolling_extreme(
    candles: &[Candle],
    window: usize,
    indicator_type: IndicatorType,
    field: fn(&Candle) -> f64,
    pick: fn(f64, f64) -> f64,
) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());

    for (i, candle) in candles.iter().enumerate() {
        if window == 0 || i + 1 < window {
            values.push(IndicatorPoint {
                timestamp: candle.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
            continue;
        }

        let extreme = candles[i + 1 - window..=i]
            .iter()
            .map(field)
            .reduce(pick)
            .unwrap_or(0.0);

        values.push(IndicatorPoint {
            timestamp: candle.timestamp,
            valid: true,
            value: IndicatorValue::Simple(extreme),
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
