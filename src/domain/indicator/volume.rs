//! Volume ratio: current volume relative to its trailing moving average.
//!
//! A ratio above 1 means the bar traded heavier than its recent average.
//! The trailing average excludes the current bar so a spike does not dilute
//! its own baseline.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_volume_ratio(candles: &[Candle], window: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());

    for (i, candle) in candles.iter().enumerate() {
        if window == 0 || i < window {
            values.push(IndicatorPoint {
                timestamp: candle.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
            continue;
        }

        let avg: f64 =
            candles[i - window..i].iter().map(|c| c.volume).sum::<f64>() / window as f64;

        let ratio = if avg > 0.0 { candle.volume / avg } else { 0.0 };

        values.push(IndicatorPoint {
            timestamp: candle.timestamp,
            valid: true,
            value: IndicatorValue::Simple(ratio),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::VolumeRatio(window),
        values,
    }
}
