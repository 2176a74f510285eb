//! Volatility as the standard deviation of period-over-period returns.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_volatility(candles: &[Candle], window: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());

    if window == 0 || candles.len() < 2 {
        for c in candles {
            values.push(IndicatorPoint {
                timestamp: c.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
        }
        return IndicatorSeries {
            indicator_type: IndicatorType::Volatility(window),
            values,
        };
    }

    let returns: Vec<f64> = candles
        .windows(2)
        .map(|w| {
            if w[0].close != 0.0 {
                (w[1].close - w[0].close) / w[0].close
            } else {
                0.0
            }
        })
        .collect();

    for (i, candle) in candles.iter().enumerate() {
        if i < window {
            values.push(IndicatorPoint {
                timestamp: candle.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
            continue;
        }

        let slice = &returns[i - window..i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let variance =
            slice.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / window as f64;

        values.push(IndicatorPoint {
            timestamp: candle.timestamp,
            valid: true,
            value: IndicatorValue::Simple(variance.sqrt()),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Volatility(window),
        values,
    }
}
