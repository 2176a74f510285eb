//! Exponential moving average of closes.
//!
//! Seeded with the SMA of the first `period` closes, then
//! ema = close * k + prev_ema * (1 - k) with k = 2 / (period + 1).

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_ema(candles: &[Candle], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());

    if period == 0 || candles.len() < period {
        for c in candles {
            values.push(IndicatorPoint {
                timestamp: c.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
        }
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(period),
            values,
        };
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;

    for (i, candle) in candles.iter().enumerate() {
        if i + 1 < period {
            values.push(IndicatorPoint {
                timestamp: candle.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
            continue;
        }

        if i + 1 == period {
            let seed: f64 = candles[..period].iter().map(|c| c.close).sum();
            ema = seed / period as f64;
        } else {
            ema = candle.close * k + ema * (1.0 - k);
        }

        values.push(IndicatorPoint {
            timestamp: candle.timestamp,
            valid: true,
            value: IndicatorValue::Simple(ema),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_candles;

    #[test]
    fn ema_too_few_bars() {
        let candles = make_candles(&[1.0, 2.0]);
        let series = calculate_ema(&candles, 5);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn ema_seed_is_sma() {
        let candles = make_candles(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&candles, 3);
        assert!((series.simple_at(2).unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn ema_recursive_step() {
        let candles = make_candles(&[10.0, 20.0, 30.0, 40.0]);
        let series = calculate_ema(&candles, 3);
        let k = 2.0 / 4.0;
        let expected = 40.0 * k + 20.0 * (1.0 - k);
        assert!((series.simple_at(3).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn ema_constant_prices() {
        let candles = make_candles(&[50.0; 10]);
        let series = calculate_ema(&candles, 4);
        for i in 3..10 {
            assert!((series.simple_at(i).unwrap() - 50.0).abs() < 1e-9);
        }
    }
}
