//! RSI (Relative Strength Index) over trailing simple averages.
//!
//! avg_gain and avg_loss are plain means of the positive/negative close-to-close
//! deltas over the trailing `period` deltas (no Wilder smoothing).
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss); if avg_loss == 0, RSI = 100.
//!
//! Warmup: first `period` bars are invalid (need `period` deltas).

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_rsi(candles: &[Candle], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());

    if period == 0 || candles.len() < 2 {
        for c in candles {
            values.push(IndicatorPoint {
                timestamp: c.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
        }
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values,
        };
    }

    let deltas: Vec<f64> = candles
        .windows(2)
        .map(|w| w[1].close - w[0].close)
        .collect();

    for (i, candle) in candles.iter().enumerate() {
        // Bar i has deltas[..i] behind it; need `period` of them.
        if i < period {
            values.push(IndicatorPoint {
                timestamp: candle.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
            continue;
        }

        let window = &deltas[i - period..i];
        let avg_gain: f64 =
            window.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
        let avg_loss: f64 =
            -window.iter().filter(|d| **d < 0.0).sum::<f64>() / period as f64;

        let rsi = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        };

        values.push(IndicatorPoint {
            timestamp: candle.timestamp,
            valid: true,
            value: IndicatorValue::Simple(rsi),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_candles;

    #[test]
    fn rsi_empty() {
        let series = calculate_rsi(&[], 14);
        assert!(series.values.is_empty());
    }

    #[test]
    fn rsi_single_bar_invalid() {
        let candles = make_candles(&[100.0]);
        let series = calculate_rsi(&candles, 14);
        assert_eq!(series.values.len(), 1);
        assert!(!series.values[0].valid);
    }

    #[test]
    fn rsi_warmup_period() {
        let candles = make_candles(
            &(0..20)
                .map(|i| 100.0 + (i % 5) as f64)
                .collect::<Vec<_>>(),
        );
        let series = calculate_rsi(&candles, 14);
        for i in 0..14 {
            assert!(!series.values[i].valid, "bar {} should be warmup", i);
        }
        assert!(series.values[14].valid);
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let candles = make_candles(&(0..16).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        let series = calculate_rsi(&candles, 14);
        let rsi = series.simple_at(15).unwrap();
        assert!((rsi - 100.0).abs() < f64::EPSILON, "got {}", rsi);
    }

    #[test]
    fn rsi_flat_prices_is_100() {
        // no losses at all -> avg_loss = 0 -> 100 by definition
        let candles = make_candles(&[100.0; 16]);
        let series = calculate_rsi(&candles, 14);
        assert!((series.simple_at(15).unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let candles = make_candles(&(0..16).map(|i| 100.0 - i as f64).collect::<Vec<_>>());
        let series = calculate_rsi(&candles, 14);
        assert!((series.simple_at(15).unwrap() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_balanced_is_50() {
        // alternating +1/-1 deltas over an even window
        let mut closes = Vec::new();
        let mut price = 100.0;
        closes.push(price);
        for i in 0..14 {
            price += if i % 2 == 0 { 1.0 } else { -1.0 };
            closes.push(price);
        }
        let candles = make_candles(&closes);
        let series = calculate_rsi(&candles, 14);
        let rsi = series.simple_at(14).unwrap();
        assert!((rsi - 50.0).abs() < 1e-9, "got {}", rsi);
    }

    #[test]
    fn rsi_bounded() {
        let candles = make_candles(
            &(0..40)
                .map(|i| 100.0 + ((i * 7) % 13) as f64 - 6.0)
                .collect::<Vec<_>>(),
        );
        let series = calculate_rsi(&candles, 14);
        for i in 0..candles.len() {
            if let Some(rsi) = series.simple_at(i) {
                assert!((0.0..=100.0).contains(&rsi), "RSI {} out of range", rsi);
            }
        }
    }
}
