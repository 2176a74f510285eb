//! Candlestick pattern recognition over adjacent bar pairs.

use crate::domain::candle::Candle;
use crate::domain::decision::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandlePattern {
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
    ShootingStar,
}

impl CandlePattern {
    pub fn is_bullish(&self) -> bool {
        matches!(
            self,
            CandlePattern::BullishEngulfing | CandlePattern::Hammer
        )
    }

    pub fn matches_direction(&self, direction: Direction) -> bool {
        match direction {
            Direction::Buy => self.is_bullish(),
            Direction::Sell => !self.is_bullish(),
            Direction::Hold => false,
        }
    }
}

/// Wick must be at least this multiple of the body for hammer/shooting star.
const WICK_BODY_RATIO: f64 = 2.0;
/// Body must stay under this fraction of the bar range for hammer/shooting star.
const SMALL_BODY_FRACTION: f64 = 0.35;

/// Detect a pattern completed by `curr`, with `prev` as its context bar.
/// Engulfing patterns take priority over single-bar shapes.
pub fn detect(prev: &Candle, curr: &Candle) -> Option<CandlePattern> {
    if is_bullish_engulfing(prev, curr) {
        return Some(CandlePattern::BullishEngulfing);
    }
    if is_bearish_engulfing(prev, curr) {
        return Some(CandlePattern::BearishEngulfing);
    }
    if is_hammer(curr) {
        return Some(CandlePattern::Hammer);
    }
    if is_shooting_star(curr) {
        return Some(CandlePattern::ShootingStar);
    }
    None
}

fn is_bullish_engulfing(prev: &Candle, curr: &Candle) -> bool {
    !prev.is_bullish()
        && curr.is_bullish()
        && curr.open <= prev.close
        && curr.close >= prev.open
        && curr.body() > prev.body()
}

fn is_bearish_engulfing(prev: &Candle, curr: &Candle) -> bool {
    prev.is_bullish()
        && !curr.is_bullish()
        && curr.open >= prev.close
        && curr.close <= prev.open
        && curr.body() > prev.body()
}

fn is_hammer(c: &Candle) -> bool {
    let range = c.range();
    range > 0.0
        && c.body() <= range * SMALL_BODY_FRACTION
        && c.lower_wick() >= c.body() * WICK_BODY_RATIO
        && c.lower_wick() > c.upper_wick()
}

fn is_shooting_star(c: &Candle) -> bool {
    let range = c.range();
    range > 0.0
        && c.body() <= range * SMALL_BODY_FRACTION
        && c.upper_wick() >= c.body() * WICK_BODY_RATIO
        && c.upper_wick() > c.lower_wick()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Granularity;
    use chrono::{TimeZone, Utc};

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            symbol: "BTCUSDT".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            granularity: Granularity::OneDay,
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn bullish_engulfing_detected() {
        let prev = bar(105.0, 106.0, 99.0, 100.0); // red
        let curr = bar(99.5, 107.0, 99.0, 106.0); // green, engulfs
        assert_eq!(detect(&prev, &curr), Some(CandlePattern::BullishEngulfing));
    }

    #[test]
    fn bearish_engulfing_detected() {
        let prev = bar(100.0, 106.0, 99.0, 105.0); // green
        let curr = bar(105.5, 106.0, 98.0, 99.0); // red, engulfs
        assert_eq!(detect(&prev, &curr), Some(CandlePattern::BearishEngulfing));
    }

    #[test]
    fn hammer_detected() {
        let prev = bar(100.0, 101.0, 99.0, 100.5);
        // long lower wick, tiny body near top
        let curr = bar(100.0, 100.8, 95.0, 100.5);
        assert_eq!(detect(&prev, &curr), Some(CandlePattern::Hammer));
    }

    #[test]
    fn shooting_star_detected() {
        let prev = bar(100.0, 101.0, 99.0, 100.5);
        // long upper wick, tiny body near bottom
        let curr = bar(100.5, 106.0, 100.0, 100.2);
        assert_eq!(detect(&prev, &curr), Some(CandlePattern::ShootingStar));
    }

    #[test]
    fn plain_bar_no_pattern() {
        let prev = bar(100.0, 103.0, 99.0, 102.0);
        let curr = bar(102.0, 105.0, 101.0, 104.0);
        assert_eq!(detect(&prev, &curr), None);
    }

    #[test]
    fn small_green_bar_does_not_engulf() {
        let prev = bar(105.0, 106.0, 99.0, 100.0);
        let curr = bar(101.0, 103.0, 100.5, 102.0); // inside prev body
        assert_ne!(detect(&prev, &curr), Some(CandlePattern::BullishEngulfing));
    }

    #[test]
    fn direction_matching() {
        assert!(CandlePattern::Hammer.matches_direction(Direction::Buy));
        assert!(!CandlePattern::Hammer.matches_direction(Direction::Sell));
        assert!(CandlePattern::ShootingStar.matches_direction(Direction::Sell));
        assert!(CandlePattern::BullishEngulfing.matches_direction(Direction::Buy));
        assert!(CandlePattern::BearishEngulfing.matches_direction(Direction::Sell));
        assert!(!CandlePattern::Hammer.matches_direction(Direction::Hold));
    }
}
