//! OHLCV candle representation and bar granularities.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Upstream klines page limit; fetch windows are sized so one request
/// can never need more bars than this.
pub const MAX_BARS_PER_REQUEST: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    FourHours,
    OneDay,
}

impl Granularity {
    /// Interval token used by the exchange klines API.
    pub fn interval(&self) -> &'static str {
        match self {
            Granularity::OneMinute => "1m",
            Granularity::FiveMinutes => "5m",
            Granularity::FifteenMinutes => "15m",
            Granularity::OneHour => "1h",
            Granularity::FourHours => "4h",
            Granularity::OneDay => "1d",
        }
    }

    pub fn parse(s: &str) -> Option<Granularity> {
        match s {
            "1m" => Some(Granularity::OneMinute),
            "5m" => Some(Granularity::FiveMinutes),
            "15m" => Some(Granularity::FifteenMinutes),
            "1h" => Some(Granularity::OneHour),
            "4h" => Some(Granularity::FourHours),
            "1d" => Some(Granularity::OneDay),
            _ => None,
        }
    }

    pub fn bar_duration(&self) -> Duration {
        match self {
            Granularity::OneMinute => Duration::minutes(1),
            Granularity::FiveMinutes => Duration::minutes(5),
            Granularity::FifteenMinutes => Duration::minutes(15),
            Granularity::OneHour => Duration::hours(1),
            Granularity::FourHours => Duration::hours(4),
            Granularity::OneDay => Duration::days(1),
        }
    }

    /// Largest [start, end) span a single fetch request may cover:
    /// one full page of bars at this granularity.
    pub fn max_fetch_window(&self) -> Duration {
        self.bar_duration() * MAX_BARS_PER_REQUEST as i32
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.interval())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub granularity: Granularity,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// low <= open,close <= high, all prices positive and finite.
    pub fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0)
            && self.volume.is_finite()
            && self.volume >= 0.0
            && self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// |close - open|
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// high - max(open, close)
    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// min(open, close) - low
    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Stored extent of candle data per (symbol, granularity). Bounds are
/// absent when no bars are stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRange {
    pub symbol: String,
    pub granularity: Granularity,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    pub count: usize,
    pub complete: bool,
}
