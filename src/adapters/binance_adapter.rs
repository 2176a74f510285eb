//! Binance-style klines HTTP adapter.
//!
//! Fetches OHLCV bars from a klines REST endpoint. The response is an array
//! of arrays mixing integers (timestamps), strings (prices) and floats, so
//! each element is parsed through an untagged enum before conversion.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::candle::{Candle, Granularity};
use crate::domain::error::SignalForgeError;
use crate::ports::config_port::ConfigPort;
use crate::ports::exchange_port::ExchangePort;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// One cell of a kline row: open time is an integer, prices and volume
/// arrive as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KlineField {
    Int(i64),
    Float(f64),
    Text(String),
}

impl KlineField {
    fn as_i64(&self) -> Option<i64> {
        match self {
            KlineField::Int(v) => Some(*v),
            KlineField::Float(v) => Some(*v as i64),
            KlineField::Text(s) => s.parse().ok(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            KlineField::Int(v) => Some(*v as f64),
            KlineField::Float(v) => Some(*v),
            KlineField::Text(s) => s.parse().ok(),
        }
    }
}

pub struct BinanceAdapter {
    client: Client,
    base_url: String,
}

impl BinanceAdapter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SignalForgeError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            SignalForgeError::Exchange {
                reason: format!("failed to build HTTP client: {}", e),
            }
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SignalForgeError> {
        let base_url = config
            .get_string("exchange", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout =
            config.get_int("exchange", "timeout_secs", DEFAULT_TIMEOUT_SECS as i64) as u64;
        Self::new(&base_url, Duration::from_secs(timeout))
    }

    fn klines_url(
        &self,
        symbol: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> String {
        format!(
            "{}/api/v3/klines?symbol={}&interval={}&startTime={}&endTime={}&limit={}",
            self.base_url,
            symbol,
            granularity.interval(),
            start.timestamp_millis(),
            end.timestamp_millis(),
            limit
        )
    }

    fn parse_rows(
        symbol: &str,
        granularity: Granularity,
        rows: Vec<Vec<KlineField>>,
    ) -> Result<Vec<Candle>, SignalForgeError> {
        let mut candles = Vec::with_capacity(rows.len());

        for row in rows {
            if row.len() < 6 {
                return Err(SignalForgeError::MalformedCandle {
                    symbol: symbol.to_string(),
                    reason: format!("kline row has {} fields, expected at least 6", row.len()),
                });
            }

            let open_time_ms =
                row[0]
                    .as_i64()
                    .ok_or_else(|| SignalForgeError::MalformedCandle {
                        symbol: symbol.to_string(),
                        reason: "open time is not an integer".into(),
                    })?;
            let timestamp = Utc.timestamp_millis_opt(open_time_ms).single().ok_or_else(
                || SignalForgeError::MalformedCandle {
                    symbol: symbol.to_string(),
                    reason: format!("invalid open time {}", open_time_ms),
                },
            )?;

            let price = |i: usize, name: &str| {
                row[i]
                    .as_f64()
                    .ok_or_else(|| SignalForgeError::MalformedCandle {
                        symbol: symbol.to_string(),
                        reason: format!("{} is not numeric", name),
                    })
            };

            candles.push(Candle {
                symbol: symbol.to_string(),
                timestamp,
                granularity,
                open: price(1, "open")?,
                high: price(2, "high")?,
                low: price(3, "low")?,
                close: price(4, "close")?,
                volume: price(5, "volume")?,
            });
        }

        Ok(candles)
    }
}

impl ExchangePort for BinanceAdapter {
    fn fetch_klines(
        &self,
        symbol: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Candle>, SignalForgeError> {
        let url = self.klines_url(symbol, granularity, start, end, limit);

        let response =
            self.client
                .get(&url)
                .send()
                .map_err(|e| SignalForgeError::Exchange {
                    reason: format!("request failed: {}", e),
                })?;

        if !response.status().is_success() {
            return Err(SignalForgeError::Exchange {
                reason: format!("HTTP {} from {}", response.status(), url),
            });
        }

        let rows: Vec<Vec<KlineField>> =
            response.json().map_err(|e| SignalForgeError::Exchange {
                reason: format!("failed to decode klines response: {}", e),
            })?;

        Self::parse_rows(symbol, granularity, rows)
    }
}
