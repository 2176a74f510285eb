//! Exchange market-data port trait.

use chrono::{DateTime, Utc};

use crate::domain::candle::{Candle, Granularity};
use crate::domain::error::SignalForgeError;

pub trait ExchangePort {
    /// Fetch klines for one bounded window, oldest first. `limit` caps the
    /// number of bars the exchange may return for the request.
    fn fetch_klines(
        &self,
        symbol: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Candle>, SignalForgeError>;
}
