//! Historical candle ingestion: windowed fetches against an exchange port
//! with retry, backoff and rate-limit pacing, written through the candle
//! store with idempotent upserts.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::candle::{CoverageRange, Granularity, MAX_BARS_PER_REQUEST};
use crate::domain::error::SignalForgeError;
use crate::ports::{CandleStore, ExchangePort};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Delay between consecutive requests.
    pub pacing: Duration,
    /// Take a longer pause after this many requests.
    pub burst_every: usize,
    pub burst_pause: Duration,
    pub max_retries: u32,
    /// First retry delay; doubles per attempt.
    pub base_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            pacing: Duration::from_millis(200),
            burst_every: 10,
            burst_pause: Duration::from_secs(2),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Sleep seam so tests can run the retry/pacing logic without waiting.
pub trait Pacer {
    fn pause(&self, duration: Duration);
}

pub struct SleepPacer;

impl Pacer for SleepPacer {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

pub struct HistoricalFetcher<'a> {
    exchange: &'a dyn ExchangePort,
    store: &'a dyn CandleStore,
    config: FetchConfig,
    pacer: &'a dyn Pacer,
}

impl<'a> HistoricalFetcher<'a> {
    pub fn new(
        exchange: &'a dyn ExchangePort,
        store: &'a dyn CandleStore,
        config: FetchConfig,
        pacer: &'a dyn Pacer,
    ) -> Self {
        HistoricalFetcher {
            exchange,
            store,
            config,
            pacer,
        }
    }

    /// Fetch `[start, end)` in windows sized to the exchange page limit,
    /// upserting each batch. A window that exhausts its retries is logged
    /// and skipped; the overall fetch continues. Returns bars saved.
    pub fn fetch(
        &self,
        symbol: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, SignalForgeError> {
        if start >= end {
            return Ok(0);
        }

        let window = granularity.max_fetch_window();
        let mut saved = 0usize;
        let mut requests = 0usize;
        let mut cursor = start;

        while cursor < end {
            let window_end = (cursor + window).min(end);

            if requests > 0 {
                self.pacer.pause(self.config.pacing);
                if self.config.burst_every > 0 && requests % self.config.burst_every == 0 {
                    self.pacer.pause(self.config.burst_pause);
                }
            }
            requests += 1;

            match self.fetch_window_with_retry(symbol, granularity, cursor, window_end) {
                Some(batch) => {
                    let valid: Vec<_> = batch
                        .into_iter()
                        .filter(|c| {
                            if c.is_well_formed() {
                                true
                            } else {
                                eprintln!(
                                    "Warning: discarding malformed bar for {} at {}",
                                    symbol, c.timestamp
                                );
                                false
                            }
                        })
                        .collect();
                    saved += self.store.upsert_candles(&valid)?;
                }
                None => {
                    eprintln!(
                        "Warning: window {} to {} for {} failed after {} retries, skipping",
                        cursor, window_end, symbol, self.config.max_retries
                    );
                }
            }

            cursor = window_end;
        }

        self.store.update_coverage(symbol, granularity)?;
        Ok(saved)
    }

    pub fn coverage(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<Option<CoverageRange>, SignalForgeError> {
        self.store.coverage(symbol, granularity)
    }

    fn fetch_window_with_retry(
        &self,
        symbol: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<Vec<crate::domain::candle::Candle>> {
        let mut delay = self.config.base_delay;
        for attempt in 0..=self.config.max_retries {
            match self
                .exchange
                .fetch_klines(symbol, granularity, start, end, MAX_BARS_PER_REQUEST)
            {
                Ok(batch) => return Some(batch),
                Err(e) => {
                    if attempt < self.config.max_retries {
                        eprintln!(
                            "Warning: fetch attempt {} for {} failed ({}), retrying in {:?}",
                            attempt + 1,
                            symbol,
                            e,
                            delay
                        );
                        self.pacer.pause(delay);
                        delay *= 2;
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;
    use crate::domain::signal::Signal;
    use chrono::{NaiveDate, TimeZone};
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    struct NoopPacer {
        pauses: RefCell<Vec<Duration>>,
    }

    impl NoopPacer {
        fn new() -> Self {
            NoopPacer {
                pauses: RefCell::new(Vec::new()),
            }
        }
    }

    impl Pacer for NoopPacer {
        fn pause(&self, duration: Duration) {
            self.pauses.borrow_mut().push(duration);
        }
    }

    /// Scripted exchange: pops one response per request.
    struct ScriptedExchange {
        responses: RefCell<Vec<Result<Vec<Candle>, SignalForgeError>>>,
        requests: RefCell<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    }

    impl ScriptedExchange {
        fn new(responses: Vec<Result<Vec<Candle>, SignalForgeError>>) -> Self {
            let mut rev = responses;
            rev.reverse();
            ScriptedExchange {
                responses: RefCell::new(rev),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl ExchangePort for ScriptedExchange {
        fn fetch_klines(
            &self,
            _symbol: &str,
            _granularity: Granularity,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
            _limit: usize,
        ) -> Result<Vec<Candle>, SignalForgeError> {
            self.requests.borrow_mut().push((start, end));
            self.responses.borrow_mut().pop().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    /// Map-backed store keyed like the real schema.
    struct MemoryStore {
        rows: RefCell<BTreeMap<(String, DateTime<Utc>, String), Candle>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            MemoryStore {
                rows: RefCell::new(BTreeMap::new()),
            }
        }

        fn len(&self) -> usize {
            self.rows.borrow().len()
        }
    }

    impl CandleStore for MemoryStore {
        fn upsert_candles(&self, candles: &[Candle]) -> Result<usize, SignalForgeError> {
            let mut rows = self.rows.borrow_mut();
            for c in candles {
                rows.insert(
                    (c.symbol.clone(), c.timestamp, c.granularity.interval().to_string()),
                    c.clone(),
                );
            }
            Ok(candles.len())
        }

        fn candles_in_range(
            &self,
            symbol: &str,
            granularity: Granularity,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<Candle>, SignalForgeError> {
            Ok(self
                .rows
                .borrow()
                .values()
                .filter(|c| {
                    c.symbol == symbol
                        && c.granularity == granularity
                        && c.timestamp >= start
                        && c.timestamp <= end
                })
                .cloned()
                .collect())
        }

        fn coverage(
            &self,
            _symbol: &str,
            _granularity: Granularity,
        ) -> Result<Option<CoverageRange>, SignalForgeError> {
            Ok(None)
        }

        fn update_coverage(
            &self,
            symbol: &str,
            granularity: Granularity,
        ) -> Result<CoverageRange, SignalForgeError> {
            let rows = self.rows.borrow();
            let mut timestamps: Vec<_> = rows
                .values()
                .filter(|c| c.symbol == symbol && c.granularity == granularity)
                .map(|c| c.timestamp)
                .collect();
            timestamps.sort();
            Ok(CoverageRange {
                symbol: symbol.to_string(),
                granularity,
                earliest: timestamps.first().copied(),
                latest: timestamps.last().copied(),
                count: timestamps.len(),
                complete: false,
            })
        }

        fn store_signals(
            &self,
            _signals: &[Signal],
            _range_start: NaiveDate,
            _range_end: NaiveDate,
        ) -> Result<(), SignalForgeError> {
            Ok(())
        }

        fn signals_for_range(
            &self,
            _symbol: &str,
            _range_start: NaiveDate,
            _range_end: NaiveDate,
        ) -> Result<Vec<Signal>, SignalForgeError> {
            Ok(Vec::new())
        }

        fn signals_between(
            &self,
            _symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Signal>, SignalForgeError> {
            Ok(Vec::new())
        }

        fn signals_missing_outcome(
            &self,
            _symbol: &str,
        ) -> Result<Vec<Signal>, SignalForgeError> {
            Ok(Vec::new())
        }

        fn update_signal_outcomes(&self, _signals: &[Signal]) -> Result<(), SignalForgeError> {
            Ok(())
        }
    }

    fn bar(day: u32) -> Candle {
        Candle {
            symbol: "BTCUSDT".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            granularity: Granularity::OneDay,
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.5,
            volume: 1000.0,
        }
    }

    fn range_days(n: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (start, start + chrono::Duration::days(n))
    }

    #[test]
    fn saves_fetched_bars() {
        let exchange = ScriptedExchange::new(vec![Ok(vec![bar(1), bar(2), bar(3)])]);
        let store = MemoryStore::new();
        let pacer = NoopPacer::new();
        let fetcher =
            HistoricalFetcher::new(&exchange, &store, FetchConfig::default(), &pacer);
        let (start, end) = range_days(3);
        let saved = fetcher.fetch("BTCUSDT", Granularity::OneDay, start, end).unwrap();
        assert_eq!(saved, 3);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn refetch_does_not_duplicate() {
        let store = MemoryStore::new();
        let pacer = NoopPacer::new();
        let (start, end) = range_days(2);
        for _ in 0..2 {
            let exchange = ScriptedExchange::new(vec![Ok(vec![bar(1), bar(2)])]);
            let fetcher =
                HistoricalFetcher::new(&exchange, &store, FetchConfig::default(), &pacer);
            fetcher.fetch("BTCUSDT", Granularity::OneDay, start, end).unwrap();
        }
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn retries_then_succeeds() {
        let exchange = ScriptedExchange::new(vec![
            Err(SignalForgeError::Exchange {
                reason: "timeout".into(),
            }),
            Err(SignalForgeError::Exchange {
                reason: "timeout".into(),
            }),
            Ok(vec![bar(1)]),
        ]);
        let store = MemoryStore::new();
        let pacer = NoopPacer::new();
        let fetcher =
            HistoricalFetcher::new(&exchange, &store, FetchConfig::default(), &pacer);
        let (start, end) = range_days(1);
        let saved = fetcher.fetch("BTCUSDT", Granularity::OneDay, start, end).unwrap();
        assert_eq!(saved, 1);
        // two retry delays: 500ms then 1s
        let pauses = pacer.pauses.borrow();
        assert!(pauses.contains(&Duration::from_millis(500)));
        assert!(pauses.contains(&Duration::from_millis(1000)));
    }

    #[test]
    fn exhausted_window_skipped_without_aborting() {
        let failures: Vec<Result<Vec<Candle>, SignalForgeError>> = (0..4)
            .map(|_| {
                Err(SignalForgeError::Exchange {
                    reason: "down".into(),
                })
            })
            .collect();
        let exchange = ScriptedExchange::new(failures);
        let store = MemoryStore::new();
        let pacer = NoopPacer::new();
        let fetcher =
            HistoricalFetcher::new(&exchange, &store, FetchConfig::default(), &pacer);
        let (start, end) = range_days(1);
        let saved = fetcher.fetch("BTCUSDT", Granularity::OneDay, start, end).unwrap();
        assert_eq!(saved, 0);
    }

    #[test]
    fn malformed_bars_discarded() {
        let mut bad = bar(2);
        bad.low = 200.0; // low above high
        let exchange = ScriptedExchange::new(vec![Ok(vec![bar(1), bad])]);
        let store = MemoryStore::new();
        let pacer = NoopPacer::new();
        let fetcher =
            HistoricalFetcher::new(&exchange, &store, FetchConfig::default(), &pacer);
        let (start, end) = range_days(2);
        let saved = fetcher.fetch("BTCUSDT", Granularity::OneDay, start, end).unwrap();
        assert_eq!(saved, 1);
    }

    #[test]
    fn long_range_split_into_windows() {
        // 1-day bars page at 1000 days, so 1500 days takes two requests
        let exchange =
            ScriptedExchange::new(vec![Ok(vec![bar(1)]), Ok(vec![bar(2)])]);
        let store = MemoryStore::new();
        let pacer = NoopPacer::new();
        let fetcher =
            HistoricalFetcher::new(&exchange, &store, FetchConfig::default(), &pacer);
        let (start, end) = range_days(1500);
        fetcher.fetch("BTCUSDT", Granularity::OneDay, start, end).unwrap();
        let requests = exchange.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].1, requests[1].0);
        assert_eq!(requests[1].1, end);
        // pacing delay applied between the two requests
        assert!(pacer.pauses.borrow().contains(&Duration::from_millis(200)));
    }

    #[test]
    fn empty_range_is_a_noop() {
        let exchange = ScriptedExchange::new(vec![]);
        let store = MemoryStore::new();
        let pacer = NoopPacer::new();
        let fetcher =
            HistoricalFetcher::new(&exchange, &store, FetchConfig::default(), &pacer);
        let (start, _) = range_days(1);
        let saved = fetcher.fetch("BTCUSDT", Granularity::OneDay, start, start).unwrap();
        assert_eq!(saved, 0);
        assert!(exchange.requests.borrow().is_empty());
    }
}
