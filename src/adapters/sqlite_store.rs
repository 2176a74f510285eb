//! SQLite candle and signal store.
//!
//! Candles are keyed by (symbol, timestamp, granularity) with upsert
//! semantics. Signal rows are keyed by (symbol, created_at) alone; the
//! backtest ranges that produced or reused a signal are tracked in a
//! separate membership table, so overlapping ranges share rows and each
//! range keeps returning exactly the set it was answered with.

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Row};

use crate::domain::candle::{Candle, CoverageRange, Granularity};
use crate::domain::decision::Direction;
use crate::domain::error::SignalForgeError;
use crate::domain::signal::{Signal, SourceTag};
use crate::domain::simulator::{ExecutionStatus, SimulationOutcome};
use crate::ports::candle_store::CandleStore;
use crate::ports::config_port::ConfigPort;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SignalForgeError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| SignalForgeError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| SignalForgeError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, SignalForgeError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| SignalForgeError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), SignalForgeError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS candles (
                symbol TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                granularity TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                PRIMARY KEY (symbol, timestamp, granularity)
            );
            CREATE INDEX IF NOT EXISTS idx_candles_symbol_granularity
                ON candles(symbol, granularity);

            CREATE TABLE IF NOT EXISTS coverage (
                symbol TEXT NOT NULL,
                granularity TEXT NOT NULL,
                earliest TEXT,
                latest TEXT,
                record_count INTEGER NOT NULL,
                complete INTEGER NOT NULL,
                PRIMARY KEY (symbol, granularity)
            );

            CREATE TABLE IF NOT EXISTS signals (
                id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                created_at TEXT NOT NULL,
                direction TEXT NOT NULL,
                entry_price REAL NOT NULL,
                target_price REAL NOT NULL,
                stop_loss REAL NOT NULL,
                risk_reward_ratio REAL NOT NULL,
                confidence REAL NOT NULL,
                quality_score REAL NOT NULL,
                source_tag TEXT NOT NULL,
                execution_status TEXT,
                execution_price REAL,
                executed_at TEXT,
                profit_loss_pct REAL,
                PRIMARY KEY (symbol, created_at)
            );

            CREATE TABLE IF NOT EXISTS signal_ranges (
                symbol TEXT NOT NULL,
                range_start TEXT NOT NULL,
                range_end TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (symbol, range_start, range_end, created_at)
            );",
        )
        .map_err(|e: rusqlite::Error| SignalForgeError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    fn conn(
        &self,
    ) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, SignalForgeError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| SignalForgeError::Database {
                reason: e.to_string(),
            })
    }
}

fn query_err(e: rusqlite::Error) -> SignalForgeError {
    SignalForgeError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, SignalForgeError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SignalForgeError::DatabaseQuery {
            reason: format!("bad timestamp '{}': {}", raw, e),
        })
}

fn candle_from_row(row: &Row<'_>) -> Result<Candle, rusqlite::Error> {
    Ok(Candle {
        symbol: row.get(0)?,
        timestamp: DateTime::parse_from_rfc3339(&row.get::<_, String>(1)?)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
        granularity: Granularity::parse(&row.get::<_, String>(2)?).unwrap_or(Granularity::OneDay),
        open: row.get(3)?,
        high: row.get(4)?,
        low: row.get(5)?,
        close: row.get(6)?,
        volume: row.get(7)?,
    })
}

fn signal_from_row(row: &Row<'_>) -> Result<Signal, rusqlite::Error> {
    let bad_text = |idx: usize, msg: String| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            msg.into(),
        )
    };

    let created_raw: String = row.get(2)?;
    let created_at = NaiveDate::parse_from_str(&created_raw, DATE_FORMAT)
        .map_err(|e| bad_text(2, e.to_string()))?;

    let direction_raw: String = row.get(3)?;
    let direction = Direction::parse(&direction_raw)
        .ok_or_else(|| bad_text(3, format!("unknown direction '{}'", direction_raw)))?;

    let tag_raw: String = row.get(10)?;
    let source_tag = SourceTag::parse(&tag_raw)
        .ok_or_else(|| bad_text(10, format!("unknown source tag '{}'", tag_raw)))?;

    let status_raw: Option<String> = row.get(11)?;
    let outcome = match status_raw {
        Some(raw) => {
            let status = ExecutionStatus::parse(&raw)
                .ok_or_else(|| bad_text(11, format!("unknown status '{}'", raw)))?;
            let executed_raw: Option<String> = row.get(13)?;
            let executed_at = match executed_raw {
                Some(ts) => Some(
                    DateTime::parse_from_rfc3339(&ts)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|e| bad_text(13, e.to_string()))?,
                ),
                None => None,
            };
            Some(SimulationOutcome {
                status,
                execution_price: row.get(12)?,
                executed_at,
                profit_loss_pct: row.get(14)?,
            })
        }
        None => None,
    };

    Ok(Signal {
        id: row.get(0)?,
        symbol: row.get(1)?,
        created_at,
        direction,
        entry_price: row.get(4)?,
        target_price: row.get(5)?,
        stop_loss: row.get(6)?,
        risk_reward_ratio: row.get(7)?,
        confidence: row.get(8)?,
        quality_score: row.get(9)?,
        source_tag,
        outcome,
    })
}

impl CandleStore for SqliteStore {
    fn upsert_candles(&self, candles: &[Candle]) -> Result<usize, SignalForgeError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for candle in candles {
            tx.execute(
                "INSERT OR REPLACE INTO candles
                    (symbol, timestamp, granularity, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    candle.symbol,
                    candle.timestamp.to_rfc3339(),
                    candle.granularity.interval(),
                    candle.open,
                    candle.high,
                    candle.low,
                    candle.close,
                    candle.volume
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(candles.len())
    }

    fn candles_in_range(
        &self,
        symbol: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, SignalForgeError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, timestamp, granularity, open, high, low, close, volume
                 FROM candles
                 WHERE symbol = ?1 AND granularity = ?2
                   AND timestamp >= ?3 AND timestamp <= ?4
                 ORDER BY timestamp ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![
                    symbol,
                    granularity.interval(),
                    start.to_rfc3339(),
                    end.to_rfc3339()
                ],
                candle_from_row,
            )
            .map_err(query_err)?;

        let mut candles = Vec::new();
        for row in rows {
            candles.push(row.map_err(query_err)?);
        }
        Ok(candles)
    }

    fn coverage(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<Option<CoverageRange>, SignalForgeError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT earliest, latest, record_count, complete
                 FROM coverage WHERE symbol = ?1 AND granularity = ?2",
            )
            .map_err(query_err)?;

        let mut rows = stmt
            .query(params![symbol, granularity.interval()])
            .map_err(query_err)?;

        match rows.next().map_err(query_err)? {
            Some(row) => {
                let earliest_raw: Option<String> = row.get(0).map_err(query_err)?;
                let latest_raw: Option<String> = row.get(1).map_err(query_err)?;
                let earliest = earliest_raw.as_deref().map(parse_timestamp).transpose()?;
                let latest = latest_raw.as_deref().map(parse_timestamp).transpose()?;
                Ok(Some(CoverageRange {
                    symbol: symbol.to_string(),
                    granularity,
                    earliest,
                    latest,
                    count: row.get::<_, i64>(2).map_err(query_err)? as usize,
                    complete: row.get::<_, i64>(3).map_err(query_err)? != 0,
                }))
            }
            None => Ok(None),
        }
    }

    fn update_coverage(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<CoverageRange, SignalForgeError> {
        let conn = self.conn()?;

        let (earliest_raw, latest_raw, count): (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(timestamp), MAX(timestamp), COUNT(*)
                 FROM candles WHERE symbol = ?1 AND granularity = ?2",
                params![symbol, granularity.interval()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        let earliest = earliest_raw.as_deref().map(parse_timestamp).transpose()?;
        let latest = latest_raw.as_deref().map(parse_timestamp).transpose()?;

        // completeness check: bar count matches the span for the granularity
        let complete = match (earliest, latest) {
            (Some(first), Some(last)) => {
                let span = last - first;
                let expected = span.num_seconds() / granularity.bar_duration().num_seconds() + 1;
                count >= expected
            }
            _ => false,
        };

        conn.execute(
            "INSERT OR REPLACE INTO coverage
                (symbol, granularity, earliest, latest, record_count, complete)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                symbol,
                granularity.interval(),
                earliest.map(|t| t.to_rfc3339()),
                latest.map(|t| t.to_rfc3339()),
                count,
                complete as i64
            ],
        )
        .map_err(query_err)?;

        Ok(CoverageRange {
            symbol: symbol.to_string(),
            granularity,
            earliest,
            latest,
            count: count as usize,
            complete,
        })
    }

    fn store_signals(
        &self,
        signals: &[Signal],
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> Result<(), SignalForgeError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for signal in signals {
            let (status, price, executed_at, pct) = match &signal.outcome {
                Some(o) => (
                    Some(o.status.as_str()),
                    o.execution_price,
                    o.executed_at.map(|t| t.to_rfc3339()),
                    o.profit_loss_pct,
                ),
                None => (None, None, None, None),
            };

            tx.execute(
                "INSERT OR REPLACE INTO signals
                    (id, symbol, created_at, direction, entry_price, target_price,
                     stop_loss, risk_reward_ratio, confidence, quality_score,
                     source_tag, execution_status, execution_price, executed_at,
                     profit_loss_pct)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                         ?14, ?15)",
                params![
                    signal.id,
                    signal.symbol,
                    signal.created_at.format(DATE_FORMAT).to_string(),
                    signal.direction.as_str(),
                    signal.entry_price,
                    signal.target_price,
                    signal.stop_loss,
                    signal.risk_reward_ratio,
                    signal.confidence,
                    signal.quality_score,
                    signal.source_tag.as_str(),
                    status,
                    price,
                    executed_at,
                    pct
                ],
            )
            .map_err(query_err)?;

            tx.execute(
                "INSERT OR REPLACE INTO signal_ranges
                    (symbol, range_start, range_end, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    signal.symbol,
                    range_start.format(DATE_FORMAT).to_string(),
                    range_end.format(DATE_FORMAT).to_string(),
                    signal.created_at.format(DATE_FORMAT).to_string()
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }

    fn signals_for_range(
        &self,
        symbol: &str,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> Result<Vec<Signal>, SignalForgeError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT s.id, s.symbol, s.created_at, s.direction, s.entry_price,
                        s.target_price, s.stop_loss, s.risk_reward_ratio,
                        s.confidence, s.quality_score, s.source_tag,
                        s.execution_status, s.execution_price, s.executed_at,
                        s.profit_loss_pct
                 FROM signals s
                 JOIN signal_ranges r
                   ON r.symbol = s.symbol AND r.created_at = s.created_at
                 WHERE r.symbol = ?1 AND r.range_start = ?2 AND r.range_end = ?3
                 ORDER BY s.created_at ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![
                    symbol,
                    range_start.format(DATE_FORMAT).to_string(),
                    range_end.format(DATE_FORMAT).to_string()
                ],
                signal_from_row,
            )
            .map_err(query_err)?;

        let mut signals = Vec::new();
        for row in rows {
            signals.push(row.map_err(query_err)?);
        }
        Ok(signals)
    }

    fn signals_between(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Signal>, SignalForgeError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, symbol, created_at, direction, entry_price, target_price,
                        stop_loss, risk_reward_ratio, confidence, quality_score,
                        source_tag, execution_status, execution_price, executed_at,
                        profit_loss_pct
                 FROM signals
                 WHERE symbol = ?1 AND created_at >= ?2 AND created_at < ?3
                 ORDER BY created_at ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![
                    symbol,
                    start.format(DATE_FORMAT).to_string(),
                    end.format(DATE_FORMAT).to_string()
                ],
                signal_from_row,
            )
            .map_err(query_err)?;

        let mut signals = Vec::new();
        for row in rows {
            signals.push(row.map_err(query_err)?);
        }
        Ok(signals)
    }

    fn signals_missing_outcome(&self, symbol: &str) -> Result<Vec<Signal>, SignalForgeError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, symbol, created_at, direction, entry_price, target_price,
                        stop_loss, risk_reward_ratio, confidence, quality_score,
                        source_tag, execution_status, execution_price, executed_at,
                        profit_loss_pct
                 FROM signals
                 WHERE symbol = ?1 AND execution_status IS NULL
                 ORDER BY created_at ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![symbol], signal_from_row)
            .map_err(query_err)?;

        let mut signals = Vec::new();
        for row in rows {
            signals.push(row.map_err(query_err)?);
        }
        Ok(signals)
    }

    fn update_signal_outcomes(&self, signals: &[Signal]) -> Result<(), SignalForgeError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for signal in signals {
            let (status, price, executed_at, pct) = match &signal.outcome {
                Some(o) => (
                    Some(o.status.as_str()),
                    o.execution_price,
                    o.executed_at.map(|t| t.to_rfc3339()),
                    o.profit_loss_pct,
                ),
                None => (None, None, None, None),
            };

            tx.execute(
                "UPDATE signals
                 SET execution_status = ?1, execution_price = ?2,
                     executed_at = ?3, profit_loss_pct = ?4
                 WHERE symbol = ?5 AND created_at = ?6",
                params![
                    status,
                    price,
                    executed_at,
                    pct,
                    signal.symbol,
                    signal.created_at.format(DATE_FORMAT).to_string()
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }
}
