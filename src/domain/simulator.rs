//! Execution simulation: replay a signal forward through the candles that
//! followed it and decide how the trade resolved.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::domain::candle::Candle;
use crate::domain::decision::Direction;
use crate::domain::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    TargetHit,
    StopLossHit,
    ClosePrice,
    NoData,
}

impl ExecutionStatus {
    pub fn is_executed(&self) -> bool {
        !matches!(self, ExecutionStatus::NoData)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::TargetHit => "TARGET_HIT",
            ExecutionStatus::StopLossHit => "STOP_LOSS_HIT",
            ExecutionStatus::ClosePrice => "CLOSE_PRICE",
            ExecutionStatus::NoData => "NO_DATA",
        }
    }

    pub fn parse(s: &str) -> Option<ExecutionStatus> {
        match s {
            "TARGET_HIT" => Some(ExecutionStatus::TargetHit),
            "STOP_LOSS_HIT" => Some(ExecutionStatus::StopLossHit),
            "CLOSE_PRICE" => Some(ExecutionStatus::ClosePrice),
            "NO_DATA" => Some(ExecutionStatus::NoData),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub status: ExecutionStatus,
    pub execution_price: Option<f64>,
    pub executed_at: Option<DateTime<Utc>>,
    pub profit_loss_pct: Option<f64>,
}

impl SimulationOutcome {
    pub fn no_data() -> Self {
        SimulationOutcome {
            status: ExecutionStatus::NoData,
            execution_price: None,
            executed_at: None,
            profit_loss_pct: None,
        }
    }
}

/// Ordering when one bar's range covers both target and stop. Intrabar
/// sequence is unknowable from OHLCV, so this is a declared policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    TargetFirst,
    StopFirst,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    pub lookahead_days: i64,
    pub tie_break: TieBreak,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            lookahead_days: 7,
            tie_break: TieBreak::TargetFirst,
        }
    }
}

/// Scan candles strictly after the signal's creation date, oldest first,
/// within the look-ahead window. First boundary touch wins; an untouched
/// window exits at the last close; an empty window is NO_DATA.
pub fn simulate(signal: &Signal, candles: &[Candle], config: &SimulatorConfig) -> SimulationOutcome {
    let signal_end = signal
        .created_at
        .and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default())
        .and_utc();
    let window_end = signal_end + Duration::days(config.lookahead_days);

    let mut window: Vec<&Candle> = candles
        .iter()
        .filter(|c| c.timestamp > signal_end && c.timestamp <= window_end)
        .collect();
    window.sort_by_key(|c| c.timestamp);

    if window.is_empty() {
        return SimulationOutcome::no_data();
    }

    for candle in &window {
        let target_touched = match signal.direction {
            Direction::Buy => candle.high >= signal.target_price,
            Direction::Sell => candle.low <= signal.target_price,
            Direction::Hold => false,
        };
        let stop_touched = match signal.direction {
            Direction::Buy => candle.low <= signal.stop_loss,
            Direction::Sell => candle.high >= signal.stop_loss,
            Direction::Hold => false,
        };

        let hit = match (target_touched, stop_touched) {
            (true, true) => Some(config.tie_break == TieBreak::TargetFirst),
            (true, false) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        };

        if let Some(target_won) = hit {
            let (status, exit) = if target_won {
                (ExecutionStatus::TargetHit, signal.target_price)
            } else {
                (ExecutionStatus::StopLossHit, signal.stop_loss)
            };
            return SimulationOutcome {
                status,
                execution_price: Some(exit),
                executed_at: Some(candle.timestamp),
                profit_loss_pct: Some(profit_pct(signal, exit)),
            };
        }
    }

    let last = window[window.len() - 1];
    SimulationOutcome {
        status: ExecutionStatus::ClosePrice,
        execution_price: Some(last.close),
        executed_at: Some(last.timestamp),
        profit_loss_pct: Some(profit_pct(signal, last.close)),
    }
}

fn profit_pct(signal: &Signal, exit: f64) -> f64 {
    let raw = (exit - signal.entry_price) / signal.entry_price * 100.0;
    match signal.direction {
        Direction::Sell => -raw,
        _ => raw,
    }
}
