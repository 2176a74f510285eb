//! Batch statistics over simulated signals: win counts, P&L totals,
//! a blended quality score and its qualitative rating.

use std::fmt;

use crate::domain::signal::Signal;
use crate::domain::simulator::ExecutionStatus;

/// Fixed notional assumed invested per signal when totaling P&L.
pub const NOTIONAL_PER_SIGNAL: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl Rating {
    pub fn from_score(score: f64) -> Rating {
        if score >= 80.0 {
            Rating::Excellent
        } else if score >= 60.0 {
            Rating::Good
        } else if score >= 40.0 {
            Rating::Fair
        } else if score >= 20.0 {
            Rating::Poor
        } else {
            Rating::VeryPoor
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rating::Excellent => "Excellent",
            Rating::Good => "Good",
            Rating::Fair => "Fair",
            Rating::Poor => "Poor",
            Rating::VeryPoor => "Very Poor",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub total_signals: usize,
    pub profit_signals: usize,
    pub loss_signals: usize,
    pub not_opened: usize,
    pub total_investment: f64,
    pub total_profit_loss: f64,
    pub total_profit_percentage: f64,
    pub quality_score: f64,
    pub rating: Rating,
}

impl PerformanceSummary {
    pub fn empty() -> Self {
        PerformanceSummary {
            total_signals: 0,
            profit_signals: 0,
            loss_signals: 0,
            not_opened: 0,
            total_investment: 0.0,
            total_profit_loss: 0.0,
            total_profit_percentage: 0.0,
            quality_score: 0.0,
            rating: Rating::VeryPoor,
        }
    }
}

/// Roll a batch of simulated signals into one summary. Signals with no
/// outcome yet count as not opened.
pub fn summarize(signals: &[Signal]) -> PerformanceSummary {
    if signals.is_empty() {
        return PerformanceSummary::empty();
    }

    let total_signals = signals.len();
    let mut profit_signals = 0usize;
    let mut loss_signals = 0usize;
    let mut not_opened = 0usize;
    let mut total_profit_loss = 0.0;
    let mut pct_sum = 0.0;

    for signal in signals {
        match &signal.outcome {
            Some(outcome) if outcome.status != ExecutionStatus::NoData => {
                let pct = outcome.profit_loss_pct.unwrap_or(0.0);
                pct_sum += pct;
                total_profit_loss += NOTIONAL_PER_SIGNAL * pct / 100.0;
                if pct > 0.0 {
                    profit_signals += 1;
                } else {
                    loss_signals += 1;
                }
            }
            _ => not_opened += 1,
        }
    }

    let executed = total_signals - not_opened;
    let execution_rate = executed as f64 / total_signals as f64 * 100.0;
    let profit_rate = if executed > 0 {
        profit_signals as f64 / executed as f64 * 100.0
    } else {
        0.0
    };
    let avg_profit_pct = if executed > 0 {
        pct_sum / executed as f64
    } else {
        0.0
    };
    let total_profit_percentage = if executed > 0 { pct_sum } else { 0.0 };

    let quality_score = 0.4 * execution_rate
        + 0.3 * profit_rate
        + 0.3 * avg_profit_pct.clamp(0.0, 100.0);

    PerformanceSummary {
        total_signals,
        profit_signals,
        loss_signals,
        not_opened,
        total_investment: total_signals as f64 * NOTIONAL_PER_SIGNAL,
        total_profit_loss,
        total_profit_percentage,
        quality_score,
        rating: Rating::from_score(quality_score),
    }
}
