//! Signal synthesis: turn a directional decision into a concrete tradable
//! signal with entry, target, stop and a risk/reward gate.

use chrono::NaiveDate;

use crate::domain::decision::{Decision, Direction};
use crate::domain::simulator::SimulationOutcome;

/// How a signal came to exist. Natural signals cleared the standard rules;
/// the other two tags mark synthetic fills injected to keep cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTag {
    Natural,
    Relaxed,
    TrendFollowing,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Natural => "NATURAL",
            SourceTag::Relaxed => "RELAXED",
            SourceTag::TrendFollowing => "TREND_FOLLOWING",
        }
    }

    pub fn parse(s: &str) -> Option<SourceTag> {
        match s {
            "NATURAL" => Some(SourceTag::Natural),
            "RELAXED" => Some(SourceTag::Relaxed),
            "TREND_FOLLOWING" => Some(SourceTag::TrendFollowing),
            _ => None,
        }
    }
}

/// Stop/target distances and the minimum acceptable risk/reward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskParams {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub min_risk_reward: f64,
}

impl RiskParams {
    pub fn standard() -> Self {
        RiskParams {
            stop_loss_pct: 0.08,
            take_profit_pct: 0.15,
            min_risk_reward: 1.5,
        }
    }

    /// Tighter distances for synthetic fills injected by the cadence pass.
    pub fn conservative() -> Self {
        RiskParams {
            stop_loss_pct: 0.06,
            take_profit_pct: 0.12,
            min_risk_reward: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub id: String,
    pub symbol: String,
    pub created_at: NaiveDate,
    pub direction: Direction,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub risk_reward_ratio: f64,
    pub confidence: f64,
    pub quality_score: f64,
    pub source_tag: SourceTag,
    pub outcome: Option<SimulationOutcome>,
}

impl Signal {
    pub fn is_executed(&self) -> bool {
        self.outcome
            .as_ref()
            .map(|o| o.status.is_executed())
            .unwrap_or(false)
    }

    pub fn is_profitable(&self) -> bool {
        self.outcome
            .as_ref()
            .and_then(|o| o.profit_loss_pct)
            .map(|p| p > 0.0)
            .unwrap_or(false)
    }
}

/// Build a signal from a decision and the bar close it fires on. Returns
/// `None` for HOLD, unusable prices, or a risk/reward below the active
/// minimum. The rejection is a hard gate, never a warning.
pub fn synthesize(
    symbol: &str,
    date: NaiveDate,
    decision: &Decision,
    entry_price: f64,
    risk: &RiskParams,
    source_tag: SourceTag,
) -> Option<Signal> {
    if decision.direction == Direction::Hold {
        return None;
    }
    if !entry_price.is_finite() || entry_price <= 0.0 {
        return None;
    }

    let (target_price, stop_loss) = match decision.direction {
        Direction::Buy => (
            entry_price * (1.0 + risk.take_profit_pct),
            entry_price * (1.0 - risk.stop_loss_pct),
        ),
        Direction::Sell => (
            entry_price * (1.0 - risk.take_profit_pct),
            entry_price * (1.0 + risk.stop_loss_pct),
        ),
        Direction::Hold => return None,
    };

    let reward = (target_price - entry_price).abs();
    let risk_distance = (entry_price - stop_loss).abs();
    if risk_distance <= 0.0 {
        return None;
    }
    let risk_reward_ratio = reward / risk_distance;
    if risk_reward_ratio < risk.min_risk_reward {
        return None;
    }

    let quality_score =
        decision.confidence * 70.0 + (risk_reward_ratio.min(3.0) / 3.0) * 30.0;

    Some(Signal {
        id: format!("{}-{}-{}", symbol, date.format("%Y%m%d"), decision.direction.as_str()),
        symbol: symbol.to_string(),
        created_at: date,
        direction: decision.direction,
        entry_price,
        target_price,
        stop_loss,
        risk_reward_ratio,
        confidence: decision.confidence,
        quality_score,
        source_tag,
        outcome: None,
    })
}
