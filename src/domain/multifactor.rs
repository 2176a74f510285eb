//! Multi-factor scoring for live signal generation.
//!
//! Blends a technical score derived from the indicator engine with external
//! factor scores (sentiment, news, volume, pattern, economic, sector), each
//! in [-1, 1], into one weighted score. A score past the decision threshold
//! becomes a BUY or SELL routed through the same synthesizer and risk math
//! the backtest pipeline uses.

use chrono::NaiveDate;

use crate::domain::candle::Candle;
use crate::domain::decision::{Decision, Direction};
use crate::domain::indicator::{IndicatorFrame, IndicatorParams};
use crate::domain::signal::{self, RiskParams, Signal, SourceTag};

/// External and derived factor scores, each clamped to [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorScores {
    pub technical: f64,
    pub sentiment: f64,
    pub news: f64,
    pub volume: f64,
    pub pattern: f64,
    pub economic: f64,
    pub sector: f64,
}

impl FactorScores {
    pub fn neutral() -> Self {
        FactorScores {
            technical: 0.0,
            sentiment: 0.0,
            news: 0.0,
            volume: 0.0,
            pattern: 0.0,
            economic: 0.0,
            sector: 0.0,
        }
    }

    pub fn clamped(&self) -> Self {
        FactorScores {
            technical: self.technical.clamp(-1.0, 1.0),
            sentiment: self.sentiment.clamp(-1.0, 1.0),
            news: self.news.clamp(-1.0, 1.0),
            volume: self.volume.clamp(-1.0, 1.0),
            pattern: self.pattern.clamp(-1.0, 1.0),
            economic: self.economic.clamp(-1.0, 1.0),
            sector: self.sector.clamp(-1.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorWeights {
    pub technical: f64,
    pub sentiment: f64,
    pub news: f64,
    pub volume: f64,
    pub pattern: f64,
    pub economic: f64,
    pub sector: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        FactorWeights {
            technical: 0.30,
            sentiment: 0.15,
            news: 0.10,
            volume: 0.15,
            pattern: 0.10,
            economic: 0.10,
            sector: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiFactorConfig {
    pub weights: FactorWeights,
    pub decision_threshold: f64,
    pub indicator_params: IndicatorParams,
    pub risk: RiskParams,
}

impl Default for MultiFactorConfig {
    fn default() -> Self {
        MultiFactorConfig {
            weights: FactorWeights::default(),
            decision_threshold: 0.3,
            indicator_params: IndicatorParams::default(),
            risk: RiskParams::standard(),
        }
    }
}

/// Weighted sum of clamped scores, itself in [-1, 1] for default weights.
pub fn combined_score(scores: &FactorScores, weights: &FactorWeights) -> f64 {
    let s = scores.clamped();
    s.technical * weights.technical
        + s.sentiment * weights.sentiment
        + s.news * weights.news
        + s.volume * weights.volume
        + s.pattern * weights.pattern
        + s.economic * weights.economic
        + s.sector * weights.sector
}

/// Derive the technical factor from the latest bar's RSI, MACD posture and
/// moving-average spread. Averages whichever components are available.
pub fn technical_score(candles: &[Candle], params: &IndicatorParams) -> f64 {
    if candles.is_empty() {
        return 0.0;
    }
    let frame = IndicatorFrame::compute(candles, params);
    let i = candles.len() - 1;

    let mut components: Vec<f64> = Vec::new();

    if let Some(rsi) = frame.rsi.simple_at(i) {
        // 50 is neutral; oversold leans bullish, overbought bearish
        components.push(((50.0 - rsi) / 50.0).clamp(-1.0, 1.0));
    }

    if let Some((line, signal, _)) = frame.macd.macd_at(i) {
        components.push(if line > signal { 0.5 } else { -0.5 });
    }

    if let (Some(fast), Some(slow)) = (
        frame.sma_fast.simple_at(i),
        frame.sma_slow.simple_at(i),
    ) {
        if slow > 0.0 {
            components.push(((fast - slow) / slow * 10.0).clamp(-1.0, 1.0));
        }
    }

    if components.is_empty() {
        0.0
    } else {
        components.iter().sum::<f64>() / components.len() as f64
    }
}

/// Produce a live signal for the given date if the combined score clears the
/// threshold in either direction. Confidence scales with score magnitude.
pub fn generate(
    symbol: &str,
    date: NaiveDate,
    entry_price: f64,
    scores: &FactorScores,
    config: &MultiFactorConfig,
) -> Option<Signal> {
    let score = combined_score(scores, &config.weights);

    let direction = if score >= config.decision_threshold {
        Direction::Buy
    } else if score <= -config.decision_threshold {
        Direction::Sell
    } else {
        return None;
    };

    let decision = Decision {
        direction,
        confirmations: 0,
        confidence: score.abs().clamp(0.0, 1.0),
    };

    signal::synthesize(
        symbol,
        date,
        &decision,
        entry_price,
        &config.risk,
        SourceTag::Natural,
    )
}
