//! Three-stage per-bar strategy evaluation: trend bias, market structure,
//! entry confirmation. Stateless across bars; each call sees only candles up
//! to and including the bar under evaluation.

use crate::domain::candle::Candle;
use crate::domain::indicator::IndicatorFrame;
use crate::domain::patterns;

/// Fewest bars the engine will evaluate; anything shorter is an automatic HOLD.
pub const MIN_BARS_FOR_DECISION: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
            Direction::Hold => "HOLD",
        }
    }

    pub fn parse(s: &str) -> Option<Direction> {
        match s {
            "BUY" => Some(Direction::Buy),
            "SELL" => Some(Direction::Sell),
            "HOLD" => Some(Direction::Hold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendBias {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureEvent {
    BullishBos,
    BearishBos,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub direction: Direction,
    pub confirmations: u32,
    pub confidence: f64,
}

impl Decision {
    pub fn hold() -> Self {
        Decision {
            direction: Direction::Hold,
            confirmations: 0,
            confidence: 0.0,
        }
    }
}

/// Entry-confirmation thresholds. `standard()` drives natural signal
/// generation; `relaxed()` is the first fallback tier used when a range
/// produces too few signals.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRules {
    pub min_confirmations: u32,
    pub rsi_long: (f64, f64),
    pub rsi_short: (f64, f64),
    pub volume_multiple: f64,
    pub structure_window: usize,
}

impl DecisionRules {
    pub fn standard() -> Self {
        DecisionRules {
            min_confirmations: 2,
            rsi_long: (20.0, 50.0),
            rsi_short: (50.0, 80.0),
            volume_multiple: 1.5,
            structure_window: 20,
        }
    }

    pub fn relaxed() -> Self {
        DecisionRules {
            min_confirmations: 1,
            rsi_long: (15.0, 60.0),
            rsi_short: (40.0, 85.0),
            volume_multiple: 1.2,
            structure_window: 20,
        }
    }
}

/// Stage 1: fast MA above slow MA on this bar and the prior one reads
/// bullish; the mirror reads bearish.
pub fn trend_bias(frame: &IndicatorFrame, i: usize) -> TrendBias {
    if i == 0 {
        return TrendBias::Neutral;
    }
    let pairs = (
        frame.sma_fast.simple_at(i),
        frame.sma_slow.simple_at(i),
        frame.sma_fast.simple_at(i - 1),
        frame.sma_slow.simple_at(i - 1),
    );
    let (Some(fast), Some(slow), Some(prev_fast), Some(prev_slow)) = pairs else {
        return TrendBias::Neutral;
    };

    if fast > slow && prev_fast > prev_slow {
        TrendBias::Bullish
    } else if fast < slow && prev_fast < prev_slow {
        TrendBias::Bearish
    } else {
        TrendBias::Neutral
    }
}

/// Stage 2: the current bar printing a new swing extreme against the prior
/// `window` bars is a break of structure in that direction.
pub fn structure_event(candles: &[Candle], i: usize, window: usize) -> StructureEvent {
    if window == 0 || i < window {
        return StructureEvent::Neutral;
    }
    let prior = &candles[i - window..i];
    let swing_high = prior.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let swing_low = prior.iter().map(|c| c.low).fold(f64::MAX, f64::min);

    if candles[i].high > swing_high {
        StructureEvent::BullishBos
    } else if candles[i].low < swing_low {
        StructureEvent::BearishBos
    } else {
        StructureEvent::Neutral
    }
}

/// Stage 3 plus assembly: count confirmations in the bias direction and emit
/// a Decision, or HOLD when the count falls short of the rule minimum.
///
/// The structure stage never gates emission: a break of structure agreeing
/// with the bias adds 0.1 confidence, and its absence costs nothing. Only
/// the trend bias and the confirmation count decide whether a direction is
/// emitted.
pub fn evaluate(
    candles: &[Candle],
    frame: &IndicatorFrame,
    i: usize,
    rules: &DecisionRules,
) -> Decision {
    if i + 1 < MIN_BARS_FOR_DECISION || i >= candles.len() {
        return Decision::hold();
    }

    let bias = trend_bias(frame, i);
    let direction = match bias {
        TrendBias::Bullish => Direction::Buy,
        TrendBias::Bearish => Direction::Sell,
        TrendBias::Neutral => return Decision::hold(),
    };

    let mut confirmations = 0u32;

    if let Some(rsi) = frame.rsi.simple_at(i) {
        let (lo, hi) = match direction {
            Direction::Buy => rules.rsi_long,
            _ => rules.rsi_short,
        };
        if rsi >= lo && rsi <= hi {
            confirmations += 1;
        }
    }

    if macd_cross(frame, i, direction) {
        confirmations += 1;
    }

    if let Some(ratio) = frame.volume_ratio.simple_at(i) {
        if ratio >= rules.volume_multiple {
            confirmations += 1;
        }
    }

    if i > 0 {
        if let Some(pattern) = patterns::detect(&candles[i - 1], &candles[i]) {
            if pattern.matches_direction(direction) {
                confirmations += 1;
            }
        }
    }

    if confirmations < rules.min_confirmations {
        return Decision::hold();
    }

    let event = structure_event(candles, i, rules.structure_window);
    let bos_agrees = matches!(
        (direction, event),
        (Direction::Buy, StructureEvent::BullishBos)
            | (Direction::Sell, StructureEvent::BearishBos)
    );

    let confidence = (0.5 + 0.1 * confirmations as f64 + if bos_agrees { 0.1 } else { 0.0 })
        .clamp(0.0, 1.0);

    Decision {
        direction,
        confirmations,
        confidence,
    }
}

/// Trend-only fallback for synthetic signal generation: bias alone decides,
/// with a floor confidence and no confirmation count.
pub fn evaluate_trend_following(frame: &IndicatorFrame, i: usize) -> Decision {
    let direction = match trend_bias(frame, i) {
        TrendBias::Bullish => Direction::Buy,
        TrendBias::Bearish => Direction::Sell,
        TrendBias::Neutral => return Decision::hold(),
    };
    Decision {
        direction,
        confirmations: 0,
        confidence: 0.5,
    }
}

fn macd_cross(frame: &IndicatorFrame, i: usize, direction: Direction) -> bool {
    if i == 0 {
        return false;
    }
    let (Some((line, signal, _)), Some((prev_line, prev_signal, _))) =
        (frame.macd.macd_at(i), frame.macd.macd_at(i - 1))
    else {
        return false;
    };
    match direction {
        Direction::Buy => prev_line <= prev_signal && line > signal,
        Direction::Sell => prev_line >= prev_signal && line < signal,
        Direction::Hold => false,
    }
}
