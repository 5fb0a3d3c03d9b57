//! Pattern-recognition module (Micro layer).
//!
//! Starts from the neutral score and adjusts for the patterns completed by
//! the latest bar:
//!
//! | Pattern                     | Adjustment |
//! |-----------------------------|------------|
//! | Bullish / bearish engulfing | +15 / -15  |
//! | Hammer after a decline      | +10        |
//! | Shooting star after a rally | -10        |
//! | Breakout / breakdown        | +20 / -20  |

use serde::{Deserialize, Serialize};

use super::{
    history_confidence, ModuleKind, ModuleOptions, ModuleScore, SignalModule, NEUTRAL_SCORE,
};
use crate::data::{Candle, SeriesBundle};

/// A candlestick or range pattern completed by the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
    ShootingStar,
    Breakout,
    Breakdown,
}

impl Pattern {
    pub fn adjustment(&self) -> f64 {
        match self {
            Self::BullishEngulfing => 15.0,
            Self::BearishEngulfing => -15.0,
            Self::Hammer => 10.0,
            Self::ShootingStar => -10.0,
            Self::Breakout => 20.0,
            Self::Breakdown => -20.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BullishEngulfing => "bullish_engulfing",
            Self::BearishEngulfing => "bearish_engulfing",
            Self::Hammer => "hammer",
            Self::ShootingStar => "shooting_star",
            Self::Breakout => "breakout",
            Self::Breakdown => "breakdown",
        }
    }
}

fn engulfing(prev: &Candle, curr: &Candle) -> Option<Pattern> {
    if prev.is_bearish()
        && curr.is_bullish()
        && curr.open <= prev.close
        && curr.close >= prev.open
    {
        Some(Pattern::BullishEngulfing)
    } else if prev.is_bullish()
        && curr.is_bearish()
        && curr.open >= prev.close
        && curr.close <= prev.open
    {
        Some(Pattern::BearishEngulfing)
    } else {
        None
    }
}

/// Long-wick reversal bars. `trend` is the close change over the bars before `curr`.
fn reversal_bar(curr: &Candle, trend: f64) -> Option<Pattern> {
    let body = curr.body_size();
    let small_wick = body.max(curr.range() * 0.1);

    let hammer_shape = curr.lower_wick() > 0.0
        && curr.lower_wick() >= 2.0 * body
        && curr.upper_wick() <= small_wick;
    let star_shape = curr.upper_wick() > 0.0
        && curr.upper_wick() >= 2.0 * body
        && curr.lower_wick() <= small_wick;

    if hammer_shape && trend < 0.0 {
        Some(Pattern::Hammer)
    } else if star_shape && trend > 0.0 {
        Some(Pattern::ShootingStar)
    } else {
        None
    }
}

/// Close beyond the extremes of the `prior` bars.
fn range_break(prior: &[Candle], curr: &Candle) -> Option<Pattern> {
    let high = prior.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low = prior.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    if curr.close > high {
        Some(Pattern::Breakout)
    } else if curr.close < low {
        Some(Pattern::Breakdown)
    } else {
        None
    }
}

/// Patterns completed by the last candle. Needs `breakout_lookback + 1` candles.
pub fn detect_patterns(
    candles: &[Candle],
    breakout_lookback: usize,
    trend_lookback: usize,
) -> Vec<Pattern> {
    let n = candles.len();
    if n < 2 || n < breakout_lookback + 1 {
        return Vec::new();
    }
    let curr = &candles[n - 1];
    let prev = &candles[n - 2];

    let mut patterns = Vec::new();
    patterns.extend(engulfing(prev, curr));

    if n >= trend_lookback + 2 {
        let trend = prev.close - candles[n - 2 - trend_lookback].close;
        patterns.extend(reversal_bar(curr, trend));
    }

    if breakout_lookback > 0 {
        patterns.extend(range_break(&candles[n - 1 - breakout_lookback..n - 1], curr));
    }
    patterns
}

/// Pattern-recognition module.
pub struct PatternRecognition;

impl SignalModule for PatternRecognition {
    fn kind(&self) -> ModuleKind {
        ModuleKind::PatternRecognition
    }

    fn option_keys(&self) -> &'static [&'static str] {
        &["breakout_lookback", "full_lookback", "trend_lookback"]
    }

    fn calculate_score(&self, series: &SeriesBundle, options: &ModuleOptions) -> ModuleScore {
        let kind = self.kind();
        let breakout_lookback = options.usize_or("breakout_lookback", 20).max(1);
        let full_lookback = options.usize_or("full_lookback", 60);
        let trend_lookback = options.usize_or("trend_lookback", 5).max(1);

        let candles = series.history();
        let min_bars = breakout_lookback + 1;
        if candles.len() < min_bars {
            return ModuleScore::insufficient_history(kind, candles.len(), min_bars);
        }

        let patterns = detect_patterns(candles, breakout_lookback, trend_lookback);
        let score = NEUTRAL_SCORE + patterns.iter().map(Pattern::adjustment).sum::<f64>();
        let confidence = history_confidence(candles.len(), min_bars, full_lookback);

        let names: Vec<&str> = patterns.iter().map(Pattern::name).collect();
        ModuleScore::new(kind, score, confidence)
            .with_detail("pattern_count", patterns.len())
            .with_detail("patterns", names)
    }
}
