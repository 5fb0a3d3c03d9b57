//! Price-action module (Macro layer).
//!
//! Scores the shape of recent bars:
//! - where the close sits in the `lookback` high-low range (0-45)
//! - higher highs and higher lows across swing chunks (0-35)
//! - calm ranges, ATR below 2% of price scoring full (0-20)

use super::{history_confidence, ModuleKind, ModuleOptions, ModuleScore, SignalModule};
use crate::data::{Candle, SeriesBundle};
use crate::indicators::{atr, unit_scale};

const RANGE_POINTS: f64 = 45.0;
const STRUCTURE_POINTS: f64 = 35.0;
const CALM_POINTS: f64 = 20.0;

/// Price-action module.
pub struct PriceAction;

/// Share of higher highs and higher lows between consecutive chunks.
/// Ties count half.
fn structure_share(candles: &[Candle], swing_window: usize) -> f64 {
    let swings: Vec<(f64, f64)> = candles
        .chunks(swing_window)
        .map(|chunk| {
            let high = chunk.iter().map(|c| c.high).fold(f64::MIN, f64::max);
            let low = chunk.iter().map(|c| c.low).fold(f64::MAX, f64::min);
            (high, low)
        })
        .collect();

    if swings.len() < 2 {
        return 0.5;
    }

    let step = |later: f64, earlier: f64| -> f64 {
        if later > earlier {
            1.0
        } else if later < earlier {
            0.0
        } else {
            0.5
        }
    };

    let total: f64 = swings
        .windows(2)
        .map(|w| step(w[1].0, w[0].0) + step(w[1].1, w[0].1))
        .sum();
    total / (2.0 * (swings.len() - 1) as f64)
}

impl SignalModule for PriceAction {
    fn kind(&self) -> ModuleKind {
        ModuleKind::PriceAction
    }

    fn option_keys(&self) -> &'static [&'static str] {
        &["lookback", "full_lookback", "atr_period", "swing_window"]
    }

    fn calculate_score(&self, series: &SeriesBundle, options: &ModuleOptions) -> ModuleScore {
        let kind = self.kind();
        let lookback = options.usize_or("lookback", 20).max(2);
        let full_lookback = options.usize_or("full_lookback", 60);
        let atr_period = options.usize_or("atr_period", 14).max(1);
        let swing_window = options.usize_or("swing_window", 5).max(1);

        let candles = series.history();
        let min_bars = lookback.max(atr_period + 1);
        if candles.len() < min_bars {
            return ModuleScore::insufficient_history(kind, candles.len(), min_bars);
        }

        let recent = &candles[candles.len() - lookback..];
        let Some(last) = recent.last() else {
            return ModuleScore::insufficient_history(kind, candles.len(), min_bars);
        };
        if last.close <= 0.0 {
            return ModuleScore::fallback(kind, "non_positive_prices");
        }

        let high = recent.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = recent.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let range_position = if high > low {
            ((last.close - low) / (high - low)).clamp(0.0, 1.0)
        } else {
            0.5
        };

        let structure = structure_share(recent, swing_window);

        let Some(atr_value) = atr(candles, atr_period) else {
            return ModuleScore::insufficient_history(kind, candles.len(), min_bars);
        };
        let atr_pct = atr_value / last.close * 100.0;
        let calm = 1.0 - unit_scale(atr_pct, 2.0, 8.0);

        let score =
            range_position * RANGE_POINTS + structure * STRUCTURE_POINTS + calm * CALM_POINTS;
        let confidence = history_confidence(candles.len(), min_bars, full_lookback);

        ModuleScore::new(kind, score, confidence)
            .with_detail("range_position", range_position)
            .with_detail("structure_share", structure)
            .with_detail("atr_pct", atr_pct)
            .with_detail("range_high", high)
            .with_detail("range_low", low)
    }
}
