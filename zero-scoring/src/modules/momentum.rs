//! Momentum module (Micro layer).
//!
//! MACD and rate of change, both normalized by price:
//! - MACD line as % of close, -2%..+2% (0-30)
//! - MACD histogram as % of close, -0.5%..+0.5% (0-20)
//! - rate of change over `roc_window` bars, -10%..+10% (0-50)

use super::{history_confidence, ModuleKind, ModuleOptions, ModuleScore, SignalModule};
use crate::data::SeriesBundle;
use crate::indicators::{ema_series, pct_return, unit_scale};

/// MACD values at the last bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD at the last close. Needs `slow + signal` closes.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<Macd> {
    if closes.len() < slow + signal {
        return None;
    }
    let fast_ema = ema_series(closes, fast);
    let slow_ema = ema_series(closes, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_series(&line, signal);

    let line = *line.last()?;
    let signal = *signal_line.last()?;
    Some(Macd {
        line,
        signal,
        histogram: line - signal,
    })
}

/// Momentum module.
pub struct Momentum;

impl SignalModule for Momentum {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Momentum
    }

    fn option_keys(&self) -> &'static [&'static str] {
        &["fast", "slow", "signal", "roc_window", "full_lookback"]
    }

    fn calculate_score(&self, series: &SeriesBundle, options: &ModuleOptions) -> ModuleScore {
        let kind = self.kind();
        let fast = options.usize_or("fast", 12).max(1);
        let slow = options.usize_or("slow", 26).max(fast + 1);
        let signal = options.usize_or("signal", 9).max(1);
        let roc_window = options.usize_or("roc_window", 10).max(1);
        let full_lookback = options.usize_or("full_lookback", 120);

        let closes = series.closes();
        let min_bars = (slow + signal).max(roc_window + 1);
        if closes.len() < min_bars {
            return ModuleScore::insufficient_history(kind, closes.len(), min_bars);
        }

        let (Some(m), Some(close)) = (macd(&closes, fast, slow, signal), closes.last().copied())
        else {
            return ModuleScore::insufficient_history(kind, closes.len(), min_bars);
        };
        if close <= 0.0 {
            return ModuleScore::fallback(kind, "non_positive_prices");
        }
        let Some(roc) = pct_return(&closes, roc_window) else {
            return ModuleScore::fallback(kind, "non_positive_prices");
        };

        let line_pct = m.line / close * 100.0;
        let histogram_pct = m.histogram / close * 100.0;

        let score = unit_scale(line_pct, -2.0, 2.0) * 30.0
            + unit_scale(histogram_pct, -0.5, 0.5) * 20.0
            + unit_scale(roc, -10.0, 10.0) * 50.0;
        let confidence = history_confidence(closes.len(), min_bars, full_lookback);

        ModuleScore::new(kind, score, confidence)
            .with_detail("macd", m.line)
            .with_detail("macd_signal", m.signal)
            .with_detail("macd_histogram", m.histogram)
            .with_detail("macd_pct", line_pct)
            .with_detail("roc_pct", roc)
    }
}
