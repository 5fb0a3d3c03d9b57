//! Market-regime module (Macro layer).
//!
//! Classifies the broad trend from moving averages:
//! - close vs short MA (0-30)
//! - slope of the short MA over `slope_lookback` bars (0-30)
//! - short MA vs long MA (0-25, neutral until the long MA is available)
//! - daily-return volatility below `high_vol_pct` (0-15)

use serde::{Deserialize, Serialize};

use super::{history_confidence, ModuleKind, ModuleOptions, ModuleScore, SignalModule};
use crate::data::SeriesBundle;
use crate::indicators::{return_volatility, sma, sma_ending, unit_scale};

/// Broad trend classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Bull,
    Bear,
    Sideways,
}

impl Regime {
    fn classify(price_vs_short_pct: f64, slope_pct: f64) -> Self {
        if price_vs_short_pct > 0.0 && slope_pct > 0.0 {
            Self::Bull
        } else if price_vs_short_pct < 0.0 && slope_pct < 0.0 {
            Self::Bear
        } else {
            Self::Sideways
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Bull => "bull",
            Self::Bear => "bear",
            Self::Sideways => "sideways",
        }
    }
}

/// Market-regime module.
pub struct MarketRegime;

impl SignalModule for MarketRegime {
    fn kind(&self) -> ModuleKind {
        ModuleKind::MarketRegime
    }

    fn option_keys(&self) -> &'static [&'static str] {
        &[
            "short_window",
            "long_window",
            "slope_lookback",
            "vol_window",
            "high_vol_pct",
        ]
    }

    fn calculate_score(&self, series: &SeriesBundle, options: &ModuleOptions) -> ModuleScore {
        let kind = self.kind();
        let short_window = options.usize_or("short_window", 50).max(1);
        let long_window = options.usize_or("long_window", 200).max(1);
        let slope_lookback = options.usize_or("slope_lookback", 20).max(1);
        let vol_window = options.usize_or("vol_window", 20);
        let high_vol_pct = options.f64_or("high_vol_pct", 3.0).max(0.01);

        let closes = series.closes();
        let min_bars = short_window + slope_lookback;
        if closes.len() < min_bars {
            return ModuleScore::insufficient_history(kind, closes.len(), min_bars);
        }

        let (Some(close), Some(sma_short), Some(sma_short_prev)) = (
            closes.last().copied(),
            sma(&closes, short_window),
            sma_ending(&closes, short_window, slope_lookback),
        ) else {
            return ModuleScore::insufficient_history(kind, closes.len(), min_bars);
        };
        if sma_short <= 0.0 || sma_short_prev <= 0.0 {
            return ModuleScore::fallback(kind, "non_positive_prices");
        }

        let price_vs_short_pct = (close / sma_short - 1.0) * 100.0;
        let slope_pct = (sma_short / sma_short_prev - 1.0) * 100.0;

        let price_points = unit_scale(price_vs_short_pct, -10.0, 10.0) * 30.0;
        let slope_points = unit_scale(slope_pct, -5.0, 5.0) * 30.0;

        let sma_long = sma(&closes, long_window).filter(|v| *v > 0.0);
        let alignment_points = match sma_long {
            Some(long) => unit_scale((sma_short / long - 1.0) * 100.0, -5.0, 5.0) * 25.0,
            None => 12.5,
        };

        let volatility = return_volatility(&closes, vol_window);
        let volatility_points = match volatility {
            Some(vol) => 15.0 * (1.0 - unit_scale(vol, high_vol_pct, high_vol_pct * 2.0)),
            None => 7.5,
        };

        let regime = Regime::classify(price_vs_short_pct, slope_pct);
        let score = price_points + slope_points + alignment_points + volatility_points;
        let confidence = history_confidence(closes.len(), min_bars, long_window.max(min_bars));

        let mut result = ModuleScore::new(kind, score, confidence)
            .with_detail("regime", regime.as_str())
            .with_detail("close", close)
            .with_detail("sma_short", sma_short)
            .with_detail("price_vs_short_pct", price_vs_short_pct)
            .with_detail("slope_pct", slope_pct);
        if let Some(long) = sma_long {
            result = result.with_detail("sma_long", long);
        }
        if let Some(vol) = volatility {
            result = result.with_detail("volatility_pct", vol);
        }
        result
    }
}
