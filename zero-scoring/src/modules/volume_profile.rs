//! Volume-profile module (Macro layer).
//!
//! Reads accumulation from where volume lands:
//! - share of directional volume traded on up days (0-60)
//! - recent vs earlier volume, rewarded when it confirms the dominant side (0-40)

use super::{history_confidence, ModuleKind, ModuleOptions, ModuleScore, SignalModule};
use crate::data::SeriesBundle;
use crate::indicators::unit_scale;

const SHARE_POINTS: f64 = 60.0;
const TREND_POINTS: f64 = 40.0;

/// Volume-profile module.
pub struct VolumeProfile;

impl SignalModule for VolumeProfile {
    fn kind(&self) -> ModuleKind {
        ModuleKind::VolumeProfile
    }

    fn option_keys(&self) -> &'static [&'static str] {
        &["lookback", "recent_window"]
    }

    fn calculate_score(&self, series: &SeriesBundle, options: &ModuleOptions) -> ModuleScore {
        let kind = self.kind();
        let lookback = options.usize_or("lookback", 60).max(2);
        let recent_window = options.usize_or("recent_window", 10).max(1);

        let candles = series.history();
        let min_bars = recent_window * 2 + 1;
        if candles.len() < min_bars {
            return ModuleScore::insufficient_history(kind, candles.len(), min_bars);
        }

        let used = lookback.min(candles.len() - 1);
        let window = &candles[candles.len() - used - 1..];

        let total_volume: f64 = window[1..].iter().map(|c| c.volume.max(0.0)).sum();
        if total_volume <= 0.0 {
            return ModuleScore::fallback(kind, "no_volume");
        }

        let (mut up_volume, mut down_volume) = (0.0, 0.0);
        for pair in window.windows(2) {
            let volume = pair[1].volume.max(0.0);
            if pair[1].close > pair[0].close {
                up_volume += volume;
            } else if pair[1].close < pair[0].close {
                down_volume += volume;
            }
        }
        let directional = up_volume + down_volume;
        if directional <= 0.0 {
            return ModuleScore::fallback(kind, "no_directional_volume");
        }
        let up_share = up_volume / directional;

        let volumes: Vec<f64> = candles.iter().map(|c| c.volume.max(0.0)).collect();
        let n = volumes.len();
        let recent = mean(&volumes[n - recent_window..]);
        let earlier = mean(&volumes[n - 2 * recent_window..n - recent_window]);
        let trend_ratio = if earlier > 0.0 && recent > 0.0 {
            recent / earlier
        } else {
            1.0
        };
        // Log-scaled so that a flat profile sits at the midpoint
        let expansion = unit_scale(trend_ratio.ln(), -std::f64::consts::LN_2, std::f64::consts::LN_2);
        let confirmation = if up_share >= 0.5 {
            expansion
        } else {
            1.0 - expansion
        };

        let score = up_share * SHARE_POINTS + confirmation * TREND_POINTS;
        let confidence = history_confidence(candles.len(), min_bars, lookback + 1);

        ModuleScore::new(kind, score, confidence)
            .with_detail("up_volume_share", up_share)
            .with_detail("volume_trend_ratio", trend_ratio)
            .with_detail("confirmation", confirmation)
            .with_detail("bars_used", used)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
