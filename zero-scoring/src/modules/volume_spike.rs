//! Volume-spike module (Micro layer).
//!
//! Compares the latest bar's volume with the mean of the preceding `window`
//! bars. A spike (ratio at or above `spike_ratio`) moves the score 20-45
//! points in the direction of the bar's close; a sub-spike expansion moves it
//! up to 15 points.

use super::{
    history_confidence, ModuleKind, ModuleOptions, ModuleScore, SignalModule, NEUTRAL_SCORE,
};
use crate::data::SeriesBundle;
use crate::indicators::unit_scale;

/// Volume-spike module.
pub struct VolumeSpike;

impl SignalModule for VolumeSpike {
    fn kind(&self) -> ModuleKind {
        ModuleKind::VolumeSpike
    }

    fn option_keys(&self) -> &'static [&'static str] {
        &["window", "spike_ratio", "full_lookback"]
    }

    fn calculate_score(&self, series: &SeriesBundle, options: &ModuleOptions) -> ModuleScore {
        let kind = self.kind();
        let window = options.usize_or("window", 20).max(1);
        let spike_ratio = options.f64_or("spike_ratio", 2.0).max(1.0 + f64::EPSILON);
        let full_lookback = options.usize_or("full_lookback", 60);

        let candles = series.history();
        let min_bars = window + 1;
        if candles.len() < min_bars {
            return ModuleScore::insufficient_history(kind, candles.len(), min_bars);
        }

        let n = candles.len();
        let (last, prev) = (&candles[n - 1], &candles[n - 2]);
        let baseline = candles[n - 1 - window..n - 1]
            .iter()
            .map(|c| c.volume.max(0.0))
            .sum::<f64>()
            / window as f64;
        if baseline <= 0.0 {
            return ModuleScore::fallback(kind, "no_volume");
        }

        let ratio = last.volume.max(0.0) / baseline;
        let (direction, label) = if last.close > prev.close {
            (1.0, "up")
        } else if last.close < prev.close {
            (-1.0, "down")
        } else {
            (0.0, "flat")
        };

        let is_spike = ratio >= spike_ratio;
        let (intensity, swing) = if is_spike {
            let intensity = unit_scale(ratio, spike_ratio, spike_ratio * 2.0);
            (intensity, 20.0 + 25.0 * intensity)
        } else {
            (0.0, unit_scale(ratio, 1.0, spike_ratio) * 15.0)
        };

        let score = NEUTRAL_SCORE + direction * swing;
        let confidence = history_confidence(n, min_bars, full_lookback);

        ModuleScore::new(kind, score, confidence)
            .with_detail("volume_ratio", ratio)
            .with_detail("direction", label)
            .with_detail("spike", is_spike)
            .with_detail("intensity", intensity)
    }
}
