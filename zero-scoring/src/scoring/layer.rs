//! Layers and the per-layer aggregator.

use serde::{Deserialize, Serialize};

use super::types::LayerResult;
use crate::modules::{ModuleKind, ModuleScore, NEUTRAL_SCORE};

/// Signal layer. Each carries a point budget; the budgets total 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    /// Broad market and tape conditions
    Macro,
    /// Instrument quality and relative standing
    Structural,
    /// Short-horizon bar patterns and momentum
    Micro,
}

impl LayerType {
    pub const ALL: [LayerType; 3] = [Self::Macro, Self::Structural, Self::Micro];

    /// Default point budget.
    pub fn budget(&self) -> f64 {
        match self {
            Self::Macro => 25.0,
            Self::Structural => 45.0,
            Self::Micro => 30.0,
        }
    }

    /// Default ordered member modules.
    pub fn default_modules(&self) -> &'static [ModuleKind] {
        match self {
            Self::Macro => &[
                ModuleKind::MarketRegime,
                ModuleKind::VolumeProfile,
                ModuleKind::PriceAction,
            ],
            Self::Structural => &[ModuleKind::RelativeStrength, ModuleKind::FundamentalQuality],
            Self::Micro => &[
                ModuleKind::PatternRecognition,
                ModuleKind::VolumeSpike,
                ModuleKind::Momentum,
            ],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Macro => "macro",
            Self::Structural => "structural",
            Self::Micro => "micro",
        }
    }

    /// Parse a configuration name, ignoring case.
    pub fn from_name(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|l| l.name() == normalized)
    }
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Reduce one layer's module scores to a [`LayerResult`].
///
/// The layer's weighted mean is `Σ(score × confidence) / Σ confidence`,
/// rescaled to `budget`. A layer whose members all report zero confidence
/// sits at the neutral midpoint of its budget with zero confidence. Layer
/// confidence is the plain mean of member confidences.
///
/// Sums run in member order so results are bit-for-bit reproducible.
pub fn aggregate_layer(layer: LayerType, budget: f64, modules: Vec<ModuleScore>) -> LayerResult {
    let mut weighted_sum = 0.0;
    let mut confidence_sum = 0.0;
    for m in &modules {
        weighted_sum += m.score() * m.confidence();
        confidence_sum += m.confidence();
    }

    let (weighted_mean, layer_confidence) = if confidence_sum > 0.0 {
        (
            weighted_sum / confidence_sum,
            confidence_sum / modules.len() as f64,
        )
    } else {
        (NEUTRAL_SCORE, 0.0)
    };

    let layer_score = (weighted_mean / 100.0 * budget).clamp(0.0, budget);
    LayerResult::new(layer, budget, layer_score, layer_confidence.clamp(0.0, 1.0), modules)
}
