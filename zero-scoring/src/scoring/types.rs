//! Result types produced by the scoring engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::layer::LayerType;
use crate::modules::{ModuleKind, ModuleScore};

// ============================================================================
// Layer Result
// ============================================================================

/// Aggregated outcome of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResult {
    layer: LayerType,
    budget: f64,
    layer_score: f64,
    layer_confidence: f64,
    modules: Vec<ModuleScore>,
}

impl LayerResult {
    pub(crate) fn new(
        layer: LayerType,
        budget: f64,
        layer_score: f64,
        layer_confidence: f64,
        modules: Vec<ModuleScore>,
    ) -> Self {
        Self {
            layer,
            budget,
            layer_score,
            layer_confidence,
            modules,
        }
    }

    pub fn layer(&self) -> LayerType {
        self.layer
    }

    /// Point budget this layer was scored against.
    pub fn budget(&self) -> f64 {
        self.budget
    }

    /// Points earned, within `[0, budget]`.
    pub fn layer_score(&self) -> f64 {
        self.layer_score
    }

    pub fn layer_confidence(&self) -> f64 {
        self.layer_confidence
    }

    /// Member scores in configured order.
    pub fn modules(&self) -> &[ModuleScore] {
        &self.modules
    }

    /// Layer score as a share of the budget (0-100).
    pub fn normalized_score(&self) -> f64 {
        if self.budget > 0.0 {
            self.layer_score / self.budget * 100.0
        } else {
            0.0
        }
    }
}

// ============================================================================
// Composite Score
// ============================================================================

/// Full scoring outcome for one instrument on one date.
///
/// Values are immutable once built; re-evaluating produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    symbol: String,
    as_of: NaiveDate,
    total_score: f64,
    overall_confidence: f64,
    layers: Vec<LayerResult>,
}

impl CompositeScore {
    /// Assemble from layer results. Totals are summed in layer order.
    pub(crate) fn from_layers(symbol: String, as_of: NaiveDate, layers: Vec<LayerResult>) -> Self {
        let mut total_score = 0.0;
        let mut weighted_confidence = 0.0;
        let mut budget_sum = 0.0;
        for layer in &layers {
            total_score += layer.layer_score;
            weighted_confidence += layer.budget * layer.layer_confidence;
            budget_sum += layer.budget;
        }
        let overall_confidence = if budget_sum > 0.0 {
            weighted_confidence / budget_sum
        } else {
            0.0
        };

        Self {
            symbol,
            as_of,
            total_score: total_score.clamp(0.0, 100.0),
            overall_confidence: overall_confidence.clamp(0.0, 1.0),
            layers,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Sum of the layer scores (0-100).
    pub fn total_score(&self) -> f64 {
        self.total_score
    }

    /// Budget-weighted mean of layer confidences.
    pub fn overall_confidence(&self) -> f64 {
        self.overall_confidence
    }

    pub fn layers(&self) -> &[LayerResult] {
        &self.layers
    }

    pub fn layer(&self, layer: LayerType) -> Option<&LayerResult> {
        self.layers.iter().find(|l| l.layer == layer)
    }

    pub fn module(&self, kind: ModuleKind) -> Option<&ModuleScore> {
        self.modules().find(|m| m.module == kind)
    }

    /// All module scores, layer by layer.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleScore> {
        self.layers.iter().flat_map(|l| l.modules.iter())
    }

    /// Modules that fell back to the neutral zero-confidence result.
    pub fn fallback_modules(&self) -> Vec<&ModuleScore> {
        self.modules().filter(|m| m.is_fallback()).collect()
    }

    /// Whether the score is trustworthy enough for ranking.
    pub fn passes(&self, min_confidence: f64) -> bool {
        self.overall_confidence >= min_confidence
    }
}
