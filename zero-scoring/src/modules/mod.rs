//! Signal modules.
//!
//! Every module is a stateless unit that looks at one facet of an instrument
//! and returns a [`ModuleScore`] on a 0-100 scale with a 0-1 confidence.
//! The set is closed: [`ModuleKind`] enumerates it and hands out the static
//! implementation for each variant.
//!
//! | Layer      | Modules                                              |
//! |------------|------------------------------------------------------|
//! | Macro      | market_regime, volume_profile, price_action          |
//! | Structural | relative_strength, fundamental_quality               |
//! | Micro      | pattern_recognition, volume_spike, momentum          |
//!
//! A module never fails. When it cannot compute it returns
//! [`ModuleScore::fallback`]: the neutral score with zero confidence and the
//! reason recorded in `details`.

mod fundamental_quality;
mod market_regime;
mod momentum;
mod pattern_recognition;
mod price_action;
mod relative_strength;
mod volume_profile;
mod volume_spike;

pub use fundamental_quality::FundamentalQuality;
pub use market_regime::MarketRegime;
pub use momentum::Momentum;
pub use pattern_recognition::PatternRecognition;
pub use price_action::PriceAction;
pub use relative_strength::{etf_preference, EtfPreference, RelativeStrength};
pub use volume_profile::VolumeProfile;
pub use volume_spike::VolumeSpike;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::SeriesBundle;

/// Score a module reports when it cannot compute.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Largest value any module option may take.
pub const MAX_OPTION_VALUE: f64 = 100_000.0;

// ============================================================================
// Module Kind
// ============================================================================

/// Identity of a signal module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    MarketRegime,
    VolumeProfile,
    PriceAction,
    RelativeStrength,
    FundamentalQuality,
    PatternRecognition,
    VolumeSpike,
    Momentum,
}

impl ModuleKind {
    /// Every module, in default layer order.
    pub const ALL: [ModuleKind; 8] = [
        Self::MarketRegime,
        Self::VolumeProfile,
        Self::PriceAction,
        Self::RelativeStrength,
        Self::FundamentalQuality,
        Self::PatternRecognition,
        Self::VolumeSpike,
        Self::Momentum,
    ];

    /// Configuration name (snake_case).
    pub fn name(&self) -> &'static str {
        match self {
            Self::MarketRegime => "market_regime",
            Self::VolumeProfile => "volume_profile",
            Self::PriceAction => "price_action",
            Self::RelativeStrength => "relative_strength",
            Self::FundamentalQuality => "fundamental_quality",
            Self::PatternRecognition => "pattern_recognition",
            Self::VolumeSpike => "volume_spike",
            Self::Momentum => "momentum",
        }
    }

    /// Parse a configuration name. Accepts snake_case, kebab-case and any letter case.
    pub fn from_name(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|k| k.name() == normalized)
    }

    /// The static implementation behind this kind.
    pub fn module(&self) -> &'static dyn SignalModule {
        match self {
            Self::MarketRegime => &MarketRegime,
            Self::VolumeProfile => &VolumeProfile,
            Self::PriceAction => &PriceAction,
            Self::RelativeStrength => &RelativeStrength,
            Self::FundamentalQuality => &FundamentalQuality,
            Self::PatternRecognition => &PatternRecognition,
            Self::VolumeSpike => &VolumeSpike,
            Self::Momentum => &Momentum,
        }
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Module Contract
// ============================================================================

/// The shared capability of every signal module.
///
/// Implementations must be pure: the same bundle and options always produce
/// the same [`ModuleScore`].
pub trait SignalModule: Send + Sync {
    /// Identity of this module.
    fn kind(&self) -> ModuleKind;

    /// Option keys this module reads. Anything else in its option map is ignored.
    fn option_keys(&self) -> &'static [&'static str];

    /// Score one instrument.
    fn calculate_score(&self, series: &SeriesBundle, options: &ModuleOptions) -> ModuleScore;
}

// ============================================================================
// Module Options
// ============================================================================

/// Per-module option mapping. Values that are missing or not usable numbers
/// fall back to the module's documented default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleOptions(Map<String, Value>);

impl ModuleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Builder-style setter, mostly for tests and programmatic configs.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Numeric option, or `default` when absent or not a finite number.
    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.0
            .get(key)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    /// Window-length option, or `default` when absent, negative or fractional.
    ///
    /// Capped at [`MAX_OPTION_VALUE`] so window arithmetic cannot overflow.
    pub fn usize_or(&self, key: &str, default: usize) -> usize {
        match self.0.get(key) {
            Some(v) => v
                .as_u64()
                .or_else(|| {
                    v.as_f64()
                        .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                        .map(|f| f as u64)
                })
                .map(|u| u.min(MAX_OPTION_VALUE as u64) as usize)
                .unwrap_or(default),
            None => default,
        }
    }
}

// ============================================================================
// Module Score
// ============================================================================

/// Output of one module for one instrument on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleScore {
    /// Which module produced the score
    pub module: ModuleKind,
    score: f64,
    confidence: f64,
    details: BTreeMap<String, Value>,
}

impl ModuleScore {
    /// Create a score, clamping into [0, 100] and confidence into [0, 1].
    pub fn new(module: ModuleKind, score: f64, confidence: f64) -> Self {
        Self {
            module,
            score: score.clamp(0.0, 100.0),
            confidence: confidence.clamp(0.0, 1.0),
            details: BTreeMap::new(),
        }
    }

    /// Neutral zero-confidence result for a module that could not compute.
    pub fn fallback(module: ModuleKind, reason: impl Into<String>) -> Self {
        Self::new(module, NEUTRAL_SCORE, 0.0).with_detail("fallback_reason", reason.into())
    }

    /// Fallback for a series shorter than the module's minimum lookback.
    pub fn insufficient_history(module: ModuleKind, available: usize, required: usize) -> Self {
        Self::fallback(module, "insufficient_history")
            .with_detail("bars_available", available)
            .with_detail("bars_required", required)
    }

    /// Attach an audit sub-metric.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn details(&self) -> &BTreeMap<String, Value> {
        &self.details
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    /// Numeric detail, if present.
    pub fn detail_f64(&self, key: &str) -> Option<f64> {
        self.details.get(key).and_then(Value::as_f64)
    }

    /// Why the module fell back, if it did.
    pub fn fallback_reason(&self) -> Option<&str> {
        self.details.get("fallback_reason").and_then(Value::as_str)
    }

    pub fn is_fallback(&self) -> bool {
        self.confidence == 0.0 && self.fallback_reason().is_some()
    }

    /// Both score and confidence are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.score.is_finite() && self.confidence.is_finite()
    }
}

/// Confidence from available history: full at `full` bars, proportional below it,
/// zero under `min`.
pub(crate) fn history_confidence(available: usize, min: usize, full: usize) -> f64 {
    if available < min || available == 0 {
        return 0.0;
    }
    let full = full.max(min).max(1);
    (available as f64 / full as f64).min(1.0)
}
