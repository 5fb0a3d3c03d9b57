//! Engine configuration.
//!
//! Typed, validated form of the `scoring` section of the shared config.
//! Defaults reproduce the built-in layer table; anything that breaks the
//! 100-point budget or the one-layer-per-module rule is rejected at
//! construction rather than renormalized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zero_common::config::{Config, LayerSettings};

use super::layer::LayerType;
use crate::modules::{ModuleKind, ModuleOptions, MAX_OPTION_VALUE};

/// Total every layer table must add up to.
pub const TOTAL_BUDGET: f64 = 100.0;

const BUDGET_TOLERANCE: f64 = 1e-9;

// ============================================================================
// Config Error
// ============================================================================

/// Engine configuration error. Always fatal at construction.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Layer budgets total {total}, expected 100")]
    BudgetSum { total: f64 },

    #[error("Layer {layer} has invalid budget {budget}")]
    InvalidBudget { layer: LayerType, budget: f64 },

    #[error("Layer {0} is not configured")]
    MissingLayer(LayerType),

    #[error("Layer {0} is configured more than once")]
    DuplicateLayer(LayerType),

    #[error("Layer {0} has no modules")]
    EmptyLayer(LayerType),

    #[error("Module {module} is assigned to both {first} and {second}")]
    DuplicateModule {
        module: ModuleKind,
        first: LayerType,
        second: LayerType,
    },

    #[error("Options given for module {0}, which is not assigned to any layer")]
    OrphanOptions(ModuleKind),

    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("min_confidence must be within [0, 1], got {0}")]
    InvalidMinConfidence(f64),

    #[error("Option {module}.{key} {reason}")]
    InvalidOption {
        module: ModuleKind,
        key: String,
        reason: String,
    },
}

impl From<ConfigError> for zero_common::Error {
    fn from(err: ConfigError) -> Self {
        zero_common::Error::Config(err.to_string())
    }
}

// ============================================================================
// Layer Spec
// ============================================================================

/// One configured layer: its budget and ordered members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub layer: LayerType,
    pub budget: f64,
    pub modules: Vec<ModuleKind>,
}

impl LayerSpec {
    /// Built-in spec for a layer.
    pub fn default_for(layer: LayerType) -> Self {
        Self {
            layer,
            budget: layer.budget(),
            modules: layer.default_modules().to_vec(),
        }
    }

    fn from_settings(settings: &LayerSettings) -> Result<Self, ConfigError> {
        let layer = LayerType::from_name(&settings.name)
            .ok_or_else(|| ConfigError::UnknownLayer(settings.name.clone()))?;
        let modules = settings
            .modules
            .iter()
            .map(|name| {
                ModuleKind::from_name(name).ok_or_else(|| ConfigError::UnknownModule(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            layer,
            budget: settings.budget,
            modules,
        })
    }
}

// ============================================================================
// Engine Config
// ============================================================================

/// Everything the engine needs, fixed for its lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Layer table in evaluation order
    pub layers: Vec<LayerSpec>,
    /// Per-module options; modules without an entry use their defaults
    pub options: BTreeMap<ModuleKind, ModuleOptions>,
    /// Minimum overall confidence for ranked output
    pub min_confidence: f64,
    /// Evaluate modules and instruments on the rayon pool
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layers: LayerType::ALL.into_iter().map(LayerSpec::default_for).collect(),
            options: BTreeMap::new(),
            min_confidence: 0.0,
            parallel: true,
        }
    }
}

impl EngineConfig {
    /// Build from the shared configuration and validate.
    ///
    /// A missing `scoring` section yields the defaults.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut engine_config = Self::default();
        let Some(scoring) = config.scoring.as_ref() else {
            return Ok(engine_config);
        };

        if let Some(ref layers) = scoring.layers {
            engine_config.layers = layers
                .iter()
                .map(LayerSpec::from_settings)
                .collect::<Result<Vec<_>, _>>()?;
        }

        for (name, map) in &scoring.modules {
            let kind =
                ModuleKind::from_name(name).ok_or_else(|| ConfigError::UnknownModule(name.clone()))?;
            engine_config
                .options
                .insert(kind, ModuleOptions::from_map(map.clone()));
        }

        engine_config.min_confidence = config.scoring_min_confidence();
        engine_config.parallel = config.scoring_parallel();

        engine_config.validate()?;
        Ok(engine_config)
    }

    /// Set options for one module.
    pub fn with_options(mut self, kind: ModuleKind, options: ModuleOptions) -> Self {
        self.options.insert(kind, options);
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Layer that owns `kind`, if any.
    pub fn layer_of(&self, kind: ModuleKind) -> Option<LayerType> {
        self.layers
            .iter()
            .find(|spec| spec.modules.contains(&kind))
            .map(|spec| spec.layer)
    }

    /// Check the layer table, module membership and option values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_confidence.is_finite() || !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::InvalidMinConfidence(self.min_confidence));
        }

        let mut seen_layers: Vec<LayerType> = Vec::with_capacity(self.layers.len());
        for spec in &self.layers {
            if seen_layers.contains(&spec.layer) {
                return Err(ConfigError::DuplicateLayer(spec.layer));
            }
            seen_layers.push(spec.layer);
        }
        if let Some(missing) = LayerType::ALL.into_iter().find(|l| !seen_layers.contains(l)) {
            return Err(ConfigError::MissingLayer(missing));
        }

        let mut total = 0.0;
        for spec in &self.layers {
            if !spec.budget.is_finite() || spec.budget <= 0.0 {
                return Err(ConfigError::InvalidBudget {
                    layer: spec.layer,
                    budget: spec.budget,
                });
            }
            total += spec.budget;
        }
        if (total - TOTAL_BUDGET).abs() > BUDGET_TOLERANCE {
            return Err(ConfigError::BudgetSum { total });
        }

        let mut owners: BTreeMap<ModuleKind, LayerType> = BTreeMap::new();
        for spec in &self.layers {
            if spec.modules.is_empty() {
                return Err(ConfigError::EmptyLayer(spec.layer));
            }
            for &module in &spec.modules {
                if let Some(&first) = owners.get(&module) {
                    return Err(ConfigError::DuplicateModule {
                        module,
                        first,
                        second: spec.layer,
                    });
                }
                owners.insert(module, spec.layer);
            }
        }

        for (&kind, options) in &self.options {
            if !owners.contains_key(&kind) {
                return Err(ConfigError::OrphanOptions(kind));
            }
            validate_options(kind, options)?;
        }

        Ok(())
    }
}

/// Recognized keys must hold finite numbers in `0..=MAX_OPTION_VALUE`. Other keys are ignored.
fn validate_options(kind: ModuleKind, options: &ModuleOptions) -> Result<(), ConfigError> {
    for &key in kind.module().option_keys() {
        let Some(value) = options.get(key) else {
            continue;
        };
        let invalid = |reason: &str| ConfigError::InvalidOption {
            module: kind,
            key: key.to_string(),
            reason: reason.to_string(),
        };
        let number = value.as_f64().ok_or_else(|| invalid("must be a number"))?;
        if !number.is_finite() || number < 0.0 {
            return Err(invalid("must be a finite non-negative number"));
        }
        if number > MAX_OPTION_VALUE {
            return Err(invalid(&format!("must not exceed {MAX_OPTION_VALUE}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zero_common::config::ScoringConfig;

    fn settings(name: &str, budget: f64, modules: &[&str]) -> LayerSettings {
        LayerSettings {
            name: name.to_string(),
            budget,
            modules: modules.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn config_with(scoring: ScoringConfig) -> Config {
        Config {
            scoring: Some(scoring),
            ..Default::default()
        }
    }

    fn default_layer_settings() -> Vec<LayerSettings> {
        vec![
            settings("macro", 25.0, &["market_regime", "volume_profile", "price_action"]),
            settings("structural", 45.0, &["relative_strength", "fundamental_quality"]),
            settings("micro", 30.0, &["pattern_recognition", "volume_spike", "momentum"]),
        ]
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.layers.len(), 3);
        assert_eq!(config.layer_of(ModuleKind::VolumeSpike), Some(LayerType::Micro));
    }

    #[test]
    fn test_missing_scoring_section_uses_defaults() {
        let config = EngineConfig::from_config(&Config::default()).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_from_config_reads_everything() {
        let mut modules = BTreeMap::new();
        modules.insert(
            "relative_strength".to_string(),
            json!({"major_weight_pct": 4.0}).as_object().unwrap().clone(),
        );
        let scoring = ScoringConfig {
            layers: Some(default_layer_settings()),
            modules,
            min_confidence: Some(0.4),
            parallel: Some(false),
        };

        let config = EngineConfig::from_config(&config_with(scoring)).unwrap();
        assert_eq!(config.min_confidence, 0.4);
        assert!(!config.parallel);
        let opts = &config.options[&ModuleKind::RelativeStrength];
        assert_eq!(opts.f64_or("major_weight_pct", 5.0), 4.0);
    }

    #[test]
    fn test_budgets_must_total_100() {
        let mut layers = default_layer_settings();
        layers[0].budget = 30.0;
        let scoring = ScoringConfig {
            layers: Some(layers),
            ..Default::default()
        };
        let err = EngineConfig::from_config(&config_with(scoring)).unwrap_err();
        assert_eq!(err, ConfigError::BudgetSum { total: 105.0 });
    }

    #[test]
    fn test_rebalanced_budgets_are_accepted() {
        let mut layers = default_layer_settings();
        layers[0].budget = 20.0;
        layers[2].budget = 35.0;
        let scoring = ScoringConfig {
            layers: Some(layers),
            ..Default::default()
        };
        let config = EngineConfig::from_config(&config_with(scoring)).unwrap();
        assert_eq!(config.layers[2].budget, 35.0);
    }

    #[test]
    fn test_non_positive_budget() {
        let mut config = EngineConfig::default();
        config.layers[0].budget = 0.0;
        config.layers[1].budget = 70.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidBudget {
                layer: LayerType::Macro,
                budget: 0.0
            })
        );

        config.layers[0].budget = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBudget { .. })));
    }

    #[test]
    fn test_layer_table_shape_errors() {
        let mut config = EngineConfig::default();
        config.layers.pop();
        assert_eq!(config.validate(), Err(ConfigError::MissingLayer(LayerType::Micro)));

        let mut config = EngineConfig::default();
        config.layers.push(LayerSpec::default_for(LayerType::Macro));
        assert_eq!(config.validate(), Err(ConfigError::DuplicateLayer(LayerType::Macro)));

        let mut config = EngineConfig::default();
        config.layers[1].modules.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyLayer(LayerType::Structural)));
    }

    #[test]
    fn test_module_in_two_layers() {
        let mut config = EngineConfig::default();
        config.layers[2].modules.push(ModuleKind::MarketRegime);
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateModule {
                module: ModuleKind::MarketRegime,
                first: LayerType::Macro,
                second: LayerType::Micro,
            })
        );
    }

    #[test]
    fn test_options_for_unassigned_module() {
        let mut config = EngineConfig::default();
        config.layers[0].modules.retain(|m| *m != ModuleKind::PriceAction);
        let config =
            config.with_options(ModuleKind::PriceAction, ModuleOptions::new().with("lookback", 10));
        assert_eq!(
            config.validate(),
            Err(ConfigError::OrphanOptions(ModuleKind::PriceAction))
        );
    }

    #[test]
    fn test_unknown_names() {
        let mut layers = default_layer_settings();
        layers[1].name = "meso".into();
        let scoring = ScoringConfig {
            layers: Some(layers),
            ..Default::default()
        };
        assert_eq!(
            EngineConfig::from_config(&config_with(scoring)).unwrap_err(),
            ConfigError::UnknownLayer("meso".into())
        );

        let mut layers = default_layer_settings();
        layers[2].modules.push("sentiment".into());
        let scoring = ScoringConfig {
            layers: Some(layers),
            ..Default::default()
        };
        assert_eq!(
            EngineConfig::from_config(&config_with(scoring)).unwrap_err(),
            ConfigError::UnknownModule("sentiment".into())
        );
    }

    #[test]
    fn test_min_confidence_range() {
        let config = EngineConfig::default().with_min_confidence(1.5);
        assert_eq!(config.validate(), Err(ConfigError::InvalidMinConfidence(1.5)));
        let config = EngineConfig::default().with_min_confidence(f64::NAN);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMinConfidence(_))));
    }

    #[test]
    fn test_option_values_are_checked() {
        let config = EngineConfig::default()
            .with_options(ModuleKind::VolumeSpike, ModuleOptions::new().with("window", -5));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { module: ModuleKind::VolumeSpike, .. })
        ));

        let config = EngineConfig::default()
            .with_options(ModuleKind::Momentum, ModuleOptions::new().with("fast", "twelve"));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidOption { .. })));

        let config = EngineConfig::default().with_options(
            ModuleKind::RelativeStrength,
            ModuleOptions::new().with("return_window", u64::MAX),
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { module: ModuleKind::RelativeStrength, ref key, .. })
                if key == "return_window"
        ));

        let config = EngineConfig::default().with_options(
            ModuleKind::VolumeProfile,
            ModuleOptions::new().with("recent_window", MAX_OPTION_VALUE),
        );
        assert!(config.validate().is_ok());

        // Unrecognized keys are ignored
        let config = EngineConfig::default()
            .with_options(ModuleKind::Momentum, ModuleOptions::new().with("colour", "blue"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_error_maps_to_common_error() {
        let err: zero_common::Error = ConfigError::MissingLayer(LayerType::Micro).into();
        assert!(err.is_config());
        assert_eq!(err.exit_code(), 78);
    }
}
