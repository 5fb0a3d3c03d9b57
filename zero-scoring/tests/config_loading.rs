//! Loading the layer table from the modular config directory.

mod common;

use std::fs;
use std::path::Path;

use common::full_bundle;
use serde_json::json;
use tempfile::TempDir;
use zero_common::config::Config;
use zero_scoring::{ConfigError, EngineConfig, LayerType, ModuleKind, ScoringEngine};

fn write_json(dir: &Path, name: &str, value: serde_json::Value) {
    fs::write(dir.join(name), serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

#[test]
fn test_empty_directory_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_dir(dir.path()).unwrap();
    assert_eq!(EngineConfig::from_config(&config).unwrap(), EngineConfig::default());
}

#[test]
fn test_scoring_file_overrides_layer_table() {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "config.json",
        json!({ "observability": { "log_level": "warn" } }),
    );
    write_json(
        dir.path(),
        "scoring.json",
        json!({
            "$schema": "https://example.invalid/scoring.schema.json",
            "min_confidence": 0.3,
            "layers": [
                { "name": "macro", "budget": 20.0,
                  "modules": ["market_regime", "volume_profile", "price_action"] },
                { "name": "structural", "budget": 50.0,
                  "modules": ["relative_strength", "fundamental_quality"] },
                { "name": "micro", "budget": 30.0,
                  "modules": ["pattern_recognition", "volume_spike", "momentum"] }
            ],
            "modules": {
                "relative_strength": { "major_weight_pct": 8.0 }
            }
        }),
    );

    let config = Config::load_dir(dir.path()).unwrap();
    assert_eq!(config.observability.log_level, "warn");

    let engine_config = EngineConfig::from_config(&config).unwrap();
    assert_eq!(engine_config.min_confidence, 0.3);
    assert_eq!(engine_config.layers[0].budget, 20.0);
    assert_eq!(engine_config.layers[1].budget, 50.0);

    let engine = ScoringEngine::new(engine_config).unwrap();
    let score = engine.evaluate(&full_bundle("600519.SH", 0.15));
    assert_eq!(score.layer(LayerType::Structural).unwrap().budget(), 50.0);
    // no holding reaches 8%, so every membership counts as minor
    assert_eq!(
        score
            .module(ModuleKind::RelativeStrength)
            .unwrap()
            .detail_f64("etf_preference_score"),
        Some(1.0)
    );
}

#[test]
fn test_bad_budget_sum_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "scoring.json",
        json!({
            "layers": [
                { "name": "macro", "budget": 30.0,
                  "modules": ["market_regime", "volume_profile", "price_action"] },
                { "name": "structural", "budget": 45.0,
                  "modules": ["relative_strength", "fundamental_quality"] },
                { "name": "micro", "budget": 30.0,
                  "modules": ["pattern_recognition", "volume_spike", "momentum"] }
            ]
        }),
    );

    let config = Config::load_dir(dir.path()).unwrap();
    assert_eq!(
        EngineConfig::from_config(&config),
        Err(ConfigError::BudgetSum { total: 105.0 })
    );
}

#[test]
fn test_unknown_module_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "scoring.json",
        json!({ "modules": { "sentiment": { "window": 5 } } }),
    );

    let config = Config::load_dir(dir.path()).unwrap();
    assert_eq!(
        EngineConfig::from_config(&config),
        Err(ConfigError::UnknownModule("sentiment".into()))
    );
}

#[test]
fn test_malformed_json_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("scoring.json"), "{ not json").unwrap();
    assert!(Config::load_dir(dir.path()).is_err());
}
