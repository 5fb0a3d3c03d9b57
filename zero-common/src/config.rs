//! Configuration management for Zero scoring services.
//!
//! The scoring service shares the configuration directory at `~/.codecoder/`.
//! The core file is `config.json`; scoring knobs may live in a separate
//! `scoring.json` which is deep-merged into the `scoring` section.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (ZERO_* prefix)
//! 2. Modular files (`scoring.json`)
//! 3. Core file (`config.json`)
//! 4. Default values
//!
//! # Environment Variable Mapping
//!
//! - `ZERO_LOG_LEVEL` → observability.log_level
//! - `ZERO_LOG_FORMAT` → observability.log_format
//! - `ZERO_SCORING_MIN_CONFIDENCE` → scoring.min_confidence
//! - `ZERO_SCORING_PARALLEL` → scoring.parallel

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config_loader::load_modular_config;

/// `~/.codecoder`, or `./.codecoder` when no home directory is known.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".codecoder"),
        |dirs| dirs.home_dir().join(".codecoder"),
    )
}

/// Root configuration structure for the Zero scoring services.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Editor schema hint; carried through untouched
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Absent means the built-in layer table and module defaults
    #[serde(default)]
    pub scoring: Option<ScoringConfig>,
}

impl Config {
    /// Load configuration from the default directory.
    ///
    /// Missing files fall back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_dir(&config_dir())
    }

    /// Load `config.json` + `scoring.json` from a specific directory.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let value = load_modular_config(dir)?;
        serde_json::from_value(value)
            .with_context(|| format!("Failed to parse config from {}", dir.display()))
    }

    /// Load configuration from a single file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// [`Config::load`] followed by [`Config::apply_env_overrides`].
    pub fn load_with_env() -> Result<Self> {
        Self::load().map(|mut config| {
            config.apply_env_overrides();
            config
        })
    }

    /// Apply `ZERO_*` environment overrides. Unparsable values are logged and skipped.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("ZERO_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("ZERO_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        if let Ok(raw) = std::env::var("ZERO_SCORING_MIN_CONFIDENCE") {
            match raw.parse::<f64>() {
                Ok(v) => self.scoring_mut().min_confidence = Some(v),
                Err(_) => tracing::warn!(value = %raw, "Ignoring unparsable ZERO_SCORING_MIN_CONFIDENCE"),
            }
        }
        if let Ok(raw) = std::env::var("ZERO_SCORING_PARALLEL") {
            match raw.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.scoring_mut().parallel = Some(true),
                "0" | "false" | "no" | "off" => self.scoring_mut().parallel = Some(false),
                _ => tracing::warn!(value = %raw, "Ignoring unparsable ZERO_SCORING_PARALLEL"),
            }
        }
    }

    /// Scoring section, created on first write.
    pub fn scoring_mut(&mut self) -> &mut ScoringConfig {
        self.scoring.get_or_insert_with(ScoringConfig::default)
    }

    /// Minimum overall confidence a consumer should require (default 0.0).
    pub fn scoring_min_confidence(&self) -> f64 {
        self.scoring
            .as_ref()
            .and_then(|s| s.min_confidence)
            .unwrap_or(0.0)
    }

    /// Whether modules and instruments are evaluated on the rayon pool (default true).
    pub fn scoring_parallel(&self) -> bool {
        self.scoring
            .as_ref()
            .and_then(|s| s.parallel)
            .unwrap_or(true)
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Logging knobs, consumed by [`crate::logging::init_from_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Level or `EnvFilter` directive list, e.g. `info,zero_scoring=debug`
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// `json` or `pretty`
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Extra targets held at `warn`
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_FORMAT: &str = "pretty";

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_log_format() -> String {
    DEFAULT_LOG_FORMAT.to_string()
}

// ============================================================================
// Scoring
// ============================================================================

/// Raw scoring knobs.
///
/// Names are kept as strings here; the scoring crate resolves them into its
/// closed layer/module sets and rejects anything it does not recognize.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoringConfig {
    /// Layer table override. When absent the built-in
    /// Macro 25 / Structural 45 / Micro 30 table is used.
    #[serde(default)]
    pub layers: Option<Vec<LayerSettings>>,

    /// Per-module options keyed by module name (e.g. `relative_strength`).
    #[serde(default)]
    pub modules: BTreeMap<String, serde_json::Map<String, serde_json::Value>>,

    /// Minimum overall confidence for ranking output.
    #[serde(default)]
    pub min_confidence: Option<f64>,

    /// Evaluate on the rayon pool.
    #[serde(default)]
    pub parallel: Option<bool>,
}

/// One row of the layer table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSettings {
    /// Layer name (`macro`, `structural`, `micro`)
    pub name: String,
    /// Point budget; all budgets must total exactly 100
    pub budget: f64,
    /// Ordered member module names
    #[serde(default)]
    pub modules: Vec<String>,
}
