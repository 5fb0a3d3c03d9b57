//! Modular configuration loader.
//!
//! A config directory holds up to two files:
//! - `config.json` - core configuration (observability, optional `scoring`)
//! - `scoring.json` - layer table and per-module options, overlaid onto the
//!   `scoring` section of `config.json`
//!
//! Either file may be absent. Objects merge key by key; any other value in
//! the overlay replaces the base value outright, so a `layers` array in
//! `scoring.json` replaces the whole layer table.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// Core configuration file name.
pub const CORE_FILE: &str = "config.json";

/// Scoring overlay file name.
pub const SCORING_FILE: &str = "scoring.json";

/// Files making up a config directory, in load order.
pub const CONFIG_FILES: [&str; 2] = [CORE_FILE, SCORING_FILE];

/// Read a JSON document, treating a missing file as `None`.
fn read_optional(path: &Path) -> Result<Option<Value>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    serde_json::from_str(&content)
        .map(Some)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Overlay `overlay` onto `base` in place.
fn deep_merge(base: &mut Value, overlay: Value) {
    let Value::Object(overlay_map) = overlay else {
        *base = overlay;
        return;
    };
    let Value::Object(base_map) = base else {
        *base = Value::Object(overlay_map);
        return;
    };
    for (key, value) in overlay_map {
        match base_map.get_mut(&key) {
            Some(slot) if !slot.is_null() => deep_merge(slot, value),
            _ => {
                base_map.insert(key, value);
            }
        }
    }
}

/// Drop editor annotations (`$schema`, `_comment`, ...) from an overlay's top level.
fn without_annotations(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !key.starts_with(['$', '_']))
                .collect(),
        ),
        other => other,
    }
}

/// Load `config.json` and overlay `scoring.json` onto its `scoring` section.
///
/// Environment overrides are applied later, on the typed [`crate::Config`].
pub fn load_modular_config(dir: &Path) -> Result<Value> {
    tracing::debug!(dir = %dir.display(), "Loading modular config");

    let mut root = read_optional(&dir.join(CORE_FILE))?
        .unwrap_or_else(|| Value::Object(Map::new()));

    if let Some(overlay) = read_optional(&dir.join(SCORING_FILE))? {
        let overlay = without_annotations(overlay);
        let Value::Object(root_map) = &mut root else {
            anyhow::bail!("{} must contain a JSON object", dir.join(CORE_FILE).display());
        };
        match root_map.get_mut("scoring") {
            Some(scoring) if !scoring.is_null() => deep_merge(scoring, overlay),
            _ => {
                root_map.insert("scoring".to_string(), overlay);
            }
        }
        tracing::debug!("Applied {}", SCORING_FILE);
    }

    Ok(root)
}

/// Which config files are present in `dir`.
pub fn modular_file_status(dir: &Path) -> Vec<(&'static str, bool)> {
    CONFIG_FILES
        .iter()
        .map(|&file| (file, dir.join(file).is_file()))
        .collect()
}
