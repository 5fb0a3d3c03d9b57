//! Configuration validation for Zero scoring services.
//!
//! Provides validation logic for configuration fields to ensure
//! all required values are present and within valid ranges. Structural
//! checks that need the closed layer/module sets (budget totals, module
//! membership) live in the scoring crate.

use thiserror::Error;

use crate::config::{Config, ObservabilityConfig, ScoringConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration conflict: {reason}")]
    Conflict { reason: String },

    #[error("{} configuration problems: {}", .0.len(), join_messages(.0))]
    Multiple(Vec<ValidationError>),
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["json", "pretty"];

impl Config {
    /// Validate every section, reporting all failing sections at once.
    pub fn validate(&self) -> ValidationResult<()> {
        let sections: [Option<&dyn Validate>; 2] = [
            Some(&self.observability),
            self.scoring.as_ref().map(|s| s as &dyn Validate),
        ];
        let mut errors: Vec<ValidationError> = sections
            .into_iter()
            .flatten()
            .filter_map(|section| section.validate().err())
            .collect();

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        // EnvFilter directives such as "info,zero_scoring=debug" are accepted as-is
        let base = self.log_level.split(',').next().unwrap_or_default();
        if !base.contains('=') && !LOG_LEVELS.contains(&base.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("expected one of {:?}, got {:?}", LOG_LEVELS, self.log_level),
            });
        }

        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("expected one of {:?}, got {:?}", LOG_FORMATS, self.log_format),
            });
        }

        Ok(())
    }
}

impl Validate for ScoringConfig {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(min) = self.min_confidence {
            if !(0.0..=1.0).contains(&min) {
                return Err(ValidationError::InvalidValue {
                    field: "scoring.min_confidence".into(),
                    reason: format!("must be within [0, 1], got {min}"),
                });
            }
        }

        if let Some(ref layers) = self.layers {
            if layers.is_empty() {
                return Err(ValidationError::MissingField {
                    field: "scoring.layers".into(),
                });
            }

            for (i, layer) in layers.iter().enumerate() {
                if layer.name.trim().is_empty() {
                    return Err(ValidationError::MissingField {
                        field: format!("scoring.layers[{i}].name"),
                    });
                }
                if !layer.budget.is_finite() {
                    return Err(ValidationError::InvalidValue {
                        field: format!("scoring.layers[{i}].budget"),
                        reason: "must be a finite number".into(),
                    });
                }
            }

            for i in 0..layers.len() {
                for j in (i + 1)..layers.len() {
                    if layers[i].name.eq_ignore_ascii_case(&layers[j].name) {
                        return Err(ValidationError::Conflict {
                            reason: format!(
                                "Layer {} is declared at both scoring.layers[{}] and scoring.layers[{}]",
                                layers[i].name, i, j
                            ),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}
