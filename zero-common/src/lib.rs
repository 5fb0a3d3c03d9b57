//! Zero Common - Shared configuration, logging, and error types for the Zero
//! scoring services.
//!
//! This crate provides:
//! - Configuration types and modular loading (`config.json` + `scoring.json`)
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup and structured logging helpers

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod config_loader;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{Config, LayerSettings, ObservabilityConfig, ScoringConfig};
pub use error::{Error, Result, ResultExt};
pub use validation::{Validate, ValidationError, ValidationResult};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, ScoringConfig};
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::logging::init_logging;
    pub use crate::validation::{Validate, ValidationError};
}
