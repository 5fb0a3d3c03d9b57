//! Zero Scoring Library
//!
//! Layered composite quality scoring for A-share candidate selection. Eight
//! independent signal modules each rate an instrument on a 0-100 scale with
//! their own confidence; three layers reduce those ratings into fixed point
//! budgets that add up to a single 0-100 composite score.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    zero-scoring (Rust Library + CLI)                │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐     │
//! │  │  Macro (25)     │  │  Structural (45)│  │  Micro (30)     │     │
//! │  │  market_regime  │  │  relative_      │  │  pattern_       │     │
//! │  │  volume_profile │  │    strength     │  │    recognition  │     │
//! │  │  price_action   │  │  fundamental_   │  │  volume_spike   │     │
//! │  │                 │  │    quality      │  │  momentum       │     │
//! │  └────────┬────────┘  └────────┬────────┘  └────────┬────────┘     │
//! │           └──────────── ScoringEngine ─────────────┘               │
//! │                              │                                      │
//! │                        CompositeScore                               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Confidence weighting
//! - Each layer is `Σ(score × confidence) / Σ confidence`, rescaled to its budget
//! - A module with zero confidence has no influence on its layer
//! - A layer with no confident members sits at the midpoint of its budget
//!
//! ## Graceful degradation
//! - Short history, missing fundamentals or missing holdings lower confidence
//!   instead of failing the evaluation
//! - A panicking or non-finite module falls back on its own; the rest of the
//!   instrument, and the rest of the batch, are unaffected
//!
//! ## Point-in-time
//! - Candles and holdings dated after `as_of` are ignored

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod indicators;
pub mod modules;
pub mod scoring;

#[cfg(test)]
pub(crate) mod fixtures;

pub use data::{load_bundle, load_bundles, Candle, EtfHolding, Fundamentals, SeriesBundle};
pub use modules::{
    ModuleKind, ModuleOptions, ModuleScore, SignalModule, MAX_OPTION_VALUE, NEUTRAL_SCORE,
};
pub use scoring::{
    BatchResult, CompositeScore, ConfigError, EngineConfig, LayerResult, LayerSpec, LayerType,
    ReportFormat, ScoreReport, ScoringEngine,
};
