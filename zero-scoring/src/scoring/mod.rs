//! Composite scoring.
//!
//! Layer table, per-layer aggregation, the engine that ties modules and
//! layers together, and reporting on the results.
//!
//! ```text
//! SeriesBundle ──▶ modules (per layer) ──▶ aggregate_layer ──▶ CompositeScore
//!                       │                        │
//!                 fault boundary         Σ(score·conf)/Σconf × budget
//! ```

pub mod config;
pub mod engine;
pub mod layer;
pub mod report;
pub mod types;

pub use config::{ConfigError, EngineConfig, LayerSpec, TOTAL_BUDGET};
pub use engine::{BatchResult, ScoringEngine};
pub use layer::{aggregate_layer, LayerType};
pub use report::{layer_table, ReportFormat, ScoreReport};
pub use types::{CompositeScore, LayerResult};
