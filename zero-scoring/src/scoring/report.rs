//! Report generation for composite scores.
//!
//! Generates reports in two formats:
//! - Plain-text table (for terminals and logs)
//! - JSON (for audit persistence by the caller)

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::config::EngineConfig;
use super::engine::BatchResult;
use super::types::CompositeScore;

// ============================================================================
// Report Format
// ============================================================================

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Aligned plain-text breakdown
    Table,
    /// Pretty-printed JSON
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

// ============================================================================
// Score Report
// ============================================================================

/// Report generator for one or more composite scores.
pub struct ScoreReport {
    scores: Vec<CompositeScore>,
}

impl ScoreReport {
    /// Report on scores in the given order.
    pub fn new(scores: Vec<CompositeScore>) -> Self {
        Self { scores }
    }

    /// Ranked report of a batch, keeping scores with at least `min_confidence`.
    pub fn from_batch(batch: &BatchResult, min_confidence: f64) -> Self {
        Self::new(batch.ranked(min_confidence).into_iter().cloned().collect())
    }

    pub fn scores(&self) -> &[CompositeScore] {
        &self.scores
    }

    /// Generate report in the specified format.
    pub fn generate(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Table => self.to_table(),
            ReportFormat::Json => self.to_json(),
        }
    }

    /// Ranking summary followed by a per-layer, per-module breakdown.
    pub fn to_table(&self) -> String {
        let mut out = String::new();
        if self.scores.is_empty() {
            out.push_str("No instruments scored.\n");
            return out;
        }

        let _ = writeln!(
            out,
            "{:<4}  {:<12}  {:<10}  {:>6}  {:>6}",
            "#", "Symbol", "As of", "Total", "Conf"
        );
        let _ = writeln!(out, "{}", "-".repeat(46));
        for (i, score) in self.scores.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:<4}  {:<12}  {:<10}  {:>6.1}  {:>6.2}",
                i + 1,
                score.symbol(),
                score.as_of(),
                score.total_score(),
                score.overall_confidence()
            );
        }

        for score in &self.scores {
            out.push('\n');
            out.push_str(&Self::breakdown(score));
        }
        out
    }

    /// Breakdown of a single score.
    pub fn breakdown(score: &CompositeScore) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} @ {}: total {:.1}/100, confidence {:.2}",
            score.symbol(),
            score.as_of(),
            score.total_score(),
            score.overall_confidence()
        );

        for layer in score.layers() {
            let _ = writeln!(
                out,
                "  {:<22} {:>5.1} / {:<5} conf {:.2}",
                layer.layer().name(),
                layer.layer_score(),
                layer.budget(),
                layer.layer_confidence()
            );
            for module in layer.modules() {
                let mut line = format!(
                    "    {:<20} {:>5.1}         conf {:.2}",
                    module.module.name(),
                    module.score(),
                    module.confidence()
                );
                if let Some(reason) = module.fallback_reason() {
                    let _ = write!(line, "  [fallback: {}]", reason);
                }
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }

    /// Generate JSON report.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.scores).unwrap_or_else(|_| "[]".to_string())
    }
}

/// The effective layer table, one module per line with its configured options.
pub fn layer_table(config: &EngineConfig) -> String {
    let mut out = String::new();
    for spec in &config.layers {
        let _ = writeln!(
            out,
            "{} ({} points)",
            spec.layer.name(),
            spec.budget
        );
        for kind in &spec.modules {
            match config.options.get(kind).filter(|o| !o.is_empty()) {
                Some(options) => {
                    let rendered = serde_json::to_string(options).unwrap_or_default();
                    let _ = writeln!(out, "  - {} {}", kind, rendered);
                }
                None => {
                    let _ = writeln!(out, "  - {}", kind);
                }
            }
        }
    }
    out
}
