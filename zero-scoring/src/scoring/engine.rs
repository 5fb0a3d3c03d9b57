//! Composite scoring engine.
//!
//! Runs every configured module for an instrument, reduces each layer and
//! assembles the [`CompositeScore`]. Modules are isolated: a panic or a
//! non-finite result becomes that module's fallback and the rest of the
//! evaluation carries on.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zero_common::batch_span;
use zero_common::logging::generate_trace_id;

use super::config::{ConfigError, EngineConfig};
use super::layer::{aggregate_layer, LayerType};
use super::types::CompositeScore;
use crate::data::SeriesBundle;
use crate::modules::{ModuleKind, ModuleOptions, ModuleScore, SignalModule};

// ============================================================================
// Batch Result
// ============================================================================

/// Outcome of scoring many instruments. Scores keep the input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Trace id shared by every log line of the batch
    pub trace_id: String,
    /// One score per input bundle, in input order
    pub scores: Vec<CompositeScore>,
    /// Wall-clock duration in seconds
    pub duration_secs: f64,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Scores with at least `min_confidence`, best first. Ties break on symbol.
    pub fn ranked(&self, min_confidence: f64) -> Vec<&CompositeScore> {
        let mut ranked: Vec<&CompositeScore> = self
            .scores
            .iter()
            .filter(|s| s.passes(min_confidence))
            .collect();
        ranked.sort_by(|a, b| {
            b.total_score()
                .total_cmp(&a.total_score())
                .then_with(|| a.symbol().cmp(b.symbol()))
        });
        ranked
    }

    /// Get the top N instruments by score.
    pub fn top(&self, n: usize) -> Vec<&CompositeScore> {
        self.ranked(0.0).into_iter().take(n).collect()
    }

    /// Summary string for logging.
    pub fn summary(&self) -> String {
        let fallback_count: usize = self.scores.iter().map(|s| s.fallback_modules().len()).sum();
        let mean_confidence = if self.scores.is_empty() {
            0.0
        } else {
            self.scores.iter().map(CompositeScore::overall_confidence).sum::<f64>()
                / self.scores.len() as f64
        };
        format!(
            "Scored {} instruments in {:.2}s: mean confidence {:.2}, {} module fallbacks",
            self.scores.len(),
            self.duration_secs,
            mean_confidence,
            fallback_count
        )
    }
}

// ============================================================================
// Scoring Engine
// ============================================================================

struct ModuleSlot {
    kind: ModuleKind,
    module: &'static dyn SignalModule,
    options: ModuleOptions,
}

struct LayerSlot {
    layer: LayerType,
    budget: f64,
    members: Vec<ModuleSlot>,
}

/// The composite scoring engine.
///
/// Holds a validated, immutable configuration and is `Send + Sync`, so one
/// instance can score any number of instruments concurrently.
pub struct ScoringEngine {
    config: EngineConfig,
    layers: Vec<LayerSlot>,
}

impl ScoringEngine {
    /// Create an engine. Configuration errors are returned here and never later.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let layers = config
            .layers
            .iter()
            .map(|spec| LayerSlot {
                layer: spec.layer,
                budget: spec.budget,
                members: spec
                    .modules
                    .iter()
                    .map(|&kind| ModuleSlot {
                        kind,
                        module: kind.module(),
                        options: config.options.get(&kind).cloned().unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();

        info!(
            layers = config.layers.len(),
            modules = config.layers.iter().map(|l| l.modules.len()).sum::<usize>(),
            parallel = config.parallel,
            "Scoring engine initialized"
        );

        Ok(Self { config, layers })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Score one instrument.
    pub fn evaluate(&self, series: &SeriesBundle) -> CompositeScore {
        let layers = self
            .layers
            .iter()
            .map(|slot| {
                let scores: Vec<ModuleScore> = if self.config.parallel {
                    slot.members
                        .par_iter()
                        .map(|m| run_module(m, series))
                        .collect()
                } else {
                    slot.members.iter().map(|m| run_module(m, series)).collect()
                };
                aggregate_layer(slot.layer, slot.budget, scores)
            })
            .collect();

        let composite = CompositeScore::from_layers(series.symbol.clone(), series.as_of, layers);
        debug!(
            symbol = %composite.symbol(),
            total_score = composite.total_score(),
            confidence = composite.overall_confidence(),
            fallbacks = composite.fallback_modules().len(),
            "Instrument scored"
        );
        composite
    }

    /// Score many instruments. One result per input, in input order; a failure
    /// on one instrument never affects another.
    pub fn evaluate_batch(&self, bundles: &[SeriesBundle]) -> BatchResult {
        let trace_id = generate_trace_id();
        let span = batch_span!(trace_id, instruments = bundles.len());
        let _guard = span.enter();
        let started = Instant::now();

        let scores: Vec<CompositeScore> = if self.config.parallel {
            bundles.par_iter().map(|b| self.evaluate_isolated(b)).collect()
        } else {
            bundles.iter().map(|b| self.evaluate_isolated(b)).collect()
        };

        let result = BatchResult {
            trace_id,
            scores,
            duration_secs: started.elapsed().as_secs_f64(),
        };
        info!("{}", result.summary());
        result
    }

    fn evaluate_isolated(&self, series: &SeriesBundle) -> CompositeScore {
        match panic::catch_unwind(AssertUnwindSafe(|| self.evaluate(series))) {
            Ok(score) => score,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(symbol = %series.symbol, panic = %message, "Instrument evaluation panicked");
                self.fallback_composite(series, "instrument_panic")
            }
        }
    }

    /// Every module at its fallback: total 50, confidence 0.
    fn fallback_composite(&self, series: &SeriesBundle, reason: &str) -> CompositeScore {
        let layers = self
            .layers
            .iter()
            .map(|slot| {
                let scores = slot
                    .members
                    .iter()
                    .map(|m| ModuleScore::fallback(m.kind, reason))
                    .collect();
                aggregate_layer(slot.layer, slot.budget, scores)
            })
            .collect();
        CompositeScore::from_layers(series.symbol.clone(), series.as_of, layers)
    }
}

/// Invoke one module behind the fault boundary.
fn run_module(slot: &ModuleSlot, series: &SeriesBundle) -> ModuleScore {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        slot.module.calculate_score(series, &slot.options)
    }));

    match outcome {
        Ok(score) if score.is_finite() => score,
        Ok(_) => {
            warn!(
                symbol = %series.symbol,
                module = %slot.kind,
                "Module produced a non-finite score, using fallback"
            );
            ModuleScore::fallback(slot.kind, "non_finite_output")
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(
                symbol = %series.symbol,
                module = %slot.kind,
                panic = %message,
                "Module panicked, using fallback"
            );
            ModuleScore::fallback(slot.kind, "module_panic").with_detail("panic_message", message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{EtfHolding, Fundamentals};
    use crate::fixtures::{bundle, date, trending_candles};

    struct PanickingModule;

    impl SignalModule for PanickingModule {
        fn kind(&self) -> ModuleKind {
            ModuleKind::Momentum
        }

        fn option_keys(&self) -> &'static [&'static str] {
            &[]
        }

        fn calculate_score(&self, _: &SeriesBundle, _: &ModuleOptions) -> ModuleScore {
            panic!("index out of range in test module")
        }
    }

    struct NanModule;

    impl SignalModule for NanModule {
        fn kind(&self) -> ModuleKind {
            ModuleKind::FundamentalQuality
        }

        fn option_keys(&self) -> &'static [&'static str] {
            &[]
        }

        fn calculate_score(&self, _: &SeriesBundle, _: &ModuleOptions) -> ModuleScore {
            ModuleScore::new(ModuleKind::FundamentalQuality, f64::NAN, 1.0)
        }
    }

    fn engine() -> ScoringEngine {
        ScoringEngine::new(EngineConfig::default()).unwrap()
    }

    fn rich_bundle(symbol: &str, daily_pct: f64) -> SeriesBundle {
        bundle(symbol, trending_candles(250, 20.0, daily_pct))
            .with_etf_holdings(vec![
                EtfHolding::new("510300.SH", symbol, 6.0, date(100)),
                EtfHolding::new("510500.SH", symbol, 2.0, date(100)),
            ])
            .with_fundamentals(Fundamentals {
                period_end: Some(date(180)),
                roe: Some(18.0),
                gross_margin: Some(35.0),
                debt_ratio: Some(40.0),
                operating_cash_flow: Some(90.0),
                net_profit: Some(100.0),
                revenue_growth: Some(12.0),
            })
    }

    /// Swap the implementation behind one slot.
    fn inject(engine: &mut ScoringEngine, kind: ModuleKind, module: &'static dyn SignalModule) {
        for layer in &mut engine.layers {
            for slot in &mut layer.members {
                if slot.kind == kind {
                    slot.module = module;
                }
            }
        }
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = EngineConfig::default();
        config.layers[0].budget = 40.0;
        assert!(matches!(
            ScoringEngine::new(config),
            Err(ConfigError::BudgetSum { .. })
        ));
    }

    #[test]
    fn test_full_breakdown() {
        let score = engine().evaluate(&rich_bundle("600519.SH", 0.2));

        assert_eq!(score.symbol(), "600519.SH");
        assert_eq!(score.layers().len(), 3);
        assert_eq!(score.modules().count(), 8);
        assert!(score.fallback_modules().is_empty());
        assert!(score.overall_confidence() > 0.9);

        let sum: f64 = score.layers().iter().map(|l| l.layer_score()).sum();
        assert!((score.total_score() - sum).abs() < 1e-9);
        for layer in score.layers() {
            assert!(layer.layer_score() >= 0.0 && layer.layer_score() <= layer.budget());
        }
    }

    #[test]
    fn test_uptrend_outscores_downtrend() {
        let e = engine();
        let up = e.evaluate(&rich_bundle("UP", 0.3));
        let down = e.evaluate(&rich_bundle("DOWN", -0.3));
        assert!(up.total_score() > down.total_score());
    }

    #[test]
    fn test_evaluation_is_bit_identical() {
        let e = engine();
        let b = rich_bundle("600519.SH", 0.15);
        let first = e.evaluate(&b);
        let second = e.evaluate(&b);
        assert_eq!(first, second);
        assert_eq!(first.total_score().to_bits(), second.total_score().to_bits());

        let sequential = ScoringEngine::new(EngineConfig::default().with_parallel(false))
            .unwrap()
            .evaluate(&b);
        assert_eq!(first, sequential);
    }

    #[test]
    fn test_empty_series_yields_neutral_zero_confidence() {
        let score = engine().evaluate(&bundle("NEW.SH", vec![]));
        assert_eq!(score.total_score(), 50.0);
        assert_eq!(score.overall_confidence(), 0.0);
        assert_eq!(score.fallback_modules().len(), 8);
        assert!(!score.passes(0.1));
    }

    #[test]
    fn test_panicking_module_is_isolated() {
        let mut e = engine();
        inject(&mut e, ModuleKind::Momentum, &PanickingModule);

        let score = e.evaluate(&rich_bundle("600519.SH", 0.2));
        let momentum = score.module(ModuleKind::Momentum).unwrap();
        assert_eq!(momentum.fallback_reason(), Some("module_panic"));
        assert_eq!(
            momentum.detail("panic_message").unwrap(),
            "index out of range in test module"
        );
        assert_eq!(score.fallback_modules().len(), 1);
        assert!(score.module(ModuleKind::VolumeSpike).unwrap().confidence() > 0.0);
    }

    #[test]
    fn test_non_finite_output_is_replaced() {
        let mut e = engine();
        inject(&mut e, ModuleKind::FundamentalQuality, &NanModule);

        let score = e.evaluate(&rich_bundle("600519.SH", 0.2));
        let fq = score.module(ModuleKind::FundamentalQuality).unwrap();
        assert_eq!(fq.fallback_reason(), Some("non_finite_output"));
        assert!(score.total_score().is_finite());
        assert!(score.overall_confidence().is_finite());
    }

    #[test]
    fn test_batch_preserves_order_and_isolates_instruments() {
        let mut e = engine();
        inject(&mut e, ModuleKind::Momentum, &PanickingModule);

        let bundles = vec![
            rich_bundle("B", 0.3),
            bundle("EMPTY", vec![]),
            rich_bundle("A", -0.2),
        ];
        let batch = e.evaluate_batch(&bundles);

        assert_eq!(batch.len(), 3);
        let symbols: Vec<&str> = batch.scores.iter().map(|s| s.symbol()).collect();
        assert_eq!(symbols, vec!["B", "EMPTY", "A"]);
        assert_eq!(batch.scores[1].overall_confidence(), 0.0);
        assert!(batch.scores[0].overall_confidence() > 0.5);
        assert!(!batch.trace_id.is_empty());
    }

    #[test]
    fn test_batch_ranking() {
        let e = engine();
        let bundles = vec![
            rich_bundle("DOWN", -0.3),
            bundle("EMPTY", vec![]),
            rich_bundle("UP", 0.3),
        ];
        let batch = e.evaluate_batch(&bundles);

        let ranked: Vec<&str> = batch.ranked(0.5).iter().map(|s| s.symbol()).collect();
        assert_eq!(ranked, vec!["UP", "DOWN"]);

        let top: Vec<&str> = batch.top(1).iter().map(|s| s.symbol()).collect();
        assert_eq!(top, vec!["UP"]);
        assert!(batch.summary().starts_with("Scored 3 instruments"));
    }

    #[test]
    fn test_ranking_ties_break_on_symbol() {
        let e = engine();
        let batch = e.evaluate_batch(&[bundle("ZZZ", vec![]), bundle("AAA", vec![])]);
        let ranked: Vec<&str> = batch.ranked(0.0).iter().map(|s| s.symbol()).collect();
        assert_eq!(ranked, vec!["AAA", "ZZZ"]);
    }

    #[test]
    fn test_module_options_reach_modules() {
        let config = EngineConfig::default().with_options(
            ModuleKind::RelativeStrength,
            ModuleOptions::new().with("major_weight_pct", 1.5),
        );
        let e = ScoringEngine::new(config).unwrap();
        let score = e.evaluate(&rich_bundle("600519.SH", 0.2));
        let rs = score.module(ModuleKind::RelativeStrength).unwrap();
        assert_eq!(rs.detail_f64("high_weight_count"), Some(2.0));
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScoringEngine>();
    }
}
