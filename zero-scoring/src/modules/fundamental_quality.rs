//! Fundamental-quality module (Structural layer).
//!
//! Normalizes up to five reported metrics to [0, 1] and averages the ones
//! that are present. Confidence is the share of metrics available, halved
//! when the report is older than `max_report_age_days`. A report whose
//! period ends after `as_of` is ignored.

use super::{ModuleKind, ModuleOptions, ModuleScore, SignalModule};
use crate::data::{Fundamentals, SeriesBundle};
use crate::indicators::unit_scale;

const METRIC_COUNT: f64 = 5.0;

/// Fundamental-quality module.
pub struct FundamentalQuality;

struct Thresholds {
    target_roe: f64,
    target_gross_margin: f64,
    max_debt_ratio: f64,
}

impl Thresholds {
    fn from_options(options: &ModuleOptions) -> Self {
        Self {
            target_roe: options.f64_or("target_roe", 15.0),
            target_gross_margin: options.f64_or("target_gross_margin", 30.0),
            max_debt_ratio: options.f64_or("max_debt_ratio", 60.0),
        }
    }
}

/// Reported value, treating NaN and infinities as not reported.
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn metric_scores(f: &Fundamentals, t: &Thresholds) -> Vec<(&'static str, f64)> {
    let mut scores = Vec::with_capacity(5);

    if let Some(roe) = finite(f.roe) {
        scores.push(("roe_score", unit_scale(roe, 0.0, t.target_roe)));
    }
    if let Some(gm) = finite(f.gross_margin) {
        scores.push(("gross_margin_score", unit_scale(gm, 0.0, t.target_gross_margin)));
    }
    if let Some(debt) = finite(f.debt_ratio) {
        // Full marks up to half the ceiling, zero at the ceiling
        scores.push((
            "debt_score",
            1.0 - unit_scale(debt, t.max_debt_ratio * 0.5, t.max_debt_ratio),
        ));
    }
    if let (Some(ocf), Some(profit)) = (finite(f.operating_cash_flow), finite(f.net_profit)) {
        let conversion = if profit > 0.0 {
            unit_scale(ocf / profit, 0.0, 1.0)
        } else {
            0.0
        };
        scores.push(("cash_conversion_score", conversion));
    }
    if let Some(growth) = finite(f.revenue_growth) {
        scores.push(("revenue_growth_score", unit_scale(growth, -10.0, 20.0)));
    }

    scores
}

impl SignalModule for FundamentalQuality {
    fn kind(&self) -> ModuleKind {
        ModuleKind::FundamentalQuality
    }

    fn option_keys(&self) -> &'static [&'static str] {
        &[
            "target_roe",
            "target_gross_margin",
            "max_debt_ratio",
            "max_report_age_days",
        ]
    }

    fn calculate_score(&self, series: &SeriesBundle, options: &ModuleOptions) -> ModuleScore {
        let kind = self.kind();
        let Some(ref fundamentals) = series.fundamentals else {
            return ModuleScore::fallback(kind, "missing_fundamentals");
        };
        // A report for a period ending after `as_of` was not yet known on that date
        if let Some(end) = fundamentals.period_end.filter(|end| *end > series.as_of) {
            return ModuleScore::fallback(kind, "future_report")
                .with_detail("report_period_end", end.to_string());
        }

        let thresholds = Thresholds::from_options(options);
        let scores = metric_scores(fundamentals, &thresholds);
        if scores.is_empty() {
            return ModuleScore::fallback(kind, "missing_fundamentals");
        }

        let mean = scores.iter().map(|(_, s)| s).sum::<f64>() / scores.len() as f64;
        let mut confidence = scores.len() as f64 / METRIC_COUNT;

        let max_age = options.usize_or("max_report_age_days", 540) as i64;
        let age_days = fundamentals
            .period_end
            .map(|end| (series.as_of - end).num_days());
        let stale = age_days.is_some_and(|age| age > max_age);
        if stale {
            confidence *= 0.5;
        }

        let mut result = ModuleScore::new(kind, mean * 100.0, confidence)
            .with_detail("metrics_available", scores.len())
            .with_detail("stale_report", stale);
        if let Some(age) = age_days {
            result = result.with_detail("report_age_days", age);
        }
        for (name, value) in scores {
            result = result.with_detail(name, value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{bundle, date, trending_candles};

    fn strong() -> Fundamentals {
        Fundamentals {
            period_end: Some(date(0)),
            roe: Some(22.0),
            gross_margin: Some(45.0),
            debt_ratio: Some(25.0),
            operating_cash_flow: Some(120.0),
            net_profit: Some(100.0),
            revenue_growth: Some(25.0),
        }
    }

    #[test]
    fn test_missing_fundamentals_fall_back() {
        let b = bundle("600519.SH", trending_candles(30, 10.0, 0.1));
        let s = FundamentalQuality.calculate_score(&b, &ModuleOptions::new());
        assert!(s.is_fallback());
        assert_eq!(s.fallback_reason(), Some("missing_fundamentals"));

        let empty = b.with_fundamentals(Fundamentals::default());
        let s = FundamentalQuality.calculate_score(&empty, &ModuleOptions::new());
        assert!(s.is_fallback());
    }

    #[test]
    fn test_strong_company_scores_full() {
        let b = bundle("600519.SH", trending_candles(30, 10.0, 0.1)).with_fundamentals(strong());
        let s = FundamentalQuality.calculate_score(&b, &ModuleOptions::new());
        assert_eq!(s.score(), 100.0);
        assert_eq!(s.confidence(), 1.0);
        assert_eq!(s.detail("stale_report").unwrap(), &serde_json::json!(false));
    }

    #[test]
    fn test_partial_metrics_scale_confidence() {
        let f = Fundamentals {
            roe: Some(7.5),
            gross_margin: Some(30.0),
            ..Default::default()
        };
        let b = bundle("600519.SH", vec![]).with_fundamentals(f);
        let s = FundamentalQuality.calculate_score(&b, &ModuleOptions::new());
        assert!((s.score() - 75.0).abs() < 1e-9);
        assert!((s.confidence() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_loss_making_company_gets_no_cash_conversion() {
        let f = Fundamentals {
            operating_cash_flow: Some(50.0),
            net_profit: Some(-10.0),
            ..Default::default()
        };
        let b = bundle("600519.SH", vec![]).with_fundamentals(f);
        let s = FundamentalQuality.calculate_score(&b, &ModuleOptions::new());
        assert_eq!(s.score(), 0.0);
        assert_eq!(s.detail_f64("cash_conversion_score"), Some(0.0));
    }

    #[test]
    fn test_heavy_debt_scores_zero_on_debt() {
        let f = Fundamentals {
            debt_ratio: Some(75.0),
            ..Default::default()
        };
        let b = bundle("600519.SH", vec![]).with_fundamentals(f);
        let s = FundamentalQuality.calculate_score(&b, &ModuleOptions::new());
        assert_eq!(s.detail_f64("debt_score"), Some(0.0));
    }

    #[test]
    fn test_stale_report_halves_confidence() {
        let candles = trending_candles(30, 10.0, 0.1);
        let mut b = bundle("600519.SH", candles).with_fundamentals(strong());
        b.as_of = date(800);
        let s = FundamentalQuality.calculate_score(&b, &ModuleOptions::new());
        assert_eq!(s.confidence(), 0.5);
        assert_eq!(s.detail("stale_report").unwrap(), &serde_json::json!(true));

        let lenient = ModuleOptions::new().with("max_report_age_days", 1000);
        let s = FundamentalQuality.calculate_score(&b, &lenient);
        assert_eq!(s.confidence(), 1.0);
    }

    #[test]
    fn test_report_after_as_of_is_not_used() {
        let mut f = strong();
        f.roe = Some(25.0);
        f.period_end = Some(date(400));
        let mut b = bundle("600519.SH", trending_candles(30, 10.0, 0.1)).with_fundamentals(f);
        b.as_of = date(100);

        let s = FundamentalQuality.calculate_score(&b, &ModuleOptions::new());
        assert!(s.is_fallback());
        assert_eq!(s.fallback_reason(), Some("future_report"));
        assert_eq!(s.score(), 50.0);
        assert_eq!(s.confidence(), 0.0);
        assert_eq!(
            s.detail("report_period_end").unwrap(),
            &serde_json::json!(date(400).to_string())
        );

        // Period ending on as_of is usable
        b.as_of = date(400);
        let s = FundamentalQuality.calculate_score(&b, &ModuleOptions::new());
        assert!(!s.is_fallback());
        assert_eq!(s.detail_f64("report_age_days"), Some(0.0));
    }

    #[test]
    fn test_non_finite_metrics_count_as_missing() {
        let mut f = strong();
        f.roe = Some(f64::NAN);
        f.net_profit = Some(f64::INFINITY);
        let b = bundle("600519.SH", trending_candles(30, 10.0, 0.1)).with_fundamentals(f);
        let s = FundamentalQuality.calculate_score(&b, &ModuleOptions::new());
        assert_eq!(s.score(), 100.0);
        assert!((s.confidence() - 0.6).abs() < 1e-12);
        assert!(s.detail("roe_score").is_none());
    }
}
