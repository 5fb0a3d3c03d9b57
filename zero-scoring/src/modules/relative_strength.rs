//! Relative-strength module (Structural layer).
//!
//! Blends three components into a 0-100 score:
//!
//! | Component       | Points | Source                                   |
//! |-----------------|--------|------------------------------------------|
//! | RSI             | 0-40   | Wilder RSI, healthy zone 50-70 scores max |
//! | Trailing return | 0-55   | -20% → 0, +30% → 55, excess over benchmark on the same dates when supplied |
//! | ETF preference  | 0-5    | Step function of major-weight ETF memberships |

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{history_confidence, ModuleKind, ModuleOptions, ModuleScore, SignalModule};
use crate::data::{Candle, EtfHolding, SeriesBundle};
use crate::indicators::{pct_return, rsi, unit_scale};

const RSI_MAX_POINTS: f64 = 40.0;
const RETURN_MAX_POINTS: f64 = 55.0;

/// Default weight (%) at which an ETF membership counts as major.
pub const DEFAULT_MAJOR_WEIGHT_PCT: f64 = 5.0;

/// ETF-preference evaluation for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EtfPreference {
    /// Preference points (0, 1, 3 or 5)
    pub score: f64,
    /// Distinct ETFs holding the instrument
    pub etf_count: usize,
    /// ETFs holding it at or above the major threshold
    pub high_weight_count: usize,
    /// Largest weight across ETFs (%)
    pub max_weight: f64,
}

/// Score ETF memberships.
///
/// Records are collapsed per ETF to the latest disclosure. Then:
/// no membership → 0; only minor memberships → 1; one or two major → 3;
/// three or more major → 5.
pub fn etf_preference(holdings: &[&EtfHolding], major_weight_pct: f64) -> EtfPreference {
    let mut latest: BTreeMap<&str, &EtfHolding> = BTreeMap::new();
    for &h in holdings {
        latest
            .entry(h.etf_code.as_str())
            .and_modify(|cur| {
                if h.as_of > cur.as_of || (h.as_of == cur.as_of && h.weight_pct > cur.weight_pct) {
                    *cur = h;
                }
            })
            .or_insert(h);
    }

    let etf_count = latest.len();
    let high_weight_count = latest
        .values()
        .filter(|h| h.weight_pct >= major_weight_pct)
        .count();
    let max_weight = latest.values().map(|h| h.weight_pct).fold(0.0, f64::max);

    let score = match (etf_count, high_weight_count) {
        (0, _) => 0.0,
        (_, 0) => 1.0,
        (_, 1..=2) => 3.0,
        _ => 5.0,
    };

    EtfPreference {
        score,
        etf_count,
        high_weight_count,
        max_weight,
    }
}

/// Points for an RSI reading. Momentum without overextension scores best.
fn rsi_points(rsi: f64) -> f64 {
    match rsi {
        r if r < 30.0 => 5.0,
        r if r < 40.0 => 5.0 + (r - 30.0) * 2.0,
        r if r < 50.0 => 25.0 + (r - 40.0) * 1.5,
        r if r <= 70.0 => RSI_MAX_POINTS,
        r if r < 80.0 => RSI_MAX_POINTS - (r - 70.0) * 2.0,
        _ => 10.0,
    }
}

fn return_points(return_pct: f64) -> f64 {
    unit_scale(return_pct, -20.0, 30.0) * RETURN_MAX_POINTS
}

/// Close of the bar dated exactly `date`. `candles` must be in date order.
fn close_on(candles: &[Candle], date: NaiveDate) -> Option<f64> {
    let i = candles.partition_point(|c| c.date < date);
    candles.get(i).filter(|c| c.date == date).map(|c| c.close)
}

/// Percent return of `candles` between two dates; `None` if either bar is missing.
fn return_between(candles: &[Candle], start: NaiveDate, end: NaiveDate) -> Option<f64> {
    let base = close_on(candles, start)?;
    let last = close_on(candles, end)?;
    (base > 0.0 && last.is_finite()).then(|| (last / base - 1.0) * 100.0)
}

/// Relative-strength module.
pub struct RelativeStrength;

impl SignalModule for RelativeStrength {
    fn kind(&self) -> ModuleKind {
        ModuleKind::RelativeStrength
    }

    fn option_keys(&self) -> &'static [&'static str] {
        &[
            "rsi_period",
            "return_window",
            "major_weight_pct",
            "missing_holdings_confidence",
        ]
    }

    fn calculate_score(&self, series: &SeriesBundle, options: &ModuleOptions) -> ModuleScore {
        let kind = self.kind();
        let rsi_period = options.usize_or("rsi_period", 14).max(1);
        let return_window = options.usize_or("return_window", 60).max(1);
        let major_weight_pct = options.f64_or("major_weight_pct", DEFAULT_MAJOR_WEIGHT_PCT);
        let missing_holdings_confidence = options
            .f64_or("missing_holdings_confidence", 0.8)
            .clamp(0.0, 1.0);

        let closes = series.closes();
        let min_bars = rsi_period + 1;
        if closes.len() < min_bars {
            return ModuleScore::insufficient_history(kind, closes.len(), min_bars);
        }

        let Some(rsi_value) = rsi(&closes, rsi_period) else {
            return ModuleScore::insufficient_history(kind, closes.len(), min_bars);
        };
        let rsi_score = rsi_points(rsi_value);

        // Short history shrinks the window instead of abandoning the component
        let window = return_window.min(closes.len() - 1);
        let Some(own_return) = pct_return(&closes, window) else {
            return ModuleScore::fallback(kind, "non_positive_prices");
        };

        let history = series.history();
        let n = history.len();
        let benchmark_return = series.benchmark_history().and_then(|bench| {
            return_between(bench, history[n - 1 - window].date, history[n - 1].date)
        });
        let (trailing_return, basis) = match benchmark_return {
            Some(b) => (own_return - b, "excess"),
            None => (own_return, "absolute"),
        };
        let return_score = return_points(trailing_return);

        let mut confidence =
            history_confidence(closes.len(), min_bars, return_window.saturating_add(1));

        let (preference, holdings_state) = match series.holdings() {
            Some(records) => (etf_preference(&records, major_weight_pct), "supplied"),
            None => {
                confidence *= missing_holdings_confidence;
                (etf_preference(&[], major_weight_pct), "missing")
            }
        };

        let score = rsi_score + return_score + preference.score;

        ModuleScore::new(kind, score, confidence)
            .with_detail("rsi", rsi_value)
            .with_detail("rsi_score", rsi_score)
            .with_detail("trailing_return_pct", trailing_return)
            .with_detail("return_basis", basis)
            .with_detail("return_window", window)
            .with_detail("return_score", return_score)
            .with_detail("etf_preference_score", preference.score)
            .with_detail("etf_count", preference.etf_count)
            .with_detail("high_weight_count", preference.high_weight_count)
            .with_detail("max_weight", preference.max_weight)
            .with_detail("etf_holdings", holdings_state)
    }
}
