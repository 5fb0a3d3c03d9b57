//! Input data for the scoring core.
//!
//! The data-collection layer assembles one [`SeriesBundle`] per instrument
//! before the engine is invoked. Nothing in this crate fetches data; bundles
//! are built in memory or read from JSON files by the CLI.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use zero_common::error::{Error, Result, ResultExt};

// ============================================================================
// Core Data Types
// ============================================================================

/// One daily bar. Prices are in the instrument's quote currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Shares traded
    pub volume: f64,
    /// Turnover; optional in bundle files
    #[serde(default)]
    pub amount: f64,
}

impl Candle {
    /// Closed above its open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Closed below its open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Distance between open and close.
    pub fn body_size(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// High above the top of the body.
    pub fn upper_wick(&self) -> f64 {
        self.high - self.body_top()
    }

    /// Low below the bottom of the body.
    pub fn lower_wick(&self) -> f64 {
        self.body_bottom() - self.low
    }

    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }
}

/// One ETF holdings-membership record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtfHolding {
    /// ETF code (e.g., "510300.SH")
    pub etf_code: String,
    /// Held instrument (e.g., "600519.SH")
    pub symbol: String,
    /// Weight of the instrument inside the ETF (%)
    pub weight_pct: f64,
    /// Disclosure date of the holding
    pub as_of: NaiveDate,
}

impl EtfHolding {
    pub fn new(
        etf_code: impl Into<String>,
        symbol: impl Into<String>,
        weight_pct: f64,
        as_of: NaiveDate,
    ) -> Self {
        Self {
            etf_code: etf_code.into(),
            symbol: symbol.into(),
            weight_pct,
            as_of,
        }
    }
}

/// Latest reported fundamentals. Every field is optional; providers differ
/// in coverage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    /// Report period end
    #[serde(default)]
    pub period_end: Option<NaiveDate>,
    /// Return on equity (%)
    #[serde(default)]
    pub roe: Option<f64>,
    /// Gross margin (%)
    #[serde(default)]
    pub gross_margin: Option<f64>,
    /// Total liabilities / total assets (%)
    #[serde(default)]
    pub debt_ratio: Option<f64>,
    /// Operating cash flow
    #[serde(default)]
    pub operating_cash_flow: Option<f64>,
    /// Net profit attributable to shareholders
    #[serde(default)]
    pub net_profit: Option<f64>,
    /// Revenue growth year-over-year (%)
    #[serde(default)]
    pub revenue_growth: Option<f64>,
}

// ============================================================================
// Series Bundle
// ============================================================================

/// Everything the modules may look at for one instrument on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesBundle {
    /// Instrument symbol (e.g., "600519.SH")
    pub symbol: String,
    /// Evaluation date; candles and holdings after it are ignored
    pub as_of: NaiveDate,
    /// Daily candles, oldest first
    #[serde(default)]
    pub candles: Vec<Candle>,
    /// Benchmark index candles, oldest first
    #[serde(default)]
    pub benchmark: Option<Vec<Candle>>,
    /// ETF holdings records. `None` means the data was not collected,
    /// `Some(vec![])` means no ETF holds the instrument.
    #[serde(default)]
    pub etf_holdings: Option<Vec<EtfHolding>>,
    /// Latest fundamentals
    #[serde(default)]
    pub fundamentals: Option<Fundamentals>,
}

impl SeriesBundle {
    pub fn new(symbol: impl Into<String>, as_of: NaiveDate, candles: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            as_of,
            candles,
            benchmark: None,
            etf_holdings: None,
            fundamentals: None,
        }
    }

    pub fn with_benchmark(mut self, benchmark: Vec<Candle>) -> Self {
        self.benchmark = Some(benchmark);
        self
    }

    pub fn with_etf_holdings(mut self, holdings: Vec<EtfHolding>) -> Self {
        self.etf_holdings = Some(holdings);
        self
    }

    pub fn with_fundamentals(mut self, fundamentals: Fundamentals) -> Self {
        self.fundamentals = Some(fundamentals);
        self
    }

    /// Candles up to and including `as_of`.
    pub fn history(&self) -> &[Candle] {
        point_in_time(&self.candles, self.as_of)
    }

    /// Benchmark candles up to and including `as_of`.
    pub fn benchmark_history(&self) -> Option<&[Candle]> {
        self.benchmark
            .as_deref()
            .map(|candles| point_in_time(candles, self.as_of))
    }

    /// Close prices up to `as_of`.
    pub fn closes(&self) -> Vec<f64> {
        self.history().iter().map(|c| c.close).collect()
    }

    /// Volumes up to `as_of`.
    pub fn volumes(&self) -> Vec<f64> {
        self.history().iter().map(|c| c.volume).collect()
    }

    /// Holdings records for this instrument disclosed on or before `as_of`.
    ///
    /// Returns `None` when holdings data was not supplied at all.
    pub fn holdings(&self) -> Option<Vec<&EtfHolding>> {
        self.etf_holdings.as_ref().map(|records| {
            records
                .iter()
                .filter(|h| h.symbol == self.symbol && h.as_of <= self.as_of)
                .collect()
        })
    }
}

fn point_in_time(candles: &[Candle], as_of: NaiveDate) -> &[Candle] {
    let end = candles.partition_point(|c| c.date <= as_of);
    &candles[..end]
}

// ============================================================================
// Loading
// ============================================================================

/// Read one bundle from a JSON file.
pub fn load_bundle(path: &Path) -> Result<SeriesBundle> {
    let content = std::fs::read_to_string(path).context(format!("reading {}", path.display()))?;
    let bundle: SeriesBundle =
        serde_json::from_str(&content).context(format!("parsing {}", path.display()))?;

    if bundle.symbol.trim().is_empty() {
        return Err(Error::InvalidBundle(format!(
            "{}: bundle has an empty symbol",
            path.display()
        )));
    }
    if bundle.candles.windows(2).any(|w| w[0].date > w[1].date) {
        return Err(Error::InvalidBundle(format!(
            "{}: candles for {} are not ordered oldest to newest",
            path.display(),
            bundle.symbol
        )));
    }

    Ok(bundle)
}

/// Read several bundle files. A JSON array of bundles in one file is also accepted.
pub fn load_bundles(paths: &[impl AsRef<Path>]) -> Result<Vec<SeriesBundle>> {
    let mut bundles = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).context(format!("reading {}", path.display()))?;
        if content.trim_start().starts_with('[') {
            let many: Vec<SeriesBundle> =
                serde_json::from_str(&content).context(format!("parsing {}", path.display()))?;
            bundles.extend(many);
        } else {
            bundles.push(load_bundle(path)?);
        }
    }
    Ok(bundles)
}
