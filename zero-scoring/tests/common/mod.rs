//! Shared synthetic data for integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use zero_scoring::{Candle, EtfHolding, Fundamentals, SeriesBundle};

pub fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + Duration::days(offset)
}

/// Deterministic wiggle in [-1, 1) from a seed.
pub fn wiggle(seed: u64) -> f64 {
    let x = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    ((x >> 33) % 2000) as f64 / 1000.0 - 1.0
}

/// Candles following `daily_pct` drift with a deterministic wiggle of `noise_pct`.
pub fn candles(count: usize, start: f64, daily_pct: f64, noise_pct: f64) -> Vec<Candle> {
    let mut close = start;
    (0..count)
        .map(|i| {
            let open = close;
            close = open * (1.0 + (daily_pct + wiggle(i as u64) * noise_pct) / 100.0);
            Candle {
                date: day(i as i64),
                open,
                high: open.max(close) * 1.004,
                low: open.min(close) * 0.996,
                close,
                volume: 2_000_000.0 * (1.0 + 0.3 * wiggle(i as u64 + 7919)),
                amount: 0.0,
            }
        })
        .collect()
}

pub fn quality_fundamentals() -> Fundamentals {
    Fundamentals {
        period_end: Some(day(200)),
        roe: Some(19.0),
        gross_margin: Some(42.0),
        debt_ratio: Some(35.0),
        operating_cash_flow: Some(1.1e9),
        net_profit: Some(1.0e9),
        revenue_growth: Some(15.0),
    }
}

/// A fully populated bundle evaluated on its last candle.
pub fn full_bundle(symbol: &str, daily_pct: f64) -> SeriesBundle {
    let candles = candles(260, 30.0, daily_pct, 0.8);
    let as_of = candles[candles.len() - 1].date;
    SeriesBundle::new(symbol, as_of, candles)
        .with_benchmark(self::candles(260, 3500.0, 0.02, 0.5))
        .with_etf_holdings(vec![
            EtfHolding::new("510300.SH", symbol, 5.5, day(150)),
            EtfHolding::new("510050.SH", symbol, 7.2, day(150)),
            EtfHolding::new("512100.SH", symbol, 1.1, day(150)),
        ])
        .with_fundamentals(quality_fundamentals())
}
