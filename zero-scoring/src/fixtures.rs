//! Deterministic candle generators for unit tests.

use chrono::{Duration, NaiveDate};

use crate::data::{Candle, SeriesBundle};

pub fn date(offset_days: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset_days)
}

/// Simple deterministic pseudo-random number generator (0.0 to 1.0)
pub fn rand_simple(seed: u64) -> f64 {
    let x = seed.wrapping_mul(0x5DEECE66D).wrapping_add(0xB);
    (x % 1000) as f64 / 1000.0
}

/// Candles whose opens are the previous close, with a 0.5% wick on both sides.
pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                date: date(i as i64),
                open,
                high: open.max(close) * 1.005,
                low: open.min(close) * 0.995,
                close,
                volume: 1_000_000.0 + rand_simple(i as u64 + 300) * 200_000.0,
                amount: 0.0,
            }
        })
        .collect()
}

/// Geometric trend of `daily_pct` per bar with a small deterministic wiggle.
pub fn trending_closes(count: usize, start: f64, daily_pct: f64) -> Vec<f64> {
    let mut price = start;
    (0..count)
        .map(|i| {
            let wiggle = (rand_simple(i as u64) - 0.5) * 0.004;
            price *= 1.0 + daily_pct / 100.0 + wiggle;
            price
        })
        .collect()
}

pub fn trending_candles(count: usize, start: f64, daily_pct: f64) -> Vec<Candle> {
    candles_from_closes(&trending_closes(count, start, daily_pct))
}

/// Bundle evaluated on the date of its last candle.
pub fn bundle(symbol: &str, candles: Vec<Candle>) -> SeriesBundle {
    let as_of = candles.last().map(|c| c.date).unwrap_or_else(|| date(0));
    SeriesBundle::new(symbol, as_of, candles)
}
