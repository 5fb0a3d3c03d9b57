//! Technical indicators shared by the signal modules.
//!
//! All functions are pure and return `None` when the input is too short,
//! so callers can turn a shortfall into a zero-confidence fallback.

use statrs::statistics::Statistics;

use crate::data::Candle;

/// Simple moving average of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    sma_ending(values, period, 0)
}

/// Simple moving average of the `period` values ending `offset` bars before the last one.
pub fn sma_ending(values: &[f64], period: usize, offset: usize) -> Option<f64> {
    if period == 0 || values.len() < period + offset {
        return None;
    }
    let end = values.len() - offset;
    Some(values[end - period..end].iter().mean())
}

/// Exponential moving average series, seeded with the first value.
///
/// Output has the same length as the input.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let alpha = 2.0 / (period.max(1) as f64 + 1.0);

    let mut out = Vec::with_capacity(values.len());
    let mut prev = first;
    out.push(prev);
    for &v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Wilder RSI over the whole series. Needs at least `period + 1` closes.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / period as f64;

    let p = period as f64;
    for &change in &changes[period..] {
        avg_gain = (avg_gain * (p - 1.0) + change.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-change).max(0.0)) / p;
    }

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Average true range of the last `period` bars. Needs `period + 1` candles.
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let start = candles.len() - period - 1;
    let tr_sum: f64 = candles[start..]
        .windows(2)
        .map(|w| {
            let prev = &w[0];
            let curr = &w[1];
            let tr1 = curr.high - curr.low;
            let tr2 = (curr.high - prev.close).abs();
            let tr3 = (curr.low - prev.close).abs();
            tr1.max(tr2).max(tr3)
        })
        .sum();

    Some(tr_sum / period as f64)
}

/// Percentage return over the last `window` bars.
pub fn pct_return(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window + 1 {
        return None;
    }
    let last = *closes.last()?;
    let base = closes[closes.len() - 1 - window];
    if base <= 0.0 {
        return None;
    }
    Some((last / base - 1.0) * 100.0)
}

/// Sample standard deviation of daily percentage returns over the last `window` bars.
pub fn return_volatility(closes: &[f64], window: usize) -> Option<f64> {
    if window < 2 || closes.len() < window + 1 {
        return None;
    }
    let tail = &closes[closes.len() - window - 1..];
    let returns: Vec<f64> = tail
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] / w[0] - 1.0) * 100.0)
        .collect();
    if returns.len() < 2 {
        return None;
    }
    Some(returns.iter().std_dev())
}

/// Position of `value` between `lo` and `hi`, clamped to [0, 1].
pub fn unit_scale(value: f64, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return if value >= hi { 1.0 } else { 0.0 };
    }
    ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
}
