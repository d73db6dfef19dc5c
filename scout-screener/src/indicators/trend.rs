//! Moving averages, MACD, ATR and SuperTrend.

use super::{Series, TrendBand};
use crate::data::Bar;

/// Recursive smoothing with the given alpha, seeded by the SMA of the first
/// `period` consecutive defined values.
fn smooth(values: &[Option<f64>], period: usize, alpha: f64) -> Series {
    let n = values.len();
    let mut out = vec![None; n];
    if period == 0 || n < period {
        return out;
    }

    let mut run = 0;
    let mut seed_end = None;
    for (i, v) in values.iter().enumerate() {
        if v.is_some() {
            run += 1;
            if run == period {
                seed_end = Some(i);
                break;
            }
        } else {
            run = 0;
        }
    }
    let Some(end) = seed_end else {
        return out;
    };

    let seed: f64 = values[end + 1 - period..=end].iter().flatten().sum::<f64>() / period as f64;
    out[end] = Some(seed);

    let mut prev = seed;
    for i in end + 1..n {
        let Some(v) = values[i] else {
            break;
        };
        prev = alpha * v + (1.0 - alpha) * prev;
        out[i] = Some(prev);
    }
    out
}

/// Simple moving average; defined where the whole window is defined.
pub fn sma(values: &[Option<f64>], period: usize) -> Series {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    for i in period.saturating_sub(1)..values.len() {
        let window = &values[i + 1 - period..=i];
        if window.iter().all(Option::is_some) {
            out[i] = Some(window.iter().flatten().sum::<f64>() / period as f64);
        }
    }
    out
}

/// Exponential moving average, alpha = 2 / (period + 1).
pub fn ema(values: &[Option<f64>], period: usize) -> Series {
    smooth(values, period, 2.0 / (period as f64 + 1.0))
}

/// Wilder smoothing, alpha = 1 / period.
pub fn wilder(values: &[Option<f64>], period: usize) -> Series {
    if period == 0 {
        return vec![None; values.len()];
    }
    smooth(values, period, 1.0 / period as f64)
}

/// MACD line and signal line.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> (Series, Series) {
    let input: Series = closes.iter().copied().map(Some).collect();
    let fast = ema(&input, fast);
    let slow = ema(&input, slow);
    let line: Series = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal = ema(&line, signal);
    (line, signal)
}

/// True range; the first bar uses high − low.
pub fn true_range(bars: &[Bar]) -> Series {
    bars.iter()
        .enumerate()
        .map(|(i, b)| {
            let hl = b.high - b.low;
            Some(match i.checked_sub(1).map(|p| bars[p].close) {
                Some(pc) => hl.max((b.high - pc).abs()).max((b.low - pc).abs()),
                None => hl,
            })
        })
        .collect()
}

/// SuperTrend over Wilder ATR.
///
/// Final bands only tighten while price stays inside them. Direction starts
/// up when the first close sits at or above the bar midpoint, flips down on
/// a close below the lower band and up on a close above the upper band.
pub fn supertrend(bars: &[Bar], period: usize, multiplier: f64) -> Vec<TrendBand> {
    let n = bars.len();
    let mut out = vec![TrendBand::default(); n];
    let atr = wilder(&true_range(bars), period);

    let Some(start) = atr.iter().position(Option::is_some) else {
        return out;
    };

    let mut upper = f64::NAN;
    let mut lower = f64::NAN;
    let mut up = true;

    for i in start..n {
        let Some(atr_i) = atr[i] else {
            break;
        };
        let mid = bars[i].midpoint();
        let basic_upper = mid + multiplier * atr_i;
        let basic_lower = mid - multiplier * atr_i;
        let close = bars[i].close;

        if i == start {
            upper = basic_upper;
            lower = basic_lower;
            up = close >= mid;
        } else {
            let prev_close = bars[i - 1].close;
            upper = if prev_close <= upper { basic_upper.min(upper) } else { basic_upper };
            lower = if prev_close >= lower { basic_lower.max(lower) } else { basic_lower };

            if up && close < lower {
                up = false;
            } else if !up && close > upper {
                up = true;
            }
        }

        out[i] = if up {
            TrendBand { value: Some(lower), upper: None, lower: Some(lower) }
        } else {
            TrendBand { value: Some(upper), upper: Some(upper), lower: None }
        };
    }
    out
}
