//! RSI and Stochastic RSI.

use super::trend::{sma, wilder};
use super::Series;

/// Wilder RSI on a 0-100 scale; 100 when there are no losses.
pub fn rsi(closes: &[f64], period: usize) -> Series {
    let mut gains = vec![None; closes.len()];
    let mut losses = vec![None; closes.len()];
    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        gains[i] = Some(change.max(0.0));
        losses[i] = Some((-change).max(0.0));
    }

    let avg_gain = wilder(&gains, period);
    let avg_loss = wilder(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(g, l)| {
            let (g, l) = ((*g)?, (*l)?);
            Some(if l == 0.0 { 100.0 } else { 100.0 - 100.0 / (1.0 + g / l) })
        })
        .collect()
}

/// Stochastic RSI: %K and %D on a 0-100 scale.
///
/// Raw stochastic is 0 when the RSI window is flat; %K is its SMA over
/// `k_smooth` and %D the SMA of %K over `d_smooth`.
pub fn stoch_rsi(
    closes: &[f64],
    rsi_period: usize,
    stoch_period: usize,
    k_smooth: usize,
    d_smooth: usize,
) -> (Series, Series) {
    let rsi = rsi(closes, rsi_period);
    let mut raw = vec![None; closes.len()];

    if stoch_period > 0 {
        for i in stoch_period.saturating_sub(1)..rsi.len() {
            let window = &rsi[i + 1 - stoch_period..=i];
            if window.iter().any(Option::is_none) {
                continue;
            }
            let (lo, hi) = window
                .iter()
                .flatten()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            let current = rsi[i].unwrap_or(lo);
            raw[i] = Some(if hi - lo == 0.0 { 0.0 } else { (current - lo) / (hi - lo) * 100.0 });
        }
    }

    let k = sma(&raw, k_smooth);
    let d = sma(&k, d_smooth);
    (k, d)
}
