//! Channel and volatility bands.

use statrs::statistics::Statistics;

use super::{ChannelValue, VolatilityBand};
use crate::data::Bar;

/// Donchian channel over the `period` bars before each bar.
///
/// The current bar is excluded so a breakout close can sit above the upper
/// bound.
pub fn donchian_prior(bars: &[Bar], period: usize) -> Vec<ChannelValue> {
    let mut out = vec![ChannelValue::default(); bars.len()];
    if period == 0 {
        return out;
    }
    for i in period..bars.len() {
        let window = &bars[i - period..i];
        out[i] = ChannelValue {
            upper: window.iter().map(|b| b.high).reduce(f64::max),
            lower: window.iter().map(|b| b.low).reduce(f64::min),
        };
    }
    out
}

/// Bollinger bands: SMA ± `mult` population standard deviations.
pub fn bollinger(closes: &[f64], period: usize, mult: f64) -> Vec<Option<VolatilityBand>> {
    let mut out = vec![None; closes.len()];
    if period == 0 {
        return out;
    }
    for i in period.saturating_sub(1)..closes.len() {
        let window = &closes[i + 1 - period..=i];
        let mid = window.iter().mean();
        let sd = window.iter().population_std_dev();
        out[i] = Some(VolatilityBand {
            upper: mid + mult * sd,
            lower: mid - mult * sd,
            mid,
        });
    }
    out
}
