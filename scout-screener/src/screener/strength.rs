//! Relative-strength returns.

use crate::data::Bar;

/// Return over the last `lookback` bars: `last / past − 1`.
///
/// `None` when the sequence is not longer than `lookback` or the past close
/// is not positive.
pub fn lookback_return(bars: &[Bar], lookback: usize) -> Option<f64> {
    if bars.len() <= lookback {
        return None;
    }
    let last = bars.last()?.close;
    let past = bars[bars.len() - 1 - lookback].close;
    if past <= 0.0 {
        return None;
    }
    Some(last / past - 1.0)
}
