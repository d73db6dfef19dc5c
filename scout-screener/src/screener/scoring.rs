//! Composite scorer.
//!
//! Only gate-passing symbols reach the scorer. Each rule contributes up to
//! its configured weight; a freshness bonus rewards momentum that is still
//! building.

use serde::{Deserialize, Serialize};

use super::config::ScoreWeights;
use super::gate::GateMetrics;
use crate::data::Bar;
use crate::indicators::IndicatorSnapshot;

/// Momentum diff as a fraction of price that earns the full scaled half.
const MOMENTUM_FULL_PCT: f64 = 0.002;
/// Return differential that earns the full relative-strength weight.
const RS_FULL_DIFF: f64 = 0.10;
/// Differentials below this score nothing.
const RS_MIN_DIFF: f64 = 0.01;
/// Share of the momentum and trend weights paid as freshness bonus.
const FRESHNESS_SHARE: f64 = 0.20;

/// Oscillator fast value (0-1) mapped to a score factor.
///
/// Rises linearly through the 0.20-0.80 band, then flattens at 0.8 and drops
/// to 0.6 above 0.90 where the market is overbought.
pub fn oscillator_band_factor(k: f64) -> f64 {
    if k <= 0.20 {
        0.0
    } else if k < 0.80 {
        (k - 0.20) / 0.60
    } else if k < 0.90 {
        0.8
    } else {
        0.6
    }
}

/// Freshness signals over the last two bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Freshness {
    /// MACD histogram grew on the last bar
    pub momentum_rising: bool,
    /// Close above the trend line on both of the last two bars
    pub above_trend: bool,
}

impl Freshness {
    pub fn detect(bars: &[Bar], snapshots: &[IndicatorSnapshot]) -> Self {
        let n = bars.len().min(snapshots.len());
        if n < 2 {
            return Self::default();
        }
        let (bars, snaps) = (&bars[bars.len() - 2..], &snapshots[snapshots.len() - 2..]);

        let hist = |s: &IndicatorSnapshot| s.momentum.map(|m| m.diff()).unwrap_or(0.0);
        let above = |b: &Bar, s: &IndicatorSnapshot| s.trend.value.is_some_and(|v| b.close > v);

        Self {
            momentum_rising: hist(&snaps[1]) > hist(&snaps[0]),
            above_trend: above(&bars[0], &snaps[0]) && above(&bars[1], &snaps[1]),
        }
    }
}

/// Weighted rule scorer.
#[derive(Debug, Clone)]
pub struct CompositeScorer {
    weights: ScoreWeights,
}

impl CompositeScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Score before the freshness bonus, in `[0, weights.total()]`.
    pub fn base_score(&self, m: &GateMetrics, close: f64) -> f64 {
        let w = &self.weights;
        let mut score = 0.0;

        let momentum_norm = if close > 0.0 {
            (m.momentum_diff / close / MOMENTUM_FULL_PCT).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if m.momentum_up {
            score += 0.5 * w.momentum;
        }
        score += momentum_norm * 0.5 * w.momentum;

        if m.trend_up {
            score += w.trend;
        }

        if m.not_near_lower {
            score += w.channel * if m.near_upper { 1.0 } else { 0.6 };
        }

        if m.oscillator_ok {
            if let Some(k) = m.oscillator_fast {
                score += w.oscillator * oscillator_band_factor(k);
            }
        }

        if m.return_diff >= RS_MIN_DIFF {
            score += w.relative_strength * (m.return_diff / RS_FULL_DIFF).clamp(0.0, 1.0);
        }

        score
    }

    /// Bonus for building momentum, at most 20% of momentum + trend weights.
    pub fn freshness_bonus(&self, freshness: &Freshness) -> f64 {
        let mut bonus = 0.0;
        if freshness.momentum_rising {
            bonus += FRESHNESS_SHARE * self.weights.momentum;
        }
        if freshness.above_trend {
            bonus += FRESHNESS_SHARE * self.weights.trend;
        }
        bonus
    }

    /// Final score rounded to two decimals.
    pub fn score(&self, m: &GateMetrics, close: f64, freshness: &Freshness) -> f64 {
        round2(self.base_score(m, close) + self.freshness_bonus(freshness))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
