//! Regime (chop) guard.
//!
//! Sideways markets produce trend flips without follow-through. When the
//! recent window looks like chop, a symbol only survives if it is already
//! pressing against the top of its channel.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use super::config::RegimeConfig;
use crate::data::Bar;
use crate::indicators::IndicatorSnapshot;

/// Measurements over the guard window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeReading {
    /// Trend direction changes inside the window
    pub flips: usize,
    /// Mean (upper − lower) / mid of the volatility band
    pub mean_width: f64,
    /// last / close[last − W] − 1
    pub slope: f64,
}

/// Chop detector.
#[derive(Debug, Clone)]
pub struct RegimeGuard {
    config: RegimeConfig,
}

impl RegimeGuard {
    pub fn new(config: RegimeConfig) -> Self {
        Self { config }
    }

    /// Whether a reading meets all three chop conditions.
    pub fn is_chop(&self, reading: &RegimeReading) -> bool {
        reading.mean_width <= self.config.width_ceiling
            && reading.slope.abs() <= self.config.slope_ceiling
            && reading.flips >= self.config.min_flips
    }

    /// Measure the window; `None` when any input is too short to judge.
    pub fn read(&self, bars: &[Bar], snapshots: &[IndicatorSnapshot]) -> Option<RegimeReading> {
        let w = self.config.lookback;
        let n = snapshots.len();
        if w == 0 || n < 2 || bars.len() < w + 1 {
            return None;
        }

        let flips = (n.saturating_sub(w).max(1)..n)
            .filter(|&i| snapshots[i].trend.is_up() != snapshots[i - 1].trend.is_up())
            .count();

        let widths: Vec<f64> = snapshots[n.saturating_sub(w)..]
            .iter()
            .filter_map(|s| s.volatility?.relative_width())
            .collect();
        if widths.is_empty() {
            return None;
        }
        let mean_width = widths.iter().mean();

        let last = bars[bars.len() - 1].close;
        let prev = bars[bars.len() - 1 - w].close;
        if prev == 0.0 {
            return None;
        }

        Some(RegimeReading {
            flips,
            mean_width,
            slope: last / prev - 1.0,
        })
    }

    /// Whether the symbol is rejected as chop without breakout proximity.
    ///
    /// Never rejects when disabled or when the window cannot be measured.
    pub fn rejects(&self, bars: &[Bar], snapshots: &[IndicatorSnapshot]) -> bool {
        if !self.config.enabled {
            return false;
        }
        let Some(reading) = self.read(bars, snapshots) else {
            return false;
        };
        if !self.is_chop(&reading) {
            return false;
        }

        let (Some(last_bar), Some(last_snap)) = (bars.last(), snapshots.last()) else {
            return false;
        };
        match last_snap.channel.upper {
            Some(upper) => last_bar.close < upper * (1.0 - self.config.breakout_slack_pct / 100.0),
            None => true,
        }
    }
}
