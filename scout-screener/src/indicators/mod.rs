//! Technical indicator computation.
//!
//! Turns a bar sequence into one [`IndicatorSnapshot`] per bar. Every
//! indicator leaves its fields empty during its own warm-up, so early
//! snapshots are partially populated.
//!
//! # Indicators
//! - **MACD**: EMA fast − EMA slow, with an EMA signal line
//! - **SuperTrend**: Wilder ATR bands with a directional state
//! - **Donchian**: highest high / lowest low over the prior N bars
//! - **StochRSI**: Wilder RSI fed through a stochastic, smoothed %K and %D
//! - **Bollinger**: SMA ± k population standard deviations

mod bands;
mod oscillator;
mod trend;

pub use bands::{bollinger, donchian_prior};
pub use oscillator::{rsi, stoch_rsi};
pub use trend::{ema, macd, sma, supertrend, true_range, wilder};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::Bar;

/// A series aligned to bars; `None` where the value is undefined.
pub type Series = Vec<Option<f64>>;

// ============================================================================
// Snapshot Types
// ============================================================================

/// MACD line and signal line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentumValue {
    pub line: f64,
    pub signal: f64,
}

impl MomentumValue {
    /// Line minus signal (the histogram).
    pub fn diff(&self) -> f64 {
        self.line - self.signal
    }
}

/// SuperTrend state for one bar.
///
/// In an uptrend only `lower` (support) is populated; in a downtrend only
/// `upper` (resistance). `value` is whichever band is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendBand {
    pub value: Option<f64>,
    pub upper: Option<f64>,
    pub lower: Option<f64>,
}

impl TrendBand {
    /// Uptrend state: support line present, resistance absent.
    pub fn is_up(&self) -> bool {
        self.lower.is_some() && self.upper.is_none()
    }
}

/// Donchian channel bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelValue {
    pub upper: Option<f64>,
    pub lower: Option<f64>,
}

/// Oscillator pair with the top of the range it was computed on.
///
/// `scale` is 100 for percent readings (StochRSI) and 1 for unit readings.
/// Both lines share it, so they are always normalized together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorValue {
    pub fast: f64,
    pub slow: f64,
    #[serde(default = "default_oscillator_scale")]
    pub scale: f64,
}

fn default_oscillator_scale() -> f64 {
    100.0
}

impl OscillatorValue {
    /// Readings on a 0-100 range.
    pub fn percent(fast: f64, slow: f64) -> Self {
        Self { fast, slow, scale: 100.0 }
    }

    /// Readings on a 0-1 range.
    pub fn unit(fast: f64, slow: f64) -> Self {
        Self { fast, slow, scale: 1.0 }
    }

    /// Fast and slow lines on 0-1.
    pub fn normalized(&self) -> (f64, f64) {
        (self.fast / self.scale, self.slow / self.scale)
    }
}

/// Bollinger band triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityBand {
    pub upper: f64,
    pub lower: f64,
    pub mid: f64,
}

impl VolatilityBand {
    /// (upper − lower) / mid; `None` when mid is zero.
    pub fn relative_width(&self) -> Option<f64> {
        if self.mid == 0.0 {
            return None;
        }
        Some((self.upper - self.lower) / self.mid)
    }
}

/// All indicator values aligned to one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub momentum: Option<MomentumValue>,
    pub trend: TrendBand,
    pub channel: ChannelValue,
    pub oscillator: Option<OscillatorValue>,
    pub volatility: Option<VolatilityBand>,
}

// ============================================================================
// Source Trait
// ============================================================================

/// Indicator computation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("Non-finite bar value at index {index}")]
    NonFinite { index: usize },
}

/// Computes aligned indicator snapshots from bars.
pub trait IndicatorSource: Send + Sync {
    fn compute(&self, bars: &[Bar]) -> Result<Vec<IndicatorSnapshot>, IndicatorError>;
}

/// Indicator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,
    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,
    #[serde(default = "default_supertrend_period")]
    pub supertrend_period: usize,
    #[serde(default = "default_supertrend_multiplier")]
    pub supertrend_multiplier: f64,
    #[serde(default = "default_donchian_period")]
    pub donchian_period: usize,
    #[serde(default = "default_stoch_period")]
    pub rsi_period: usize,
    #[serde(default = "default_stoch_period")]
    pub stoch_period: usize,
    #[serde(default = "default_stoch_smooth")]
    pub stoch_k: usize,
    #[serde(default = "default_stoch_smooth")]
    pub stoch_d: usize,
    #[serde(default = "default_bollinger_period")]
    pub bollinger_period: usize,
    #[serde(default = "default_bollinger_mult")]
    pub bollinger_mult: f64,
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

fn default_supertrend_period() -> usize {
    10
}

fn default_supertrend_multiplier() -> f64 {
    2.0
}

fn default_donchian_period() -> usize {
    20
}

fn default_stoch_period() -> usize {
    14
}

fn default_stoch_smooth() -> usize {
    3
}

fn default_bollinger_period() -> usize {
    20
}

fn default_bollinger_mult() -> f64 {
    2.0
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            supertrend_period: default_supertrend_period(),
            supertrend_multiplier: default_supertrend_multiplier(),
            donchian_period: default_donchian_period(),
            rsi_period: default_stoch_period(),
            stoch_period: default_stoch_period(),
            stoch_k: default_stoch_smooth(),
            stoch_d: default_stoch_smooth(),
            bollinger_period: default_bollinger_period(),
            bollinger_mult: default_bollinger_mult(),
        }
    }
}

impl IndicatorConfig {
    /// Longest of the channel and trend lookbacks.
    pub fn longest_band_period(&self) -> usize {
        self.donchian_period.max(self.supertrend_period)
    }
}

// ============================================================================
// Standard Implementation
// ============================================================================

/// MACD / SuperTrend / Donchian / StochRSI / Bollinger.
#[derive(Debug, Clone, Default)]
pub struct StandardIndicators {
    config: IndicatorConfig,
}

impl StandardIndicators {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }
}

impl IndicatorSource for StandardIndicators {
    fn compute(&self, bars: &[Bar]) -> Result<Vec<IndicatorSnapshot>, IndicatorError> {
        if let Some(index) = bars.iter().position(|b| !b.is_finite()) {
            return Err(IndicatorError::NonFinite { index });
        }

        let c = &self.config;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let (macd_line, macd_signal) = macd(&closes, c.macd_fast, c.macd_slow, c.macd_signal);
        let trend = supertrend(bars, c.supertrend_period, c.supertrend_multiplier);
        let channel = donchian_prior(bars, c.donchian_period);
        let (stoch_k, stoch_d) = stoch_rsi(&closes, c.rsi_period, c.stoch_period, c.stoch_k, c.stoch_d);
        let volatility = bollinger(&closes, c.bollinger_period, c.bollinger_mult);

        Ok(bars
            .iter()
            .enumerate()
            .map(|(i, bar)| IndicatorSnapshot {
                timestamp: bar.timestamp,
                momentum: match (macd_line[i], macd_signal[i]) {
                    (Some(line), Some(signal)) => Some(MomentumValue { line, signal }),
                    _ => None,
                },
                trend: trend[i],
                channel: channel[i],
                oscillator: match (stoch_k[i], stoch_d[i]) {
                    (Some(fast), Some(slow)) => Some(OscillatorValue::percent(fast, slow)),
                    _ => None,
                },
                volatility: volatility[i],
            })
            .collect())
    }
}
