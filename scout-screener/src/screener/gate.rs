//! Hard pass/fail rule gate.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::GateConfig;
use crate::indicators::IndicatorSnapshot;

/// First rule that failed, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateFailure {
    Momentum,
    Trend,
    Channel,
    Other,
}

impl GateFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Momentum => "momentum",
            Self::Trend => "trend",
            Self::Channel => "channel",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule flags and raw differentials for the evaluated bar.
///
/// Built once per evaluation; oscillator values are already on a 0-1 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateMetrics {
    pub momentum_up: bool,
    pub trend_up: bool,
    pub not_near_lower: bool,
    pub near_upper: bool,
    pub oscillator_ok: bool,
    pub relative_strength_ok: bool,
    /// MACD line − signal
    pub momentum_diff: f64,
    pub oscillator_fast: Option<f64>,
    pub oscillator_slow: Option<f64>,
    pub coin_return: Option<f64>,
    /// Coin return − reference return, missing sides taken as 0
    pub return_diff: f64,
}

/// Rule gate.
#[derive(Debug, Clone)]
pub struct RuleGate {
    config: GateConfig,
}

impl RuleGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Evaluate every rule against the last bar.
    pub fn metrics(
        &self,
        close: f64,
        snapshot: &IndicatorSnapshot,
        coin_return: Option<f64>,
        reference_return: Option<f64>,
    ) -> GateMetrics {
        let momentum_diff = snapshot.momentum.map(|m| m.diff()).unwrap_or(0.0);

        let trend = &snapshot.trend;
        let trend_up = trend.value.is_some_and(|v| close > v) || trend.is_up();

        let not_near_lower = snapshot
            .channel
            .lower
            .map_or(true, |lower| close > lower * (1.0 + self.config.lower_block_pct / 100.0));
        let near_upper = snapshot
            .channel
            .upper
            .is_some_and(|upper| close >= upper * (1.0 - self.config.upper_slack_pct / 100.0));

        let normalized = snapshot.oscillator.map(|o| o.normalized());
        let oscillator_ok = normalized
            .is_some_and(|(k, d)| k > d && k > self.config.oscillator_floor);
        let fast = normalized.map(|(k, _)| k);
        let slow = normalized.map(|(_, d)| d);

        let relative_strength_ok = match (coin_return, reference_return) {
            (Some(coin), Some(reference)) => coin > reference,
            _ => false,
        };

        GateMetrics {
            momentum_up: snapshot.momentum.is_some_and(|m| m.line > m.signal),
            trend_up,
            not_near_lower,
            near_upper,
            oscillator_ok,
            relative_strength_ok,
            momentum_diff,
            oscillator_fast: fast,
            oscillator_slow: slow,
            coin_return,
            return_diff: coin_return.unwrap_or(0.0) - reference_return.unwrap_or(0.0),
        }
    }

    /// Pass, or the highest-priority failing rule.
    pub fn decide(&self, m: &GateMetrics) -> Result<(), GateFailure> {
        if !m.momentum_up {
            return Err(GateFailure::Momentum);
        }
        if !m.trend_up {
            return Err(GateFailure::Trend);
        }
        if !m.not_near_lower {
            return Err(GateFailure::Channel);
        }
        if self.config.require_oscillator && !m.oscillator_ok {
            return Err(GateFailure::Other);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{ChannelValue, MomentumValue, OscillatorValue, TrendBand};
    use chrono::Utc;

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            timestamp: Utc::now(),
            momentum: Some(MomentumValue { line: 1.2, signal: 1.0 }),
            trend: TrendBand { value: Some(95.0), upper: None, lower: Some(95.0) },
            channel: ChannelValue { upper: Some(110.0), lower: Some(90.0) },
            oscillator: Some(OscillatorValue::percent(50.0, 30.0)),
            volatility: None,
        }
    }

    fn gate() -> RuleGate {
        RuleGate::new(GateConfig::default())
    }

    #[test]
    fn test_oscillator_scale_applies_to_both_lines() {
        assert_eq!(OscillatorValue::percent(50.0, 30.0).normalized(), (0.5, 0.3));
        assert_eq!(OscillatorValue::unit(0.5, 0.3).normalized(), (0.5, 0.3));
    }

    #[test]
    fn test_low_percent_reading_stays_oversold() {
        // 0.8% K over 0.5% D: below the floor, not an 80% reading
        let mut snap = snapshot();
        snap.oscillator = Some(OscillatorValue::percent(0.8, 0.5));
        let m = gate().metrics(100.0, &snap, None, None);
        assert!(!m.oscillator_ok);
        assert!((m.oscillator_fast.unwrap() - 0.008).abs() < 1e-12);
        assert!((m.oscillator_slow.unwrap() - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_cross_against_sub_one_percent_slow_line() {
        let mut snap = snapshot();
        snap.oscillator = Some(OscillatorValue::percent(50.0, 0.9));
        let m = gate().metrics(100.0, &snap, None, None);
        assert!(m.oscillator_ok);
        assert_eq!(m.oscillator_fast, Some(0.5));
        assert!((m.oscillator_slow.unwrap() - 0.009).abs() < 1e-12);
    }

    #[test]
    fn test_oscillator_scale_defaults_to_percent() {
        let value: OscillatorValue = serde_json::from_str(r#"{"fast": 60.0, "slow": 40.0}"#).unwrap();
        assert_eq!(value, OscillatorValue::percent(60.0, 40.0));
    }

    #[test]
    fn test_metrics_for_passing_bar() {
        let m = gate().metrics(100.0, &snapshot(), Some(0.08), Some(0.02));
        assert!(m.momentum_up);
        assert!(m.trend_up);
        assert!(m.not_near_lower);
        assert!(!m.near_upper);
        assert!(m.oscillator_ok);
        assert!(m.relative_strength_ok);
        assert!((m.momentum_diff - 0.2).abs() < 1e-12);
        assert_eq!(m.oscillator_fast, Some(0.5));
        assert!((m.return_diff - 0.06).abs() < 1e-12);
        assert_eq!(gate().decide(&m), Ok(()));
    }

    #[test]
    fn test_trend_up_from_band_state_alone() {
        let mut snap = snapshot();
        snap.trend = TrendBand { value: Some(120.0), upper: None, lower: Some(120.0) };
        assert!(gate().metrics(100.0, &snap, None, None).trend_up);

        snap.trend = TrendBand { value: Some(120.0), upper: Some(120.0), lower: None };
        assert!(!gate().metrics(100.0, &snap, None, None).trend_up);
    }

    #[test]
    fn test_channel_bounds_unknown() {
        let mut snap = snapshot();
        snap.channel = ChannelValue::default();
        let m = gate().metrics(100.0, &snap, None, None);
        assert!(m.not_near_lower);
        assert!(!m.near_upper);
    }

    #[test]
    fn test_near_lower_blocks() {
        let mut snap = snapshot();
        // 100 <= 98 * 1.03
        snap.channel.lower = Some(98.0);
        let m = gate().metrics(100.0, &snap, None, None);
        assert!(!m.not_near_lower);
        assert_eq!(gate().decide(&m), Err(GateFailure::Channel));
    }

    #[test]
    fn test_near_upper_within_slack() {
        let mut snap = snapshot();
        snap.channel.upper = Some(100.5);
        assert!(gate().metrics(100.0, &snap, None, None).near_upper);
    }

    #[test]
    fn test_oscillator_floor() {
        let mut snap = snapshot();
        snap.oscillator = Some(OscillatorValue::unit(0.15, 0.10));
        assert!(!gate().metrics(100.0, &snap, None, None).oscillator_ok);
    }

    #[test]
    fn test_relative_strength_needs_both_returns() {
        let g = gate();
        let m = g.metrics(100.0, &snapshot(), Some(0.05), None);
        assert!(!m.relative_strength_ok);
        assert!((m.return_diff - 0.05).abs() < 1e-12);
        assert!(!g.metrics(100.0, &snapshot(), Some(0.01), Some(0.02)).relative_strength_ok);
    }

    #[test]
    fn test_failure_priority() {
        let g = gate();
        let mut m = g.metrics(100.0, &snapshot(), None, None);
        m.momentum_up = false;
        m.trend_up = false;
        m.not_near_lower = false;
        assert_eq!(g.decide(&m), Err(GateFailure::Momentum));
        m.momentum_up = true;
        assert_eq!(g.decide(&m), Err(GateFailure::Trend));
        m.trend_up = true;
        assert_eq!(g.decide(&m), Err(GateFailure::Channel));
    }

    #[test]
    fn test_oscillator_gating_is_optional() {
        let mut m = gate().metrics(100.0, &snapshot(), None, None);
        m.oscillator_ok = false;
        assert_eq!(gate().decide(&m), Ok(()));

        let strict = RuleGate::new(GateConfig { require_oscillator: true, ..GateConfig::default() });
        assert_eq!(strict.decide(&m), Err(GateFailure::Other));
    }

    #[test]
    fn test_decide_is_deterministic() {
        let g = gate();
        let m = g.metrics(100.0, &snapshot(), Some(0.01), Some(0.03));
        assert_eq!(g.decide(&m), g.decide(&m.clone()));
    }
}
