//! Per-symbol evaluation.
//!
//! Every evaluation ends in exactly one [`Evaluation`] variant; nothing here
//! returns an error to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::candidate::Candidate;
use super::config::ScreenerConfig;
use super::gate::{GateFailure, RuleGate};
use super::regime::RegimeGuard;
use super::scoring::{CompositeScorer, Freshness};
use super::strength::lookback_return;
use crate::data::Bar;
use crate::indicators::{IndicatorSnapshot, IndicatorSource};

/// Why a symbol could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsufficientData {
    /// No tradable pair for the base symbol
    NoPair,
    /// Bar fetch came back empty
    NoBars,
    TooShort { bars: usize, required: usize },
    /// An indicator value is missing on the evaluated bar
    MissingIndicators,
    /// The run or page budget ran out first
    Cancelled,
}

impl fmt::Display for InsufficientData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPair => write!(f, "no tradable pair"),
            Self::NoBars => write!(f, "no bars"),
            Self::TooShort { bars, required } => write!(f, "{} bars, need {}", bars, required),
            Self::MissingIndicators => write!(f, "missing indicator values"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of evaluating one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Candidate(Candidate),
    GuardRejected,
    GateRejected(GateFailure),
    InsufficientData(InsufficientData),
    ComputationFailed(String),
}

/// Guard → gate → scorer for one bar sequence.
pub struct SymbolEvaluator {
    min_bars: usize,
    rs_lookback: usize,
    indicators: Arc<dyn IndicatorSource>,
    guard: RegimeGuard,
    gate: RuleGate,
    scorer: CompositeScorer,
}

impl SymbolEvaluator {
    pub fn new(config: &ScreenerConfig, indicators: Arc<dyn IndicatorSource>) -> Self {
        Self {
            min_bars: config.min_bars,
            rs_lookback: config.rs_lookback(),
            indicators,
            guard: RegimeGuard::new(config.regime.clone()),
            gate: RuleGate::new(config.gate.clone()),
            scorer: CompositeScorer::new(config.weights.clone()),
        }
    }

    pub fn rs_lookback(&self) -> usize {
        self.rs_lookback
    }

    /// Evaluate `bars` for `symbol` traded as `pair`.
    pub fn evaluate(
        &self,
        symbol: &str,
        pair: &str,
        bars: &[Bar],
        reference_return: Option<f64>,
    ) -> Evaluation {
        if bars.is_empty() {
            return Evaluation::InsufficientData(InsufficientData::NoBars);
        }
        if bars.len() < self.min_bars {
            return Evaluation::InsufficientData(InsufficientData::TooShort {
                bars: bars.len(),
                required: self.min_bars,
            });
        }

        let snapshots = match self.indicators.compute(bars) {
            Ok(s) => s,
            Err(e) => return Evaluation::ComputationFailed(e.to_string()),
        };
        if snapshots.len() != bars.len() {
            return Evaluation::ComputationFailed(format!(
                "{} snapshots for {} bars",
                snapshots.len(),
                bars.len()
            ));
        }

        let (Some(last_bar), Some(last)) = (bars.last(), snapshots.last()) else {
            return Evaluation::InsufficientData(InsufficientData::NoBars);
        };
        if !has_required_values(last) {
            return Evaluation::InsufficientData(InsufficientData::MissingIndicators);
        }

        if self.guard.rejects(bars, &snapshots) {
            return Evaluation::GuardRejected;
        }

        let coin_return = lookback_return(bars, self.rs_lookback);
        let metrics = self
            .gate
            .metrics(last_bar.close, last, coin_return, reference_return);
        if let Err(failure) = self.gate.decide(&metrics) {
            return Evaluation::GateRejected(failure);
        }

        let freshness = Freshness::detect(bars, &snapshots);
        let score = self.scorer.score(&metrics, last_bar.close, &freshness);
        if !score.is_finite() {
            return Evaluation::ComputationFailed(format!("non-finite score for {}", symbol));
        }

        Evaluation::Candidate(Candidate {
            symbol: symbol.to_uppercase(),
            pair: pair.to_string(),
            timestamp: last_bar.timestamp,
            close: last_bar.close,
            metrics,
            score,
        })
    }
}

fn has_required_values(s: &IndicatorSnapshot) -> bool {
    s.momentum.is_some()
        && s.trend.value.is_some()
        && s.oscillator.is_some()
        && (s.channel.upper.is_some() || s.channel.lower.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::bars_from_closes;
    use crate::indicators::{
        ChannelValue, IndicatorError, MomentumValue, OscillatorValue, StandardIndicators, TrendBand,
        VolatilityBand,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Same snapshot on every bar, with counting.
    struct Fixed {
        snapshot: IndicatorSnapshot,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(snapshot: IndicatorSnapshot) -> Arc<Self> {
            Arc::new(Self { snapshot, calls: AtomicUsize::new(0) })
        }
    }

    impl IndicatorSource for Fixed {
        fn compute(&self, bars: &[Bar]) -> Result<Vec<IndicatorSnapshot>, IndicatorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(bars
                .iter()
                .map(|b| IndicatorSnapshot { timestamp: b.timestamp, ..self.snapshot.clone() })
                .collect())
        }
    }

    struct Failing;

    impl IndicatorSource for Failing {
        fn compute(&self, _bars: &[Bar]) -> Result<Vec<IndicatorSnapshot>, IndicatorError> {
            Err(IndicatorError::NonFinite { index: 3 })
        }
    }

    fn passing_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            timestamp: chrono::Utc::now(),
            momentum: Some(MomentumValue { line: 0.3, signal: 0.1 }),
            trend: TrendBand { value: Some(90.0), upper: None, lower: Some(90.0) },
            channel: ChannelValue { upper: Some(120.0), lower: Some(80.0) },
            oscillator: Some(OscillatorValue::percent(60.0, 40.0)),
            volatility: Some(VolatilityBand { upper: 130.0, lower: 70.0, mid: 100.0 }),
        }
    }

    fn closes(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 * 0.1).collect()
    }

    fn evaluator(source: Arc<dyn IndicatorSource>) -> SymbolEvaluator {
        SymbolEvaluator::new(&ScreenerConfig::default(), source)
    }

    #[test]
    fn test_short_series_never_computes() {
        let source = Fixed::new(passing_snapshot());
        let eval = evaluator(source.clone());
        let bars = bars_from_closes(&closes(34), 0.5);
        assert_eq!(
            eval.evaluate("SOL", "SOLUSDT", &bars, Some(0.0)),
            Evaluation::InsufficientData(InsufficientData::TooShort { bars: 34, required: 35 })
        );
        assert_eq!(
            eval.evaluate("SOL", "SOLUSDT", &[], Some(0.0)),
            Evaluation::InsufficientData(InsufficientData::NoBars)
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_candidate_produced() {
        let eval = evaluator(Fixed::new(passing_snapshot()));
        let bars = bars_from_closes(&closes(60), 0.5);
        match eval.evaluate("sol", "SOLUSDT", &bars, Some(0.0)) {
            Evaluation::Candidate(c) => {
                assert_eq!(c.symbol, "SOL");
                assert_eq!(c.pair, "SOLUSDT");
                assert_eq!(c.timestamp, bars[59].timestamp);
                assert_eq!(c.metrics.oscillator_fast, Some(0.6));
                assert!(c.score > 0.0);
            }
            other => panic!("expected candidate, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_indicator_is_insufficient_data() {
        let mut snap = passing_snapshot();
        snap.oscillator = None;
        let eval = evaluator(Fixed::new(snap));
        let bars = bars_from_closes(&closes(60), 0.5);
        assert_eq!(
            eval.evaluate("SOL", "SOLUSDT", &bars, None),
            Evaluation::InsufficientData(InsufficientData::MissingIndicators)
        );
    }

    #[test]
    fn test_gate_failure_is_tagged() {
        let mut snap = passing_snapshot();
        snap.momentum = Some(MomentumValue { line: 0.1, signal: 0.3 });
        let eval = evaluator(Fixed::new(snap));
        let bars = bars_from_closes(&closes(60), 0.5);
        assert_eq!(
            eval.evaluate("SOL", "SOLUSDT", &bars, None),
            Evaluation::GateRejected(GateFailure::Momentum)
        );
    }

    #[test]
    fn test_indicator_error_is_computation_failure() {
        let eval = evaluator(Arc::new(Failing));
        let bars = bars_from_closes(&closes(60), 0.5);
        assert!(matches!(
            eval.evaluate("SOL", "SOLUSDT", &bars, None),
            Evaluation::ComputationFailed(_)
        ));
    }

    #[test]
    fn test_chop_is_guard_rejected() {
        // flat closes, narrow bands, flipping trend, close well below channel top
        let bars = bars_from_closes(&[100.0; 60], 0.5);
        struct Choppy;
        impl IndicatorSource for Choppy {
            fn compute(&self, bars: &[Bar]) -> Result<Vec<IndicatorSnapshot>, IndicatorError> {
                Ok(bars
                    .iter()
                    .enumerate()
                    .map(|(i, b)| {
                        let mut s = passing_snapshot();
                        s.timestamp = b.timestamp;
                        s.volatility = Some(VolatilityBand { upper: 101.0, lower: 99.0, mid: 100.0 });
                        if (i / 3) % 2 == 1 {
                            s.trend = TrendBand { value: Some(101.0), upper: Some(101.0), lower: None };
                        }
                        s
                    })
                    .collect())
            }
        }
        let eval = evaluator(Arc::new(Choppy));
        assert_eq!(eval.evaluate("SOL", "SOLUSDT", &bars, Some(0.0)), Evaluation::GuardRejected);
    }

    #[test]
    fn test_standard_indicators_end_to_end() {
        let eval = evaluator(Arc::new(StandardIndicators::default()));
        let rising: Vec<f64> = (0..200).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let bars = bars_from_closes(&rising, 0.2);
        let outcome = eval.evaluate("ABC", "ABCUSDT", &bars, Some(0.0));
        assert!(
            !matches!(outcome, Evaluation::ComputationFailed(_)),
            "unexpected {:?}",
            outcome
        );
    }
}
