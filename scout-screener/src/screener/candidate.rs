//! Candidates and cross-page deduplication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::gate::GateMetrics;

/// A symbol that passed the guard and gate, with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Base symbol, upper-cased (e.g. "SOL")
    pub symbol: String,
    /// Exchange pair the bars came from (e.g. "SOLUSDT")
    pub pair: String,
    /// Time of the evaluated bar
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub metrics: GateMetrics,
    pub score: f64,
}

impl Candidate {
    /// Rule letters for passing rules: M S D U K R.
    pub fn rule_letters(&self) -> String {
        let m = &self.metrics;
        [
            (m.momentum_up, 'M'),
            (m.trend_up, 'S'),
            (m.not_near_lower, 'D'),
            (m.near_upper, 'U'),
            (m.oscillator_ok, 'K'),
            (m.relative_strength_ok, 'R'),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, c)| *c)
        .collect()
    }
}

fn by_rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Sort descending by score, ties broken by symbol.
pub fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(by_rank);
}

/// Best candidate per symbol across pages.
#[derive(Debug, Clone, Default)]
pub struct CandidateBook {
    best: HashMap<String, Candidate>,
}

impl CandidateBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a page's candidates, keeping the higher score per symbol.
    ///
    /// Returns how many symbols were not present before.
    pub fn merge<I>(&mut self, candidates: I) -> usize
    where
        I: IntoIterator<Item = Candidate>,
    {
        let mut added = 0;
        for candidate in candidates {
            let key = candidate.symbol.to_uppercase();
            match self.best.get_mut(&key) {
                Some(existing) => {
                    if candidate.score > existing.score {
                        *existing = candidate;
                    }
                }
                None => {
                    self.best.insert(key, candidate);
                    added += 1;
                }
            }
        }
        added
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.best.contains_key(&symbol.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.best.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }

    /// All candidates, ranked.
    pub fn ranked(&self) -> Vec<Candidate> {
        let mut all: Vec<Candidate> = self.best.values().cloned().collect();
        rank(&mut all);
        all
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub fn metrics() -> GateMetrics {
        GateMetrics {
            momentum_up: true,
            trend_up: true,
            not_near_lower: true,
            near_upper: false,
            oscillator_ok: false,
            relative_strength_ok: true,
            momentum_diff: 0.1,
            oscillator_fast: Some(0.4),
            oscillator_slow: Some(0.5),
            coin_return: Some(0.05),
            return_diff: 0.03,
        }
    }

    pub fn candidate(symbol: &str, score: f64) -> Candidate {
        Candidate {
            symbol: symbol.to_string(),
            pair: format!("{}USDT", symbol.to_uppercase()),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            close: 10.0,
            metrics: metrics(),
            score,
        }
    }
}
