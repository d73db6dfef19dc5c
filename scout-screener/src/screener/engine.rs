//! Screener engine module.
//!
//! Drives the paged scan: universe page → per-symbol evaluation → merge into
//! the candidate book, with early stop, then one depth pass over the final
//! ranking.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::budget::RunBudget;
use super::candidate::{Candidate, CandidateBook};
use super::config::ScreenerConfig;
use super::depth::DepthFilter;
use super::evaluator::{Evaluation, InsufficientData, SymbolEvaluator};
use super::gate::GateFailure;
use super::strength::lookback_return;
use super::universe::SymbolUniverse;
use crate::data::{MarketDataProvider, OrderBookProvider};
use crate::indicators::IndicatorSource;

// ============================================================================
// Run Statistics
// ============================================================================

/// Histogram of per-symbol outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropStats {
    pub candidates: usize,
    pub insufficient_data: usize,
    /// Subset of `insufficient_data` cut short by the budget
    pub cancelled: usize,
    pub guard_rejected: usize,
    pub gate_momentum: usize,
    pub gate_trend: usize,
    pub gate_channel: usize,
    pub gate_other: usize,
    pub computation_failed: usize,
    pub depth_rejected: usize,
}

impl DropStats {
    pub fn record(&mut self, evaluation: &Evaluation) {
        match evaluation {
            Evaluation::Candidate(_) => self.candidates += 1,
            Evaluation::GuardRejected => self.guard_rejected += 1,
            Evaluation::GateRejected(GateFailure::Momentum) => self.gate_momentum += 1,
            Evaluation::GateRejected(GateFailure::Trend) => self.gate_trend += 1,
            Evaluation::GateRejected(GateFailure::Channel) => self.gate_channel += 1,
            Evaluation::GateRejected(GateFailure::Other) => self.gate_other += 1,
            Evaluation::InsufficientData(reason) => {
                self.insufficient_data += 1;
                if *reason == InsufficientData::Cancelled {
                    self.cancelled += 1;
                }
            }
            Evaluation::ComputationFailed(_) => self.computation_failed += 1,
        }
    }

    pub fn gate_rejected(&self) -> usize {
        self.gate_momentum + self.gate_trend + self.gate_channel + self.gate_other
    }

    /// Symbols evaluated, whatever the outcome.
    pub fn evaluated(&self) -> usize {
        self.candidates
            + self.insufficient_data
            + self.guard_rejected
            + self.gate_rejected()
            + self.computation_failed
    }
}

/// One page of the scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    pub page: u32,
    /// Symbols handed over by the universe
    pub symbols: usize,
    /// Candidates produced on this page
    pub candidates: usize,
    /// Symbols not seen on earlier pages
    pub new_unique: usize,
    pub total_unique: usize,
    /// Page ran out of budget before finishing
    pub cancelled: bool,
}

// ============================================================================
// Scan Report
// ============================================================================

/// Result of a screening run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Scan ID (timestamp-based)
    pub id: String,
    /// Final candidates, descending by score, one per symbol
    pub candidates: Vec<Candidate>,
    pub pages_scanned: u32,
    pub pages: Vec<PageSummary>,
    pub early_stopped: bool,
    pub cancelled: bool,
    /// Whether the depth filter ran
    pub depth_checked: bool,
    pub drops: DropStats,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: f64,
}

impl ScanReport {
    /// Get the top N candidates.
    pub fn top(&self, n: usize) -> &[Candidate] {
        &self.candidates[..n.min(self.candidates.len())]
    }

    /// Mean score of the final candidates; 0 when empty.
    pub fn average_score(&self) -> f64 {
        if self.candidates.is_empty() {
            return 0.0;
        }
        self.candidates.iter().map(|c| c.score).sum::<f64>() / self.candidates.len() as f64
    }

    /// Summary string for logging.
    pub fn summary(&self) -> String {
        format!(
            "Scanned {} pages in {:.1}s: {} candidates from {} symbols{}{}",
            self.pages_scanned,
            self.duration_secs,
            self.candidates.len(),
            self.drops.evaluated(),
            if self.early_stopped { " (early stop)" } else { "" },
            if self.cancelled { " (cancelled)" } else { "" },
        )
    }
}

// ============================================================================
// Screener Engine
// ============================================================================

/// The screening orchestrator.
pub struct ScreenerEngine {
    config: ScreenerConfig,
    universe: Arc<dyn SymbolUniverse>,
    market: Arc<dyn MarketDataProvider>,
    books: Arc<dyn OrderBookProvider>,
    evaluator: SymbolEvaluator,
    depth: DepthFilter,
}

impl ScreenerEngine {
    pub fn new(
        config: ScreenerConfig,
        universe: Arc<dyn SymbolUniverse>,
        market: Arc<dyn MarketDataProvider>,
        books: Arc<dyn OrderBookProvider>,
        indicators: Arc<dyn IndicatorSource>,
    ) -> Self {
        let evaluator = SymbolEvaluator::new(&config, indicators);
        let depth = DepthFilter::new(config.depth.clone());
        Self {
            config,
            universe,
            market,
            books,
            evaluator,
            depth,
        }
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// Run one full scan under `budget`.
    pub async fn run(&self, budget: &RunBudget) -> ScanReport {
        let started_at = Utc::now();
        let pipeline = &self.config.pipeline;
        info!(
            interval = %self.config.interval,
            max_pages = pipeline.max_pages,
            source = self.market.name(),
            "Starting scan"
        );

        let tradable = budget
            .run(self.books.tradable_symbols())
            .await
            .unwrap_or_default();
        if tradable.is_empty() {
            warn!("No tradable symbols available; every symbol will lack a pair");
        }

        let reference_return = self.reference_return(budget).await;

        let mut book = CandidateBook::new();
        let mut drops = DropStats::default();
        let mut pages = Vec::new();
        let mut streak = 0u32;
        let mut early_stopped = false;
        let mut cancelled = false;

        for page in 1..=pipeline.max_pages {
            if budget.is_cancelled() {
                cancelled = true;
                info!(page, "Run budget exhausted; stopping scan");
                break;
            }

            let page_budget = budget.child(pipeline.page_timeout_secs.map(Duration::from_secs));
            let symbols = distinct_symbols(
                page_budget
                    .run(self.universe.filtered_symbols(page))
                    .await
                    .unwrap_or_default(),
            );

            let evaluations: Vec<Evaluation> = stream::iter(symbols.iter())
                .map(|symbol| self.evaluate_symbol(symbol, &tradable, reference_return, &page_budget))
                .buffer_unordered(pipeline.symbol_concurrency.max(1))
                .collect()
                .await;

            let mut page_candidates = Vec::new();
            for evaluation in evaluations {
                drops.record(&evaluation);
                if let Evaluation::Candidate(candidate) = evaluation {
                    page_candidates.push(candidate);
                }
            }

            let produced = page_candidates.len();
            let new_unique = book.merge(page_candidates);
            let summary = PageSummary {
                page,
                symbols: symbols.len(),
                candidates: produced,
                new_unique,
                total_unique: book.len(),
                cancelled: page_budget.is_cancelled(),
            };
            info!(
                page,
                symbols = summary.symbols,
                candidates = produced,
                new = new_unique,
                total_unique = summary.total_unique,
                "Page scanned"
            );
            pages.push(summary);

            if symbols.is_empty() || new_unique == 0 {
                streak += 1;
            } else {
                streak = 0;
            }
            if page >= pipeline.early_stop_min_page && streak >= pipeline.early_stop_streak {
                early_stopped = true;
                info!(page, streak, "Early stop: no new symbols");
                break;
            }
        }

        cancelled |= budget.is_cancelled();
        let ranked = book.ranked();

        let (candidates, depth_checked) = if cancelled {
            warn!(candidates = ranked.len(), "Run cancelled; skipping depth filter");
            (ranked, false)
        } else {
            let outcome = self.depth.apply(ranked, Arc::clone(&self.books), budget).await;
            drops.depth_rejected = outcome.rejected;
            info!(
                checked = outcome.checked,
                retained = outcome.retained.len(),
                rejected = outcome.rejected,
                "Depth filter applied"
            );
            (outcome.retained, true)
        };

        info!(
            candidates = drops.candidates,
            insufficient_data = drops.insufficient_data,
            cancelled = drops.cancelled,
            guard = drops.guard_rejected,
            gate_momentum = drops.gate_momentum,
            gate_trend = drops.gate_trend,
            gate_channel = drops.gate_channel,
            gate_other = drops.gate_other,
            computation_failed = drops.computation_failed,
            depth = drops.depth_rejected,
            "Drop histogram"
        );

        let completed_at = Utc::now();
        let report = ScanReport {
            id: format!("scan_{}", started_at.format("%Y%m%d_%H%M%S")),
            candidates,
            pages_scanned: pages.len() as u32,
            pages,
            early_stopped,
            cancelled,
            depth_checked,
            drops,
            started_at,
            completed_at,
            duration_secs: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
        };
        info!("{}", report.summary());
        report
    }

    async fn reference_return(&self, budget: &RunBudget) -> Option<f64> {
        let pair = &self.config.reference_pair;
        let bars = budget
            .run(self.market.get_bars(pair, self.config.interval, self.config.bar_limit))
            .await
            .unwrap_or_default();
        let ret = lookback_return(&bars, self.evaluator.rs_lookback());
        match ret {
            Some(r) => info!(pair = %pair, reference_return = r, "Reference return"),
            None => warn!(pair = %pair, bars = bars.len(), "Reference return unavailable; using 0"),
        }
        ret
    }

    async fn evaluate_symbol(
        &self,
        symbol: &str,
        tradable: &HashSet<String>,
        reference_return: Option<f64>,
        budget: &RunBudget,
    ) -> Evaluation {
        let Some(pair) = self.books.pick_preferred_pair(symbol, tradable) else {
            debug!(symbol, "No tradable pair");
            return Evaluation::InsufficientData(InsufficientData::NoPair);
        };

        let fetch = self
            .market
            .get_bars(&pair, self.config.interval, self.config.bar_limit);
        let Some(bars) = budget.run(fetch).await else {
            return Evaluation::InsufficientData(InsufficientData::Cancelled);
        };

        let evaluation = self.evaluator.evaluate(symbol, &pair, &bars, reference_return);
        match &evaluation {
            Evaluation::Candidate(c) => debug!(symbol, pair = %pair, score = c.score, "Candidate"),
            Evaluation::GuardRejected => debug!(symbol, "Guard rejected"),
            Evaluation::GateRejected(reason) => debug!(symbol, reason = %reason, "Gate rejected"),
            Evaluation::InsufficientData(reason) => debug!(symbol, reason = %reason, "Insufficient data"),
            Evaluation::ComputationFailed(e) => debug!(symbol, error = %e, "Computation failed"),
        }
        evaluation
    }
}

/// Case-insensitive dedup keeping the first occurrence and page order.
fn distinct_symbols(symbols: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(symbols.len());
    symbols
        .into_iter()
        .filter(|s| seen.insert(s.to_uppercase()))
        .collect()
}
