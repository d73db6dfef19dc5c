//! Candidate Screener Module.
//!
//! Scans the market-cap universe page by page and ranks symbols whose
//! recent price action passes a set of trend rules.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Screening Pipeline                           │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────┐           │
//! │  │  Universe   │────▶│  Evaluator  │────▶│ CandidateBook│          │
//! │  │ (per page)  │     │ (per symbol)│     │   (dedup)   │           │
//! │  └─────────────┘     └──────┬──────┘     └──────┬──────┘           │
//! │                             │                   │                   │
//! │           Regime Guard → Rule Gate → Scorer     ▼                   │
//! │                                          ┌─────────────┐           │
//! │                                          │ Depth Filter│           │
//! │                                          └─────────────┘           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use scout_screener::screener::{RunBudget, ScreenerConfig, ScreenerEngine};
//!
//! let engine = ScreenerEngine::new(config, universe, market, books, indicators);
//! let (budget, abort) = RunBudget::new(Duration::from_secs(300));
//! let report = engine.run(&budget).await;
//! ```

pub mod budget;
pub mod candidate;
pub mod config;
pub mod depth;
pub mod engine;
pub mod evaluator;
pub mod gate;
pub mod regime;
pub mod report;
pub mod scoring;
pub mod strength;
pub mod universe;

pub use budget::{AbortHandle, RunBudget};
pub use candidate::{rank, Candidate, CandidateBook};
pub use config::{
    DepthConfig, EndpointConfig, GateConfig, PipelineConfig, RegimeConfig, ScoreWeights,
    ScreenerConfig, UniverseConfig,
};
pub use depth::{DepthFilter, DepthOutcome};
pub use engine::{DropStats, PageSummary, ScanReport, ScreenerEngine};
pub use evaluator::{Evaluation, InsufficientData, SymbolEvaluator};
pub use gate::{GateFailure, GateMetrics, RuleGate};
pub use regime::{RegimeGuard, RegimeReading};
pub use report::{default_csv_path, ReportFormat, ScreenerReport, DEFAULT_TABLE_ROWS};
pub use scoring::{oscillator_band_factor, CompositeScorer, Freshness};
pub use strength::lookback_return;
pub use universe::{min_market_cap_for, passes_thresholds, MarketCapUniverse, SymbolUniverse};
