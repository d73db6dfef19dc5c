//! Screener configuration module.
//!
//! Every pipeline constant lives in one immutable [`ScreenerConfig`] handed
//! to each component at construction.

use anyhow::{Context, Result};
use scout_common::validation::{Validate, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::data::Interval;
use crate::indicators::IndicatorConfig;

// ============================================================================
// Main Screener Configuration
// ============================================================================

/// Configuration for the candidate screener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// Bar interval to evaluate
    #[serde(default)]
    pub interval: Interval,

    /// Bars requested per symbol
    #[serde(default = "default_bar_limit")]
    pub bar_limit: usize,

    /// Minimum bars before a symbol is evaluated
    #[serde(default = "default_min_bars")]
    pub min_bars: usize,

    /// Pair whose return is the market-wide reference
    #[serde(default = "default_reference_pair")]
    pub reference_pair: String,

    /// Relative-strength lookback; derived from the interval when unset
    #[serde(default)]
    pub rs_lookback_bars: Option<usize>,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub regime: RegimeConfig,

    #[serde(default)]
    pub weights: ScoreWeights,

    #[serde(default)]
    pub depth: DepthConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub universe: UniverseConfig,

    #[serde(default)]
    pub indicators: IndicatorConfig,

    #[serde(default)]
    pub endpoints: EndpointConfig,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            interval: Interval::default(),
            bar_limit: default_bar_limit(),
            min_bars: default_min_bars(),
            reference_pair: default_reference_pair(),
            rs_lookback_bars: None,
            gate: GateConfig::default(),
            regime: RegimeConfig::default(),
            weights: ScoreWeights::default(),
            depth: DepthConfig::default(),
            pipeline: PipelineConfig::default(),
            universe: UniverseConfig::default(),
            indicators: IndicatorConfig::default(),
            endpoints: EndpointConfig::default(),
        }
    }
}

fn default_bar_limit() -> usize {
    400
}

fn default_min_bars() -> usize {
    35
}

fn default_reference_pair() -> String {
    "BTCUSDT".to_string()
}

impl ScreenerConfig {
    /// Stricter liquidity preset.
    pub fn tight() -> Self {
        let mut config = Self::default();
        config.apply_tight_regime();
        config
    }

    /// Raise liquidity thresholds to the tight preset, keeping everything else.
    pub fn apply_tight_regime(&mut self) {
        let u = &mut self.universe;
        u.min_market_cap = 500_000_000.0;
        u.relaxed_min_market_cap = 250_000_000.0;
        u.min_volume_24h = 50_000_000.0;
        u.max_fdv_ratio = 5.0;
        u.min_turnover = 0.05;
        u.max_rank = 200;
        u.max_spread_pct = 0.3;
        self.depth.min_usd = 500_000.0;
    }

    /// Effective relative-strength lookback in bars.
    pub fn rs_lookback(&self) -> usize {
        self.rs_lookback_bars
            .unwrap_or_else(|| self.interval.rs_lookback_bars())
    }

    /// Read the `screener` section of a merged config value.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value.get("screener") {
            Some(section) => Self::deserialize(section).context("Failed to parse screener config"),
            None => Ok(Self::default()),
        }
    }

    /// Apply `SCOUT_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<u32>("SCOUT_MAX_PAGES") {
            self.pipeline.max_pages = v;
        }
        if let Some(v) = env_parse::<f64>("SCOUT_DEPTH_MIN_USD") {
            self.depth.min_usd = v;
        }
        if let Some(v) = env_parse::<u64>("SCOUT_RUN_TIMEOUT_SECS") {
            self.pipeline.run_timeout_secs = v;
        }
        if let Some(v) = env_parse::<Interval>("SCOUT_INTERVAL") {
            self.interval = v;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

// ============================================================================
// Rule Gate
// ============================================================================

/// Hard pass/fail thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Close must exceed the lower channel bound by this percent
    #[serde(default = "default_lower_block_pct")]
    pub lower_block_pct: f64,

    /// Close within this percent of the upper channel bound counts as near it
    #[serde(default = "default_upper_slack_pct")]
    pub upper_slack_pct: f64,

    /// Whether the oscillator rule participates in the pass decision
    #[serde(default)]
    pub require_oscillator: bool,

    /// Minimum normalized oscillator fast value
    #[serde(default = "default_oscillator_floor")]
    pub oscillator_floor: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            lower_block_pct: default_lower_block_pct(),
            upper_slack_pct: default_upper_slack_pct(),
            require_oscillator: false,
            oscillator_floor: default_oscillator_floor(),
        }
    }
}

fn default_lower_block_pct() -> f64 {
    3.0
}

fn default_upper_slack_pct() -> f64 {
    1.0
}

fn default_oscillator_floor() -> f64 {
    0.20
}

// ============================================================================
// Regime Guard
// ============================================================================

/// Chop detection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Window W in bars
    #[serde(default = "default_regime_lookback")]
    pub lookback: usize,

    /// Mean relative Bollinger width at or below which the market is flat
    #[serde(default = "default_width_ceiling")]
    pub width_ceiling: f64,

    /// Absolute proportional slope ceiling over the window
    #[serde(default = "default_slope_ceiling")]
    pub slope_ceiling: f64,

    /// Minimum trend flips inside the window
    #[serde(default = "default_min_flips")]
    pub min_flips: usize,

    /// Close must be within this percent of the channel top during chop
    #[serde(default = "default_breakout_slack_pct")]
    pub breakout_slack_pct: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback: default_regime_lookback(),
            width_ceiling: default_width_ceiling(),
            slope_ceiling: default_slope_ceiling(),
            min_flips: default_min_flips(),
            breakout_slack_pct: default_breakout_slack_pct(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_regime_lookback() -> usize {
    20
}

fn default_width_ceiling() -> f64 {
    0.10
}

fn default_slope_ceiling() -> f64 {
    0.02
}

fn default_min_flips() -> usize {
    3
}

fn default_breakout_slack_pct() -> f64 {
    1.0
}

// ============================================================================
// Score Weights
// ============================================================================

/// Per-rule score weights; nominal total 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_w_momentum")]
    pub momentum: f64,
    #[serde(default = "default_w_trend")]
    pub trend: f64,
    #[serde(default = "default_w_channel")]
    pub channel: f64,
    #[serde(default = "default_w_oscillator")]
    pub oscillator: f64,
    #[serde(default = "default_w_relative_strength")]
    pub relative_strength: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            momentum: default_w_momentum(),
            trend: default_w_trend(),
            channel: default_w_channel(),
            oscillator: default_w_oscillator(),
            relative_strength: default_w_relative_strength(),
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.momentum + self.trend + self.channel + self.oscillator + self.relative_strength
    }
}

fn default_w_momentum() -> f64 {
    25.0
}

fn default_w_trend() -> f64 {
    25.0
}

fn default_w_channel() -> f64 {
    20.0
}

fn default_w_oscillator() -> f64 {
    20.0
}

fn default_w_relative_strength() -> f64 {
    10.0
}

// ============================================================================
// Depth Post-Filter
// ============================================================================

/// Order-book liquidity filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthConfig {
    /// Candidates checked, taken from the top of the ranking
    #[serde(default = "default_depth_top_n")]
    pub top_n: usize,

    /// Minimum USD depth inside the band
    #[serde(default = "default_depth_min_usd")]
    pub min_usd: f64,

    /// Lookups in flight at once
    #[serde(default = "default_depth_concurrency")]
    pub max_concurrent: usize,

    /// Order-book levels requested
    #[serde(default = "default_book_limit")]
    pub book_limit: usize,

    /// Band around mid, in percent
    #[serde(default = "default_band_pct")]
    pub band_pct: f64,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            top_n: default_depth_top_n(),
            min_usd: default_depth_min_usd(),
            max_concurrent: default_depth_concurrency(),
            book_limit: default_book_limit(),
            band_pct: default_band_pct(),
        }
    }
}

fn default_depth_top_n() -> usize {
    100
}

fn default_depth_min_usd() -> f64 {
    100_000.0
}

fn default_depth_concurrency() -> usize {
    6
}

fn default_book_limit() -> usize {
    1000
}

fn default_band_pct() -> f64 {
    1.0
}

// ============================================================================
// Pipeline
// ============================================================================

/// Paging, early stop, and time limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// First page on which early stop may trigger
    #[serde(default = "default_early_stop_min_page")]
    pub early_stop_min_page: u32,

    /// Consecutive unproductive pages that end the scan
    #[serde(default = "default_early_stop_streak")]
    pub early_stop_streak: u32,

    /// Symbols evaluated concurrently within a page
    #[serde(default = "default_symbol_concurrency")]
    pub symbol_concurrency: usize,

    /// Whole-run deadline
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Optional per-page deadline
    #[serde(default)]
    pub page_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            early_stop_min_page: default_early_stop_min_page(),
            early_stop_streak: default_early_stop_streak(),
            symbol_concurrency: default_symbol_concurrency(),
            run_timeout_secs: default_run_timeout_secs(),
            page_timeout_secs: None,
        }
    }
}

fn default_max_pages() -> u32 {
    10
}

fn default_early_stop_min_page() -> u32 {
    4
}

fn default_early_stop_streak() -> u32 {
    2
}

fn default_symbol_concurrency() -> usize {
    6
}

fn default_run_timeout_secs() -> u64 {
    300
}

// ============================================================================
// Universe Filter
// ============================================================================

/// Market-cap universe thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseConfig {
    /// Coins requested per market-cap page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Minimum market cap while the reference asset dominates
    #[serde(default = "default_min_market_cap")]
    pub min_market_cap: f64,

    /// Minimum market cap when dominance is below the pivot
    #[serde(default = "default_relaxed_min_market_cap")]
    pub relaxed_min_market_cap: f64,

    /// Dominance percent separating strict from relaxed
    #[serde(default = "default_dominance_pivot_pct")]
    pub dominance_pivot_pct: f64,

    /// Asset whose dominance is read (e.g. "btc")
    #[serde(default = "default_dominance_asset")]
    pub dominance_asset: String,

    #[serde(default = "default_min_volume_24h")]
    pub min_volume_24h: f64,

    #[serde(default = "default_max_fdv_ratio")]
    pub max_fdv_ratio: f64,

    /// Minimum 24h volume / market cap
    #[serde(default = "default_min_turnover")]
    pub min_turnover: f64,

    #[serde(default = "default_max_rank")]
    pub max_rank: u32,

    #[serde(default = "default_max_spread_pct")]
    pub max_spread_pct: f64,

    /// Quote used for the spread check
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,

    /// Coins whose name contains any of these are skipped
    #[serde(default = "default_excluded_terms")]
    pub excluded_terms: Vec<String>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            min_market_cap: default_min_market_cap(),
            relaxed_min_market_cap: default_relaxed_min_market_cap(),
            dominance_pivot_pct: default_dominance_pivot_pct(),
            dominance_asset: default_dominance_asset(),
            min_volume_24h: default_min_volume_24h(),
            max_fdv_ratio: default_max_fdv_ratio(),
            min_turnover: default_min_turnover(),
            max_rank: default_max_rank(),
            max_spread_pct: default_max_spread_pct(),
            quote_asset: default_quote_asset(),
            excluded_terms: default_excluded_terms(),
        }
    }
}

fn default_per_page() -> u32 {
    250
}

fn default_min_market_cap() -> f64 {
    100_000_000.0
}

fn default_relaxed_min_market_cap() -> f64 {
    50_000_000.0
}

fn default_dominance_pivot_pct() -> f64 {
    50.0
}

fn default_dominance_asset() -> String {
    "btc".to_string()
}

fn default_min_volume_24h() -> f64 {
    10_000_000.0
}

fn default_max_fdv_ratio() -> f64 {
    10.0
}

fn default_min_turnover() -> f64 {
    0.03
}

fn default_max_rank() -> u32 {
    500
}

fn default_max_spread_pct() -> f64 {
    0.5
}

fn default_quote_asset() -> String {
    "USDT".to_string()
}

fn default_excluded_terms() -> Vec<String> {
    vec!["WRAPPED".into(), "PEG".into(), "REBASE".into()]
}

// ============================================================================
// Endpoints
// ============================================================================

/// REST base URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_exchange_url")]
    pub exchange: String,
    #[serde(default = "default_market_cap_url")]
    pub market_cap: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            exchange: default_exchange_url(),
            market_cap: default_market_cap_url(),
        }
    }
}

fn default_exchange_url() -> String {
    "https://api.binance.com/api/v3".to_string()
}

fn default_market_cap_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

// ============================================================================
// Validation
// ============================================================================

fn check(errors: &mut Vec<ValidationError>, ok: bool, field: &str, reason: &str) {
    if !ok {
        errors.push(ValidationError::invalid(field, reason));
    }
}

impl Validate for ScreenerConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut e = Vec::new();

        check(&mut e, self.bar_limit > 0, "screener.bar_limit", "must be greater than 0");
        check(&mut e, self.min_bars >= 20, "screener.min_bars", "must be at least 20");
        check(
            &mut e,
            self.min_bars <= self.bar_limit,
            "screener.min_bars",
            "must not exceed bar_limit",
        );
        check(
            &mut e,
            !self.reference_pair.trim().is_empty(),
            "screener.reference_pair",
            "must not be empty",
        );
        check(&mut e, self.rs_lookback() > 0, "screener.rs_lookback_bars", "must be greater than 0");

        let g = &self.gate;
        check(
            &mut e,
            (0.0..100.0).contains(&g.lower_block_pct),
            "screener.gate.lower_block_pct",
            "must be in [0, 100)",
        );
        check(
            &mut e,
            (0.0..100.0).contains(&g.upper_slack_pct),
            "screener.gate.upper_slack_pct",
            "must be in [0, 100)",
        );
        check(
            &mut e,
            (0.0..=1.0).contains(&g.oscillator_floor),
            "screener.gate.oscillator_floor",
            "must be in [0, 1]",
        );

        let r = &self.regime;
        check(&mut e, r.lookback > 0, "screener.regime.lookback", "must be greater than 0");
        check(&mut e, r.width_ceiling >= 0.0, "screener.regime.width_ceiling", "must not be negative");
        check(&mut e, r.slope_ceiling >= 0.0, "screener.regime.slope_ceiling", "must not be negative");
        check(
            &mut e,
            (0.0..100.0).contains(&r.breakout_slack_pct),
            "screener.regime.breakout_slack_pct",
            "must be in [0, 100)",
        );

        let w = &self.weights;
        for (name, value) in [
            ("momentum", w.momentum),
            ("trend", w.trend),
            ("channel", w.channel),
            ("oscillator", w.oscillator),
            ("relative_strength", w.relative_strength),
        ] {
            check(
                &mut e,
                value >= 0.0 && value.is_finite(),
                &format!("screener.weights.{}", name),
                "must be a non-negative number",
            );
        }

        let d = &self.depth;
        check(&mut e, d.max_concurrent > 0, "screener.depth.max_concurrent", "must be greater than 0");
        check(&mut e, d.book_limit > 0, "screener.depth.book_limit", "must be greater than 0");
        check(&mut e, d.min_usd >= 0.0, "screener.depth.min_usd", "must not be negative");
        check(
            &mut e,
            d.band_pct > 0.0 && d.band_pct < 100.0,
            "screener.depth.band_pct",
            "must be in (0, 100)",
        );

        let p = &self.pipeline;
        check(&mut e, p.max_pages > 0, "screener.pipeline.max_pages", "must be greater than 0");
        check(
            &mut e,
            p.early_stop_streak > 0,
            "screener.pipeline.early_stop_streak",
            "must be greater than 0",
        );
        check(
            &mut e,
            p.symbol_concurrency > 0,
            "screener.pipeline.symbol_concurrency",
            "must be greater than 0",
        );
        check(
            &mut e,
            p.run_timeout_secs > 0,
            "screener.pipeline.run_timeout_secs",
            "must be greater than 0",
        );
        check(
            &mut e,
            p.page_timeout_secs != Some(0),
            "screener.pipeline.page_timeout_secs",
            "must be greater than 0 when set",
        );

        let u = &self.universe;
        check(&mut e, u.per_page > 0 && u.per_page <= 250, "screener.universe.per_page", "must be in 1..=250");
        check(&mut e, u.max_fdv_ratio > 0.0, "screener.universe.max_fdv_ratio", "must be greater than 0");
        check(&mut e, u.max_rank > 0, "screener.universe.max_rank", "must be greater than 0");
        check(
            &mut e,
            !u.quote_asset.trim().is_empty(),
            "screener.universe.quote_asset",
            "must not be empty",
        );

        let i = &self.indicators;
        check(
            &mut e,
            i.macd_fast > 0 && i.macd_fast < i.macd_slow && i.macd_signal > 0,
            "screener.indicators.macd",
            "periods must be positive with fast < slow",
        );
        for (name, value) in [
            ("supertrend_period", i.supertrend_period),
            ("donchian_period", i.donchian_period),
            ("rsi_period", i.rsi_period),
            ("stoch_period", i.stoch_period),
            ("stoch_k", i.stoch_k),
            ("stoch_d", i.stoch_d),
            ("bollinger_period", i.bollinger_period),
        ] {
            check(
                &mut e,
                value > 0,
                &format!("screener.indicators.{}", name),
                "must be greater than 0",
            );
        }

        ValidationError::collect(e)
    }
}
