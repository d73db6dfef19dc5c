//! Collaborator abstractions for market data.
//!
//! The screener core talks to three collaborators: bars, order books, and a
//! market-cap listing. Implementations swallow their own faults; a failed
//! call shows up as an empty collection or `None`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::{Bar, Interval};

/// Quote assets tried, in order, when resolving a base symbol to a pair.
pub const PREFERRED_QUOTES: &[&str] = &["USDT", "USD", "USDC", "TRY"];

// ============================================================================
// Provider Error
// ============================================================================

/// Errors raised inside adapters. Never crosses the trait boundary.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Connection failed or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 429
    #[error("Rate limited")]
    RateLimited,

    /// Any other non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request was abandoned before completing
    #[error("Request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Check if the error is worth retrying.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Decode(_) | Self::Cancelled => false,
        }
    }
}

// ============================================================================
// Value Types
// ============================================================================

/// Best bid/ask for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookTicker {
    pub bid: f64,
    pub ask: f64,
}

impl BookTicker {
    /// Mid price.
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    /// Spread as a percentage of mid; `None` when mid is not positive.
    pub fn spread_pct(&self) -> Option<f64> {
        let mid = self.mid();
        if mid <= 0.0 {
            return None;
        }
        Some((self.ask - self.bid) / mid * 100.0)
    }
}

/// One row of the market-cap listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketCapEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub fully_diluted_valuation: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
}

/// Market-wide aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalMetrics {
    pub total_market_cap_usd: Option<f64>,
    pub total_volume_usd: Option<f64>,
    /// Reference asset's share of total market cap, in percent (e.g. 49.8)
    pub dominance_pct: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Source of OHLCV bars.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Bars for `pair`, ascending by time. Empty on any failure.
    async fn get_bars(&self, pair: &str, interval: Interval, count: usize) -> Vec<Bar>;
}

/// Exchange order-book facts.
#[async_trait]
pub trait OrderBookProvider: Send + Sync {
    /// Upper-cased pairs currently trading. Empty on failure.
    async fn tradable_symbols(&self) -> HashSet<String>;

    /// Best bid/ask per pair. Empty on failure.
    async fn book_tickers(&self) -> HashMap<String, BookTicker>;

    /// USD liquidity inside the configured band around mid; `None` on failure.
    async fn get_depth(&self, pair: &str, limit: usize) -> Option<f64>;

    /// First `BASE+quote` pair present in `tradable`, following [`PREFERRED_QUOTES`].
    fn pick_preferred_pair(&self, base: &str, tradable: &HashSet<String>) -> Option<String> {
        let base = base.trim().to_uppercase();
        if base.is_empty() {
            return None;
        }
        PREFERRED_QUOTES
            .iter()
            .map(|quote| format!("{}{}", base, quote))
            .find(|pair| tradable.contains(pair))
    }
}

/// Paged market-cap listing.
#[async_trait]
pub trait MarketCapProvider: Send + Sync {
    /// One page of the listing, ordered by market cap. Empty on failure.
    async fn market_caps(&self, page: u32) -> Vec<MarketCapEntry>;

    /// Market-wide aggregates; `None` on failure.
    async fn global_metrics(&self) -> Option<GlobalMetrics>;
}

// ============================================================================
// Tests
// ============================================================================
