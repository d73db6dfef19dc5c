//! Market data module.
//!
//! Bars, intervals, and the collaborator traits the screener consumes, plus
//! the REST adapters that implement them.
//!
//! # Data Sources
//! - **Binance** (exchange): klines, tradable symbols, book tickers, order-book depth
//! - **CoinGecko** (market cap): paged market-cap listing and global dominance
//!
//! Adapters absorb transport faults and hand the core empty collections or
//! `None`; they never return errors across the trait boundary.

mod binance;
mod coingecko;
mod http;
mod provider;

pub use binance::{compute_depth_usd, BinanceAdapter};
pub use coingecko::CoinGeckoAdapter;
pub use http::{backoff_delay, HttpFetcher};
pub use provider::{
    BookTicker, GlobalMetrics, MarketCapEntry, MarketCapProvider, MarketDataProvider,
    OrderBookProvider, ProviderError, PREFERRED_QUOTES,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Core Data Types
// ============================================================================

/// Bar interval supported by the screener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// 4-hour bars
    #[serde(rename = "4h")]
    H4,
    /// Daily bars
    #[serde(rename = "1d")]
    D1,
}

impl Interval {
    /// Exchange API interval string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }

    /// Bars spanning the seven-day relative-strength window.
    pub fn rs_lookback_bars(&self) -> usize {
        match self {
            Self::H4 => 42,
            Self::D1 => 7,
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::H4
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "4h" | "h4" | "240m" => Ok(Self::H4),
            "1d" | "d" | "d1" | "daily" => Ok(Self::D1),
            _ => Err(format!("Unsupported interval: {} (expected 4h or 1d)", s)),
        }
    }
}

/// A single OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Whether every price and volume field is a finite number.
    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Midpoint of the bar's range.
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

/// Sort ascending by time and drop repeated timestamps.
pub fn normalize_bars(bars: &mut Vec<Bar>) {
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
}
