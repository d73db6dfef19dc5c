//! Binance spot REST adapter.
//!
//! # Endpoints
//! - `GET /klines` - OHLCV rows `[openTime, open, high, low, close, volume, ...]`
//! - `GET /exchangeInfo` - symbol list with trading status
//! - `GET /ticker/bookTicker` - best bid/ask for every pair
//! - `GET /depth` - order-book levels as `[price, qty]` string pairs

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use super::http::HttpFetcher;
use super::provider::{BookTicker, MarketDataProvider, OrderBookProvider, ProviderError};
use super::{normalize_bars, Bar, Interval};

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    #[serde(default)]
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookTickerRow {
    symbol: String,
    bid_price: String,
    ask_price: String,
}

#[derive(Debug, Default, Deserialize)]
struct OrderBook {
    #[serde(default)]
    bids: Vec<[String; 2]>,
    #[serde(default)]
    asks: Vec<[String; 2]>,
}

// ============================================================================
// Parsing
// ============================================================================

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn parse_kline(row: &[Value]) -> Option<Bar> {
    if row.len() < 6 {
        return None;
    }
    let open_time = row[0].as_i64()?;
    let timestamp = Utc.timestamp_millis_opt(open_time).single()?;
    Some(Bar {
        timestamp,
        open: number(&row[1])?,
        high: number(&row[2])?,
        low: number(&row[3])?,
        close: number(&row[4])?,
        volume: number(&row[5])?,
    })
}

/// Parse kline rows, skipping malformed ones, sorted and deduplicated.
fn parse_klines(rows: &[Vec<Value>]) -> Vec<Bar> {
    let mut bars: Vec<Bar> = rows.iter().filter_map(|row| parse_kline(row)).collect();
    normalize_bars(&mut bars);
    bars
}

fn level(raw: &[String; 2]) -> Option<(f64, f64)> {
    Some((raw[0].parse().ok()?, raw[1].parse().ok()?))
}

/// USD liquidity within `band_pct` of mid.
///
/// Bids are scanned best-first (descending) and asks best-first (ascending);
/// each side stops at the first level outside the band. `None` when either
/// side is empty or the top of book is invalid.
pub fn compute_depth_usd(bids: &[[String; 2]], asks: &[[String; 2]], band_pct: f64) -> Option<f64> {
    let (best_bid, _) = level(bids.first()?)?;
    let (best_ask, _) = level(asks.first()?)?;
    if best_bid <= 0.0 || best_ask <= 0.0 || best_ask < best_bid {
        return None;
    }

    let mid = (best_bid + best_ask) / 2.0;
    let lower = mid * (1.0 - band_pct / 100.0);
    let upper = mid * (1.0 + band_pct / 100.0);

    let mut total = 0.0;
    for (price, qty) in bids.iter().filter_map(level) {
        if price < lower {
            break;
        }
        if price <= mid {
            total += price * qty;
        }
    }
    for (price, qty) in asks.iter().filter_map(level) {
        if price > upper {
            break;
        }
        if price >= mid {
            total += price * qty;
        }
    }

    Some(total)
}

// ============================================================================
// Binance Adapter
// ============================================================================

/// Binance adapter for bars and order-book facts.
pub struct BinanceAdapter {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
    depth_band_pct: f64,
}

impl BinanceAdapter {
    /// Create an adapter against `base_url` (e.g. `https://api.binance.com/api/v3`).
    pub fn new(fetcher: Arc<HttpFetcher>, base_url: impl Into<String>, depth_band_pct: f64) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            depth_band_pct,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn fetch_klines(
        &self,
        pair: &str,
        interval: Interval,
        count: usize,
    ) -> Result<Vec<Bar>, ProviderError> {
        let rows: Vec<Vec<Value>> = self
            .fetcher
            .get_json(
                &self.url("/klines"),
                &[
                    ("symbol", pair.to_string()),
                    ("interval", interval.as_str().to_string()),
                    ("limit", count.min(1000).to_string()),
                ],
            )
            .await?;
        Ok(parse_klines(&rows))
    }

    async fn fetch_tradable(&self) -> Result<HashSet<String>, ProviderError> {
        let info: ExchangeInfo = self.fetcher.get_json(&self.url("/exchangeInfo"), &[]).await?;
        Ok(info
            .symbols
            .into_iter()
            .filter(|s| s.status.eq_ignore_ascii_case("TRADING"))
            .map(|s| s.symbol.to_uppercase())
            .collect())
    }

    async fn fetch_book_tickers(&self) -> Result<HashMap<String, BookTicker>, ProviderError> {
        let rows: Vec<BookTickerRow> = self
            .fetcher
            .get_json(&self.url("/ticker/bookTicker"), &[])
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let bid: f64 = row.bid_price.parse().ok()?;
                let ask: f64 = row.ask_price.parse().ok()?;
                (bid > 0.0 && ask > 0.0 && ask >= bid)
                    .then(|| (row.symbol.to_uppercase(), BookTicker { bid, ask }))
            })
            .collect())
    }

    async fn fetch_depth(&self, pair: &str, limit: usize) -> Result<Option<f64>, ProviderError> {
        let book: OrderBook = self
            .fetcher
            .get_json(
                &self.url("/depth"),
                &[("symbol", pair.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(compute_depth_usd(&book.bids, &book.asks, self.depth_band_pct))
    }
}

#[async_trait]
impl MarketDataProvider for BinanceAdapter {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn get_bars(&self, pair: &str, interval: Interval, count: usize) -> Vec<Bar> {
        match self.fetch_klines(pair, interval, count).await {
            Ok(bars) => bars,
            Err(e) => {
                debug!(pair, error = %e, "Kline fetch failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl OrderBookProvider for BinanceAdapter {
    async fn tradable_symbols(&self) -> HashSet<String> {
        self.fetch_tradable().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load tradable symbols");
            HashSet::new()
        })
    }

    async fn book_tickers(&self) -> HashMap<String, BookTicker> {
        self.fetch_book_tickers().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load book tickers");
            HashMap::new()
        })
    }

    async fn get_depth(&self, pair: &str, limit: usize) -> Option<f64> {
        match self.fetch_depth(pair, limit).await {
            Ok(depth) => depth,
            Err(e) => {
                debug!(pair, error = %e, "Depth fetch failed");
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
