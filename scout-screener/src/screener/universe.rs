//! Symbol universe: market-cap pages filtered by liquidity thresholds.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::config::UniverseConfig;
use crate::data::{BookTicker, MarketCapEntry, MarketCapProvider, OrderBookProvider};

/// Paged source of base symbols already past the liquidity pre-filter.
#[async_trait]
pub trait SymbolUniverse: Send + Sync {
    /// Upper-cased base symbols for `page` (1-based). Empty when exhausted
    /// or on failure.
    async fn filtered_symbols(&self, page: u32) -> Vec<String>;
}

/// Market-cap floor given the reference asset's dominance.
pub fn min_market_cap_for(config: &UniverseConfig, dominance_pct: Option<f64>) -> f64 {
    match dominance_pct {
        Some(d) if d >= config.dominance_pivot_pct => config.min_market_cap,
        Some(_) => config.relaxed_min_market_cap,
        None => config.min_market_cap,
    }
}

/// Name exclusions and listing thresholds, before the spread check.
pub fn passes_thresholds(entry: &MarketCapEntry, config: &UniverseConfig, min_market_cap: f64) -> bool {
    let name = entry.name.to_uppercase();
    if config
        .excluded_terms
        .iter()
        .any(|term| name.contains(&term.to_uppercase()))
    {
        return false;
    }

    let mc = entry.market_cap.unwrap_or(0.0);
    let volume = entry.total_volume.unwrap_or(0.0);
    if mc <= 0.0 || volume <= 0.0 {
        return false;
    }
    let fdv = entry.fully_diluted_valuation.unwrap_or(0.0);
    if fdv == 0.0 {
        return false;
    }
    let rank = entry.market_cap_rank.unwrap_or(u32::MAX);

    mc >= min_market_cap
        && volume >= config.min_volume_24h
        && fdv / mc <= config.max_fdv_ratio
        && volume / mc >= config.min_turnover
        && rank <= config.max_rank
}

/// Universe backed by a market-cap listing and exchange book tickers.
///
/// Book tickers and dominance are fetched once and reused for every page.
pub struct MarketCapUniverse {
    caps: Arc<dyn MarketCapProvider>,
    books: Arc<dyn OrderBookProvider>,
    config: UniverseConfig,
    tickers: OnceCell<HashMap<String, BookTicker>>,
    dominance: OnceCell<Option<f64>>,
}

impl MarketCapUniverse {
    pub fn new(
        caps: Arc<dyn MarketCapProvider>,
        books: Arc<dyn OrderBookProvider>,
        config: UniverseConfig,
    ) -> Self {
        Self {
            caps,
            books,
            config,
            tickers: OnceCell::new(),
            dominance: OnceCell::new(),
        }
    }

    async fn tickers(&self) -> &HashMap<String, BookTicker> {
        self.tickers
            .get_or_init(|| async {
                let tickers = self.books.book_tickers().await;
                debug!(count = tickers.len(), "Loaded book tickers");
                tickers
            })
            .await
    }

    async fn dominance(&self) -> Option<f64> {
        *self
            .dominance
            .get_or_init(|| async {
                let dominance = self
                    .caps
                    .global_metrics()
                    .await
                    .and_then(|g| g.dominance_pct);
                info!(
                    dominance_pct = ?dominance,
                    min_market_cap = min_market_cap_for(&self.config, dominance),
                    "Market-cap floor selected"
                );
                dominance
            })
            .await
    }
}

#[async_trait]
impl SymbolUniverse for MarketCapUniverse {
    async fn filtered_symbols(&self, page: u32) -> Vec<String> {
        let entries = self.caps.market_caps(page).await;
        if entries.is_empty() {
            return Vec::new();
        }

        let min_cap = min_market_cap_for(&self.config, self.dominance().await);
        let tickers = self.tickers().await;
        let quote = self.config.quote_asset.to_uppercase();

        let symbols: Vec<String> = entries
            .iter()
            .filter(|e| passes_thresholds(e, &self.config, min_cap))
            .filter_map(|e| {
                let base = e.symbol.trim().to_uppercase();
                let spread = tickers.get(&format!("{}{}", base, quote))?.spread_pct()?;
                (spread <= self.config.max_spread_pct).then_some(base)
            })
            .collect();

        debug!(page, listed = entries.len(), kept = symbols.len(), "Universe page filtered");
        symbols
    }
}
