//! CoinGecko REST adapter for the market-cap listing.
//!
//! # Endpoints
//! - `GET /coins/markets` - paged listing ordered by market cap
//! - `GET /global` - total market cap, volume, and per-asset dominance

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::http::HttpFetcher;
use super::provider::{GlobalMetrics, MarketCapEntry, MarketCapProvider, ProviderError};

#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: Option<GlobalData>,
}

#[derive(Debug, Default, Deserialize)]
struct GlobalData {
    #[serde(default)]
    total_market_cap: HashMap<String, f64>,
    #[serde(default)]
    total_volume: HashMap<String, f64>,
    #[serde(default)]
    market_cap_percentage: HashMap<String, f64>,
    #[serde(default)]
    updated_at: Option<i64>,
}

impl GlobalData {
    fn into_metrics(self, dominance_asset: &str) -> GlobalMetrics {
        GlobalMetrics {
            total_market_cap_usd: self.total_market_cap.get("usd").copied(),
            total_volume_usd: self.total_volume.get("usd").copied(),
            dominance_pct: self.market_cap_percentage.get(dominance_asset).copied(),
            updated_at: self
                .updated_at
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        }
    }
}

/// CoinGecko adapter.
pub struct CoinGeckoAdapter {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
    per_page: u32,
    dominance_asset: String,
}

impl CoinGeckoAdapter {
    /// Create an adapter against `base_url` (e.g. `https://api.coingecko.com/api/v3`).
    pub fn new(
        fetcher: Arc<HttpFetcher>,
        base_url: impl Into<String>,
        per_page: u32,
        dominance_asset: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            per_page,
            dominance_asset: dominance_asset.into().to_lowercase(),
        }
    }

    async fn fetch_markets(&self, page: u32) -> Result<Vec<MarketCapEntry>, ProviderError> {
        self.fetcher
            .get_json(
                &format!("{}/coins/markets", self.base_url),
                &[
                    ("vs_currency", "usd".to_string()),
                    ("order", "market_cap_desc".to_string()),
                    ("per_page", self.per_page.to_string()),
                    ("page", page.to_string()),
                    ("sparkline", "false".to_string()),
                ],
            )
            .await
    }

    async fn fetch_global(&self) -> Result<GlobalMetrics, ProviderError> {
        let response: GlobalResponse = self
            .fetcher
            .get_json(&format!("{}/global", self.base_url), &[])
            .await?;
        Ok(response
            .data
            .unwrap_or_default()
            .into_metrics(&self.dominance_asset))
    }
}

#[async_trait]
impl MarketCapProvider for CoinGeckoAdapter {
    async fn market_caps(&self, page: u32) -> Vec<MarketCapEntry> {
        match self.fetch_markets(page).await {
            Ok(entries) => {
                debug!(page, count = entries.len(), "Loaded market-cap page");
                entries
            }
            Err(e) => {
                warn!(page, error = %e, "Market-cap page fetch failed");
                Vec::new()
            }
        }
    }

    async fn global_metrics(&self) -> Option<GlobalMetrics> {
        match self.fetch_global().await {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!(error = %e, "Global metrics fetch failed");
                None
            }
        }
    }
}
