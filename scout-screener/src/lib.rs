//! Coin Scout Library
//!
//! Screens exchange-listed crypto assets for early trend candidates: a
//! market-cap universe is filtered for liquidity, each symbol's bars pass
//! through a chop guard, a rule gate and a composite scorer, and the ranked
//! result is checked against order-book depth.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      coin-scout (batch run)                         │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐     │
//! │  │  Market Data    │  │  Indicators     │  │  Screener       │     │
//! │  │  (REST adapters)│  │  (bar series)   │  │  (pipeline)     │     │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod indicators;
pub mod screener;

use scout_common::config::Config;
use std::sync::Arc;
use std::time::Duration;

use crate::data::{BinanceAdapter, CoinGeckoAdapter, HttpFetcher};
use crate::indicators::StandardIndicators;
use crate::screener::{
    AbortHandle, MarketCapUniverse, RunBudget, ScanReport, ScreenerConfig, ScreenerEngine,
};

/// Scout service: adapters wired to the screening engine.
pub struct ScoutService {
    fetcher: Arc<HttpFetcher>,
    engine: ScreenerEngine,
}

impl ScoutService {
    /// Wire the REST adapters and the engine from configuration.
    pub fn new(config: &Config, screener: ScreenerConfig) -> Self {
        let fetcher = Arc::new(HttpFetcher::new(&config.http));

        let exchange = Arc::new(BinanceAdapter::new(
            Arc::clone(&fetcher),
            screener.endpoints.exchange.clone(),
            screener.depth.band_pct,
        ));
        let caps = Arc::new(CoinGeckoAdapter::new(
            Arc::clone(&fetcher),
            screener.endpoints.market_cap.clone(),
            screener.universe.per_page,
            screener.universe.dominance_asset.clone(),
        ));
        let universe = Arc::new(MarketCapUniverse::new(
            caps,
            exchange.clone(),
            screener.universe.clone(),
        ));
        let indicators = Arc::new(StandardIndicators::new(screener.indicators.clone()));

        let engine = ScreenerEngine::new(screener, universe, exchange.clone(), exchange, indicators);

        Self { fetcher, engine }
    }

    /// Shared HTTP transport; closing it cancels queued requests.
    pub fn fetcher(&self) -> Arc<HttpFetcher> {
        Arc::clone(&self.fetcher)
    }

    /// Budget for one run using the configured timeout.
    pub fn budget(&self) -> (RunBudget, AbortHandle) {
        RunBudget::new(Duration::from_secs(
            self.engine.config().pipeline.run_timeout_secs,
        ))
    }

    /// Run one scan.
    pub async fn run(&self, budget: &RunBudget) -> ScanReport {
        self.engine.run(budget).await
    }
}
