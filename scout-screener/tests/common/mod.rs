//! Shared in-memory providers for pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scout_screener::data::{Bar, BookTicker, Interval, MarketDataProvider, OrderBookProvider};
use scout_screener::indicators::{
    ChannelValue, IndicatorError, IndicatorSnapshot, IndicatorSource, MomentumValue,
    OscillatorValue, TrendBand, VolatilityBand,
};
use scout_screener::screener::{ScreenerConfig, ScreenerEngine, SymbolUniverse};

/// Hourly bars starting at `start`, each close `step` (fractional) above the first.
pub fn rising_bars(start: f64, n: usize, step: f64) -> Vec<Bar> {
    let t0 = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default();
    (0..n)
        .map(|i| {
            let close = start * (1.0 + step * i as f64);
            Bar {
                timestamp: t0 + ChronoDuration::hours(i as i64),
                open: close * 0.999,
                high: close * 1.002,
                low: close * 0.998,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

// ============================================================================
// Universe
// ============================================================================

/// Fixed symbol list per page; pages beyond the map are empty.
pub struct PagedUniverse {
    pages: HashMap<u32, Vec<String>>,
    pub calls: AtomicUsize,
}

impl PagedUniverse {
    pub fn new(pages: &[&[&str]]) -> Arc<Self> {
        let pages = pages
            .iter()
            .enumerate()
            .map(|(i, symbols)| {
                (i as u32 + 1, symbols.iter().map(|s| s.to_string()).collect())
            })
            .collect();
        Arc::new(Self { pages, calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl SymbolUniverse for PagedUniverse {
    async fn filtered_symbols(&self, page: u32) -> Vec<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages.get(&page).cloned().unwrap_or_default()
    }
}

// ============================================================================
// Market data
// ============================================================================

/// Serves rising bars for every pair; pairs in `slow` hang for an hour first.
pub struct StubMarket {
    starts: HashMap<String, f64>,
    slow: HashSet<String>,
    bars: usize,
    step: f64,
}

impl StubMarket {
    pub fn new() -> Self {
        Self { starts: HashMap::new(), slow: HashSet::new(), bars: 120, step: 0.001 }
    }

    pub fn with_start(mut self, pair: &str, start: f64) -> Self {
        self.starts.insert(pair.to_string(), start);
        self
    }

    pub fn with_slow(mut self, pair: &str) -> Self {
        self.slow.insert(pair.to_string());
        self
    }

    pub fn with_bar_count(mut self, bars: usize) -> Self {
        self.bars = bars;
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }
}

#[async_trait]
impl MarketDataProvider for StubMarket {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn get_bars(&self, pair: &str, _interval: Interval, count: usize) -> Vec<Bar> {
        if self.slow.contains(pair) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let start = self.starts.get(pair).copied().unwrap_or(200.0);
        rising_bars(start, self.bars.min(count), self.step)
    }
}

// ============================================================================
// Order books
// ============================================================================

/// Every symbol trades against USDT; depth comes from a fixed table.
pub struct StubBooks {
    depths: HashMap<String, f64>,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub lookups: Mutex<Vec<String>>,
}

impl StubBooks {
    pub fn new(depths: &[(&str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            depths: depths.iter().map(|(p, d)| (p.to_string(), *d)).collect(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            lookups: Mutex::new(Vec::new()),
        })
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().map(|l| l.len()).unwrap_or(0)
    }
}

#[async_trait]
impl OrderBookProvider for StubBooks {
    async fn tradable_symbols(&self) -> HashSet<String> {
        ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF", "GGG", "HHH", "BTC"]
            .iter()
            .map(|s| format!("{}USDT", s))
            .collect()
    }

    async fn book_tickers(&self) -> HashMap<String, BookTicker> {
        HashMap::new()
    }

    async fn get_depth(&self, pair: &str, _limit: usize) -> Option<f64> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Ok(mut lookups) = self.lookups.lock() {
            lookups.push(pair.to_string());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.depths.get(pair).copied()
    }
}

// ============================================================================
// Indicators
// ============================================================================

/// Bullish snapshot scaled to each bar's close: momentum line above signal,
/// support below price, price mid-channel, wide volatility band.
pub struct BullishIndicators;

impl IndicatorSource for BullishIndicators {
    fn compute(&self, bars: &[Bar]) -> Result<Vec<IndicatorSnapshot>, IndicatorError> {
        Ok(bars
            .iter()
            .map(|b| IndicatorSnapshot {
                timestamp: b.timestamp,
                momentum: Some(MomentumValue { line: 0.3, signal: 0.1 }),
                trend: TrendBand {
                    value: Some(b.close * 0.9),
                    upper: None,
                    lower: Some(b.close * 0.9),
                },
                channel: ChannelValue {
                    upper: Some(b.close * 1.2),
                    lower: Some(b.close * 0.8),
                },
                oscillator: Some(OscillatorValue::percent(60.0, 40.0)),
                volatility: Some(VolatilityBand {
                    upper: b.close * 1.3,
                    lower: b.close * 0.7,
                    mid: b.close,
                }),
            })
            .collect())
    }
}

/// Flat, narrow-band snapshots whose trend flips every three bars.
pub struct ChoppyIndicators;

impl IndicatorSource for ChoppyIndicators {
    fn compute(&self, bars: &[Bar]) -> Result<Vec<IndicatorSnapshot>, IndicatorError> {
        let mut snapshots = BullishIndicators.compute(bars)?;
        for (i, s) in snapshots.iter_mut().enumerate() {
            let close = bars[i].close;
            s.volatility = Some(VolatilityBand {
                upper: close * 1.01,
                lower: close * 0.99,
                mid: close,
            });
            if (i / 3) % 2 == 1 {
                s.trend = TrendBand {
                    value: Some(close * 1.01),
                    upper: Some(close * 1.01),
                    lower: None,
                };
            }
        }
        Ok(snapshots)
    }
}

/// Screener defaults with a small deterministic pipeline.
pub fn test_config() -> ScreenerConfig {
    let mut config = ScreenerConfig::default();
    config.pipeline.max_pages = 10;
    config.pipeline.early_stop_min_page = 4;
    config.pipeline.early_stop_streak = 2;
    config.pipeline.symbol_concurrency = 4;
    config.depth.min_usd = 100_000.0;
    config
}

pub fn engine(
    config: ScreenerConfig,
    universe: Arc<PagedUniverse>,
    market: StubMarket,
    books: Arc<StubBooks>,
    indicators: Arc<dyn IndicatorSource>,
) -> ScreenerEngine {
    ScreenerEngine::new(config, universe, Arc::new(market), books, indicators)
}
