//! End-to-end pipeline behaviour against in-memory providers.

mod common;

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{
    engine, test_config, BullishIndicators, ChoppyIndicators, PagedUniverse, StubBooks, StubMarket,
};
use scout_screener::screener::{RunBudget, ScanReport};

const DEEP: f64 = 1_000_000.0;

fn all_deep() -> Arc<StubBooks> {
    StubBooks::new(&[
        ("AAAUSDT", DEEP),
        ("BBBUSDT", DEEP),
        ("CCCUSDT", DEEP),
        ("DDDUSDT", DEEP),
        ("EEEUSDT", DEEP),
        ("FFFUSDT", DEEP),
    ])
}

fn symbols(report: &ScanReport) -> BTreeSet<String> {
    report.candidates.iter().map(|c| c.symbol.clone()).collect()
}

async fn run_once(
    config: scout_screener::screener::ScreenerConfig,
    universe: Arc<PagedUniverse>,
    market: StubMarket,
    books: Arc<StubBooks>,
) -> ScanReport {
    let engine = engine(config, universe, market, books, Arc::new(BullishIndicators));
    let (budget, _abort) = RunBudget::new(Duration::from_secs(600));
    engine.run(&budget).await
}

#[tokio::test]
async fn test_dedup_across_pages_and_early_stop() {
    let universe = PagedUniverse::new(&[
        &["AAA", "BBB"],
        &["BBB", "CCC"],
        &["AAA"],
        &["CCC"],
        &["DDD"],
    ]);
    let report = run_once(test_config(), Arc::clone(&universe), StubMarket::new(), all_deep()).await;

    assert!(report.early_stopped);
    assert!(!report.cancelled);
    assert!(report.depth_checked);
    assert_eq!(report.pages_scanned, 4);
    assert_eq!(universe.calls.load(Ordering::SeqCst), 4);
    assert_eq!(
        symbols(&report),
        ["AAA", "BBB", "CCC"].iter().map(|s| s.to_string()).collect()
    );
    assert_eq!(report.candidates.len(), 3);
    assert_eq!(report.pages[1].new_unique, 1);
    assert_eq!(report.pages[2].new_unique, 0);
    assert_eq!(report.drops.candidates, 6);
}

#[tokio::test]
async fn test_empty_pages_before_min_page_do_not_stop() {
    let universe = PagedUniverse::new(&[&["AAA"], &[], &[]]);
    let report = run_once(test_config(), Arc::clone(&universe), StubMarket::new(), all_deep()).await;

    assert!(report.early_stopped);
    assert_eq!(report.pages_scanned, 4);
    assert_eq!(report.candidates.len(), 1);
}

#[tokio::test]
async fn test_max_pages_bounds_scan() {
    let universe = PagedUniverse::new(&[&["AAA"], &["BBB"], &["CCC"], &["DDD"], &["EEE"]]);
    let mut config = test_config();
    config.pipeline.max_pages = 3;
    let report = run_once(config, Arc::clone(&universe), StubMarket::new(), all_deep()).await;

    assert!(!report.early_stopped);
    assert_eq!(report.pages_scanned, 3);
    assert_eq!(universe.calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.candidates.len(), 3);
}

#[tokio::test]
async fn test_candidates_ranked_by_score() {
    let universe = PagedUniverse::new(&[&["BBB", "AAA", "CCC"]]);
    let market = StubMarket::new()
        .with_start("AAAUSDT", 150.0)
        .with_start("BBBUSDT", 300.0)
        .with_start("CCCUSDT", 600.0);
    let mut config = test_config();
    config.pipeline.max_pages = 1;
    let report = run_once(config, universe, market, all_deep()).await;

    let order: Vec<&str> = report.candidates.iter().map(|c| c.symbol.as_str()).collect();
    assert_eq!(order, vec!["AAA", "BBB", "CCC"]);
    assert!(report
        .candidates
        .windows(2)
        .all(|w| w[0].score >= w[1].score));
    assert!(report.candidates.iter().all(|c| c.pair == format!("{}USDT", c.symbol)));
}

#[tokio::test(start_paused = true)]
async fn test_depth_result_independent_of_concurrency() {
    let books = || {
        StubBooks::new(&[
            ("AAAUSDT", 500_000.0),
            ("BBBUSDT", 50_000.0),
            ("DDDUSDT", 200_000.0),
            ("EEEUSDT", 100_000.0),
            ("FFFUSDT", 99_999.0),
        ])
    };
    let pages: &[&[&str]] = &[&["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"]];

    let mut outcomes = Vec::new();
    for k in [1usize, 6] {
        let mut config = test_config();
        config.pipeline.max_pages = 1;
        config.depth.max_concurrent = k;
        let books = books();
        let report = run_once(config, PagedUniverse::new(pages), StubMarket::new(), Arc::clone(&books)).await;

        assert!(report.depth_checked);
        assert_eq!(books.lookup_count(), 6);
        assert!(books.peak.load(Ordering::SeqCst) <= k);
        assert_eq!(report.drops.depth_rejected, 3);
        outcomes.push(symbols(&report));
    }

    assert_eq!(outcomes[0], outcomes[1]);
    assert_eq!(
        outcomes[0],
        ["AAA", "DDD", "EEE"].iter().map(|s| s.to_string()).collect()
    );
}

#[tokio::test(start_paused = true)]
async fn test_depth_checks_only_top_n() {
    let mut config = test_config();
    config.pipeline.max_pages = 1;
    config.depth.top_n = 2;
    let market = StubMarket::new()
        .with_start("AAAUSDT", 150.0)
        .with_start("BBBUSDT", 300.0)
        .with_start("CCCUSDT", 600.0);
    let books = all_deep();
    let report = run_once(
        config,
        PagedUniverse::new(&[&["AAA", "BBB", "CCC"]]),
        market,
        Arc::clone(&books),
    )
    .await;

    assert_eq!(books.lookup_count(), 2);
    assert_eq!(
        symbols(&report),
        ["AAA", "BBB"].iter().map(|s| s.to_string()).collect()
    );
}

#[tokio::test(start_paused = true)]
async fn test_timeout_returns_partial_candidates_without_depth() {
    let universe = PagedUniverse::new(&[&["AAA", "BBB"], &["CCC"], &["DDD"]]);
    let market = StubMarket::new().with_slow("CCCUSDT");
    let books = all_deep();
    let engine = engine(
        test_config(),
        Arc::clone(&universe),
        market,
        Arc::clone(&books),
        Arc::new(BullishIndicators),
    );

    let (budget, _abort) = RunBudget::new(Duration::from_secs(600));
    let report = engine.run(&budget).await;

    assert!(report.cancelled);
    assert!(!report.depth_checked);
    assert!(!report.early_stopped);
    assert_eq!(report.pages_scanned, 2);
    assert_eq!(report.drops.cancelled, 1);
    assert_eq!(books.lookup_count(), 0);
    assert_eq!(
        symbols(&report),
        ["AAA", "BBB"].iter().map(|s| s.to_string()).collect()
    );
}

#[tokio::test]
async fn test_abort_before_start_scans_nothing() {
    let universe = PagedUniverse::new(&[&["AAA"]]);
    let engine = engine(
        test_config(),
        Arc::clone(&universe),
        StubMarket::new(),
        all_deep(),
        Arc::new(BullishIndicators),
    );

    let (budget, abort) = RunBudget::new(Duration::from_secs(600));
    abort.abort();
    let report = engine.run(&budget).await;

    assert!(report.cancelled);
    assert!(!report.depth_checked);
    assert_eq!(report.pages_scanned, 0);
    assert!(report.candidates.is_empty());
    assert_eq!(universe.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_chop_symbols_are_guard_rejected() {
    let universe = PagedUniverse::new(&[&["AAA", "BBB"]]);
    let mut config = test_config();
    config.pipeline.max_pages = 1;
    let engine = engine(
        config,
        universe,
        StubMarket::new().with_step(0.0),
        all_deep(),
        Arc::new(ChoppyIndicators),
    );

    let (budget, _abort) = RunBudget::new(Duration::from_secs(600));
    let report = engine.run(&budget).await;

    assert!(report.candidates.is_empty());
    assert_eq!(report.drops.guard_rejected, 2);
}

#[tokio::test]
async fn test_short_history_and_missing_pair_are_insufficient_data() {
    let universe = PagedUniverse::new(&[&["AAA", "ZZZ"]]);
    let mut config = test_config();
    config.pipeline.max_pages = 1;
    let report = run_once(
        config,
        universe,
        StubMarket::new().with_bar_count(20),
        all_deep(),
    )
    .await;

    assert!(report.candidates.is_empty());
    assert_eq!(report.drops.insufficient_data, 2);
    assert_eq!(report.drops.evaluated(), 2);
}

#[tokio::test]
async fn test_repeated_symbols_within_page_evaluated_once() {
    let universe = PagedUniverse::new(&[&["AAA", "aaa", "BBB", "AAA"]]);
    let mut config = test_config();
    config.pipeline.max_pages = 1;
    let report = run_once(config, universe, StubMarket::new(), all_deep()).await;

    assert_eq!(report.pages[0].symbols, 2);
    assert_eq!(report.drops.evaluated(), 2);
    assert_eq!(report.drops.candidates, 2);
    assert_eq!(
        symbols(&report),
        ["AAA", "BBB"].iter().map(|s| s.to_string()).collect()
    );
}

#[tokio::test(start_paused = true)]
async fn test_page_timeout_abandons_only_that_page() {
    let universe = PagedUniverse::new(&[&["AAA"], &["BBB", "CCC"], &["DDD"]]);
    let mut config = test_config();
    config.pipeline.max_pages = 3;
    config.pipeline.page_timeout_secs = Some(30);
    let books = all_deep();
    let report = run_once(
        config,
        universe,
        StubMarket::new().with_slow("CCCUSDT"),
        Arc::clone(&books),
    )
    .await;

    assert_eq!(report.pages_scanned, 3);
    assert!(!report.cancelled);
    assert!(report.depth_checked);
    assert!(report.pages[1].cancelled);
    assert!(!report.pages[2].cancelled);
    assert_eq!(report.drops.cancelled, 1);
    assert_eq!(books.lookup_count(), 3);
    assert_eq!(
        symbols(&report),
        ["AAA", "BBB", "DDD"].iter().map(|s| s.to_string()).collect()
    );
}
