//! End-to-end tests of the liquidity chart pipeline over mock sources.
//!
//! Exercises the chart service the way the bot does: canned offer and
//! price sources in, a finished curve set out, with caching and
//! partial-failure behavior checked along the way.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use lnhelper::chart::ChartService;
use lnhelper::providers::{OfferSource, PriceSource};
use lnhelper::types::{BudgetSweepSpec, LiquidityCurveSet, Offer, OfferCondition};

// ---------------------------------------------------------------------------
// Mock sources
// ---------------------------------------------------------------------------

struct MockOffers {
    offers: Vec<Offer>,
    calls: AtomicU32,
}

impl MockOffers {
    fn new(offers: Vec<Offer>) -> Arc<Self> {
        Arc::new(Self { offers, calls: AtomicU32::new(0) })
    }
}

#[async_trait]
impl OfferSource for MockOffers {
    async fn fetch_offers(&self) -> Result<Vec<Offer>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.offers.clone())
    }
}

struct FailingOffers;

#[async_trait]
impl OfferSource for FailingOffers {
    async fn fetch_offers(&self) -> Result<Vec<Offer>> {
        anyhow::bail!("offer backend unavailable")
    }
}

struct MockPrice {
    price: f64,
    calls: AtomicU32,
}

impl MockPrice {
    fn new(price: f64) -> Arc<Self> {
        Arc::new(Self { price, calls: AtomicU32::new(0) })
    }
}

#[async_trait]
impl PriceSource for MockPrice {
    async fn btc_usd(&self) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.price)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn make_offer(id: &str, account: &str, min_size: u64, max_size: u64, fee_rate: u64) -> Offer {
    Offer {
        id: id.to_string(),
        account: account.to_string(),
        base_fee: 0,
        fee_rate,
        amboss_fee_rate: 0,
        min_size,
        max_size,
        allow_parallel: true,
        conditions: Vec::new(),
    }
}

fn tor_restricted(mut offer: Offer) -> Offer {
    offer.conditions.push(OfferCondition {
        condition: "NODE_SOCKETS".to_string(),
        operator: "CONTAINS".to_string(),
        value: "CLEARNET".to_string(),
    });
    offer
}

/// alice sells two 40k-sat chunks at 400 sats each, bob one 100k-sat
/// chunk at 3000 sats. bob is Tor-restricted.
fn snapshot() -> Vec<Offer> {
    vec![
        make_offer("a", "alice", 40_000, 80_000, 10_000),
        tor_restricted(make_offer("b", "bob", 100_000, 100_000, 30_000)),
    ]
}

fn small_spec() -> BudgetSweepSpec {
    BudgetSweepSpec {
        range_max_usd: 100.0,
        coarse_step_usd: 25.0,
        fine_samples: 41,
        checkpoints_usd: vec![10.0, 50.0],
    }
}

async fn compute(offers: Vec<Offer>) -> LiquidityCurveSet {
    let service = ChartService::new(
        MockOffers::new(offers),
        MockPrice::new(50_000.0),
        small_spec(),
        Some(60),
    );
    service.curves(None).await.unwrap()
}

fn liquidity_at(set: &LiquidityCurveSet, budget: f64, tor_only: bool) -> f64 {
    let curve = if tor_only { &set.tor_eligible } else { &set.all };
    curve
        .points
        .iter()
        .find(|p| p.budget_usd == budget)
        .map(|p| p.liquidity_usd)
        .unwrap_or_else(|| panic!("no point at ${budget}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_end_to_end_curve_values() {
    let set = compute(snapshot()).await;

    assert_eq!(set.total_offers, 2);
    assert_eq!(set.restricted_offers, 1);
    assert_eq!(set.all.points.len(), 41);
    assert_eq!(set.tor_eligible.points.len(), 41);

    // At 50k USD/BTC, $25 buys everything: 180k sats ($90) overall,
    // 80k sats ($40) Tor-eligible.
    assert_eq!(liquidity_at(&set, 0.0, false), 0.0);
    assert!((liquidity_at(&set, 25.0, false) - 90.0).abs() < 1e-9);
    assert!((liquidity_at(&set, 100.0, false) - 90.0).abs() < 1e-9);
    assert!((liquidity_at(&set, 25.0, true) - 40.0).abs() < 1e-9);

    // The dense curve interpolates between solver knots.
    assert!((liquidity_at(&set, 12.5, false) - 45.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_all_curve_dominates_tor_eligible() {
    let set = compute(snapshot()).await;
    for (all, tor) in set.all.points.iter().zip(&set.tor_eligible.points) {
        assert_eq!(all.budget_usd, tor.budget_usd);
        assert!(all.liquidity_usd >= tor.liquidity_usd - 1e-9);
    }
}

#[tokio::test]
async fn test_curves_are_monotone_and_bounded() {
    let set = compute(snapshot()).await;
    for curve in [&set.all, &set.tor_eligible] {
        let peak = curve.max_liquidity_usd();
        for pair in curve.points.windows(2) {
            assert!(pair[1].liquidity_usd >= pair[0].liquidity_usd - 1e-9);
        }
        for point in &curve.points {
            assert!(point.liquidity_usd >= 0.0);
            assert!(point.liquidity_usd <= peak + 1e-9);
        }
    }
}

#[tokio::test]
async fn test_annotations_only_on_grid_checkpoints() {
    let set = compute(snapshot()).await;

    // $10 is off the 25-step coarse grid, $50 is on it.
    for curve in [&set.all, &set.tor_eligible] {
        assert!(curve.annotations.iter().all(|a| a.budget_usd != 10.0));
    }
    let annotation = set
        .all
        .annotations
        .iter()
        .find(|a| a.budget_usd == 50.0)
        .expect("fee annotation at $50");
    // 3800 sats of fees on 180k sats of liquidity.
    assert!((annotation.fee_percent - 100.0 * 3800.0 / 180_000.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_empty_snapshot_yields_flat_curves() {
    let set = compute(Vec::new()).await;
    assert_eq!(set.total_offers, 0);
    assert_eq!(set.restricted_offers, 0);
    assert!(set.all.points.iter().all(|p| p.liquidity_usd == 0.0));
    assert!(set.all.annotations.is_empty());
    assert!(set.tor_eligible.annotations.is_empty());
}

#[tokio::test]
async fn test_cache_prevents_refetch() {
    let offers = MockOffers::new(snapshot());
    let price = MockPrice::new(50_000.0);
    let service = ChartService::new(offers.clone(), price.clone(), small_spec(), Some(60));

    let first = service.curves(None).await.unwrap();
    let second = service.curves(None).await.unwrap();

    assert_eq!(offers.calls.load(Ordering::SeqCst), 1);
    assert_eq!(price.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.all.points.len(), second.all.points.len());
    assert_eq!(first.total_offers, second.total_offers);
}

#[tokio::test]
async fn test_offer_failure_surfaces_as_error() {
    let service = ChartService::new(
        Arc::new(FailingOffers),
        MockPrice::new(50_000.0),
        small_spec(),
        Some(60),
    );
    let result = service.curves(None).await;
    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("offer backend unavailable"));
}

#[tokio::test]
async fn test_progress_stages_reach_subscriber() {
    let service = ChartService::new(
        MockOffers::new(snapshot()),
        MockPrice::new(50_000.0),
        small_spec(),
        Some(60),
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    service.curves(Some(&tx)).await.unwrap();
    drop(tx);

    let mut stages = Vec::new();
    while let Some(stage) = rx.recv().await {
        stages.push(stage);
    }
    assert_eq!(stages.len(), 3);
    assert!(stages[0].contains("BTC price"));
    assert!(stages[2].contains("purchasing power"));
}

#[tokio::test]
async fn test_min_size_zero_offer_is_dropped() {
    let mut offers = snapshot();
    offers.push(make_offer("z", "zero", 0, 1_000_000, 10));
    let set = compute(offers).await;
    // The degenerate offer neither counts nor contributes.
    assert_eq!(set.total_offers, 2);
    assert!((liquidity_at(&set, 25.0, false) - 90.0).abs() < 1e-9);
}
