//! Budget sweep and curve construction.
//!
//! Runs the knapsack solver over a coarse budget grid for the two offer
//! universes (all offers, Tor-eligible only), densifies the resulting
//! liquidity series by piecewise-linear interpolation, and annotates
//! checkpoint budgets with the realized fee percentage.

use tracing::{debug, info, warn};

use super::chunks::{self, Chunk};
use super::classify::is_network_restricted;
use super::knapsack;
use super::units::{sats_to_usd, usd_to_sats};
use crate::types::{
    BudgetSweepSpec, CurvePoint, FeeAnnotation, LiquidityCurve, LiquidityCurveSet, Offer,
};

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

/// Compute both purchasing-power curves from one offer snapshot.
///
/// Offers that cannot form a chunk (`min_size == 0`) are dropped before
/// anything else so the curves and the reported counts agree. Each
/// universe is expanded once and the chunk set reused across budgets;
/// the expansion never depends on the budget.
pub fn sample_curves(offers: &[Offer], btc_usd: f64, spec: &BudgetSweepSpec) -> LiquidityCurveSet {
    let mut usable: Vec<Offer> = Vec::with_capacity(offers.len());
    for offer in offers {
        if offer.min_size == 0 {
            warn!(offer_id = %offer.id, "Offer has min_size 0, excluded from sweep");
        } else {
            usable.push(offer.clone());
        }
    }

    // Cheapest liquidity first. The stable order fixes the solver's
    // tie-break between equally attractive chunks.
    usable.sort_by(|a, b| chunks::price_per_sat(a).total_cmp(&chunks::price_per_sat(b)));

    let tor_eligible: Vec<Offer> = usable
        .iter()
        .filter(|o| !is_network_restricted(o))
        .cloned()
        .collect();
    let restricted_offers = usable.len() - tor_eligible.len();

    let all_chunks = chunks::expand_offers(&usable, true);
    let tor_chunks = chunks::expand_offers(&tor_eligible, true);

    let coarse = coarse_budgets(spec);
    let all_series = solve_series(&coarse, &all_chunks, btc_usd);
    let tor_series = solve_series(&coarse, &tor_chunks, btc_usd);

    let fine = fine_budgets(spec);
    let set = LiquidityCurveSet {
        tor_eligible: build_curve(&coarse, &tor_series, &fine, spec),
        all: build_curve(&coarse, &all_series, &fine, spec),
        total_offers: usable.len(),
        restricted_offers,
    };

    info!(
        total_offers = set.total_offers,
        restricted_offers = set.restricted_offers,
        coarse_points = coarse.len(),
        fine_points = fine.len(),
        "Purchasing-power sweep complete"
    );
    set
}

/// Liquidity and cost at each coarse budget, both in USD.
struct CoarseSeries {
    liquidity_usd: Vec<f64>,
    cost_usd: Vec<f64>,
}

fn solve_series(coarse: &[f64], chunks: &[Chunk], btc_usd: f64) -> CoarseSeries {
    let mut liquidity_usd = Vec::with_capacity(coarse.len());
    let mut cost_usd = Vec::with_capacity(coarse.len());
    for &budget_usd in coarse {
        let budget_sats = usd_to_sats(budget_usd, btc_usd);
        let solution = knapsack::solve(budget_sats, chunks);
        debug!(
            budget_usd,
            budget_sats,
            liquidity_sats = solution.liquidity,
            cost_sats = solution.total_cost,
            "Budget sampled"
        );
        liquidity_usd.push(sats_to_usd(solution.liquidity, btc_usd));
        cost_usd.push(sats_to_usd(solution.total_cost, btc_usd));
    }
    CoarseSeries { liquidity_usd, cost_usd }
}

fn build_curve(
    coarse: &[f64],
    series: &CoarseSeries,
    fine: &[f64],
    spec: &BudgetSweepSpec,
) -> LiquidityCurve {
    let points = fine
        .iter()
        .map(|&budget_usd| CurvePoint {
            budget_usd,
            liquidity_usd: interp_linear(budget_usd, coarse, &series.liquidity_usd),
        })
        .collect();

    // A checkpoint is annotated only when it lands exactly on the
    // coarse grid and bought anything at all.
    let mut annotations = Vec::new();
    for &checkpoint in &spec.checkpoints_usd {
        let Some(i) = coarse.iter().position(|&b| b == checkpoint) else {
            continue;
        };
        let liquidity = series.liquidity_usd[i];
        if liquidity > 0.0 {
            annotations.push(FeeAnnotation {
                budget_usd: checkpoint,
                fee_percent: 100.0 * series.cost_usd[i] / liquidity,
            });
        }
    }

    LiquidityCurve { points, annotations }
}

// ---------------------------------------------------------------------------
// Grids and interpolation
// ---------------------------------------------------------------------------

/// Budgets of the coarse solver grid: 0, step, 2*step, up to and
/// including `range_max_usd` when it lies on the grid.
fn coarse_budgets(spec: &BudgetSweepSpec) -> Vec<f64> {
    if spec.coarse_step_usd <= 0.0 {
        // Degenerate step: a single sample at zero keeps callers total.
        return vec![0.0];
    }
    let mut budgets = Vec::new();
    let mut i = 0u32;
    loop {
        let budget = f64::from(i) * spec.coarse_step_usd;
        if budget > spec.range_max_usd {
            break;
        }
        budgets.push(budget);
        i += 1;
    }
    budgets
}

/// `fine_samples` evenly spaced budgets across `[0, range_max_usd]`,
/// endpoints included.
fn fine_budgets(spec: &BudgetSweepSpec) -> Vec<f64> {
    match spec.fine_samples {
        0 => Vec::new(),
        1 => vec![0.0],
        n => (0..n)
            .map(|i| spec.range_max_usd * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Piecewise-linear interpolation of `(xs, ys)` at `x`, clamped to the
/// end values outside the knot range. Exact at every knot, so fine-grid
/// samples that coincide with coarse budgets reproduce solver output.
fn interp_linear(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    if x <= xs[0] {
        return ys[0];
    }
    for i in 1..xs.len() {
        if x == xs[i] {
            return ys[i];
        }
        if x < xs[i] {
            let (xa, xb) = (xs[i - 1], xs[i]);
            let (ya, yb) = (ys[i - 1], ys[i]);
            return ya + (yb - ya) * (x - xa) / (xb - xa);
        }
    }
    ys[ys.len() - 1]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
