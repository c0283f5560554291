//! Shared types for the LNHELPER bot.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that provider, liquidity,
//! and bot modules can depend on them without circular references.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Offers
// ---------------------------------------------------------------------------

/// A liquidity-sale offer from the Amboss Magma marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    /// Seller account identifier. Several offers may share one account.
    pub account: String,
    /// Flat cost per order, in satoshis.
    pub base_fee: u64,
    /// Seller fee in parts-per-million of the order size.
    pub fee_rate: u64,
    /// Marketplace fee in parts-per-million of the order size.
    pub amboss_fee_rate: u64,
    /// Minimum order size in satoshis.
    pub min_size: u64,
    /// Maximum order size in satoshis (`min_size <= max_size`).
    pub max_size: u64,
    /// Whether the seller can fulfil more than one order at the same time.
    pub allow_parallel: bool,
    /// Marketplace conditions, used only for network classification.
    pub conditions: Vec<OfferCondition>,
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}..{} sats @ {}+{}ppm (base {} sats)",
            self.account,
            self.min_size,
            self.max_size,
            self.fee_rate,
            self.amboss_fee_rate,
            self.base_fee,
        )
    }
}

impl Offer {
    /// Helper to build a test/sample offer with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        Offer {
            id: "offer-001".to_string(),
            account: "ACCT-01".to_string(),
            base_fee: 1000,
            fee_rate: 1600,
            amboss_fee_rate: 500,
            min_size: 1_000_000,
            max_size: 5_000_000,
            allow_parallel: true,
            conditions: Vec::new(),
        }
    }
}

/// One marketplace condition attached to an offer.
///
/// Conditions are free-form `{condition, operator, value}` triples.
/// The only family this bot interprets is `NODE_SOCKETS`, which sellers
/// use to exclude Tor-only or clearnet-only counterparties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferCondition {
    pub condition: String,
    pub operator: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Purchasing-power curves
// ---------------------------------------------------------------------------

/// One sampled point of a purchasing-power curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CurvePoint {
    pub budget_usd: f64,
    /// Maximum tradable liquidity at that budget, in USD.
    pub liquidity_usd: f64,
}

/// Fee-percentage annotation at a checkpoint budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeAnnotation {
    pub budget_usd: f64,
    /// Realized cost as a percentage of the liquidity bought.
    pub fee_percent: f64,
}

/// A dense purchasing-power curve for one offer universe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiquidityCurve {
    pub points: Vec<CurvePoint>,
    pub annotations: Vec<FeeAnnotation>,
}

impl LiquidityCurve {
    /// The highest liquidity value on the curve (0.0 for an empty curve).
    pub fn max_liquidity_usd(&self) -> f64 {
        self.points.iter().map(|p| p.liquidity_usd).fold(0.0, f64::max)
    }
}

/// The two purchasing-power curves computed from one offer snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityCurveSet {
    /// Curve over Tor-eligible offers only (network-restricted excluded).
    pub tor_eligible: LiquidityCurve,
    /// Curve over every offer.
    pub all: LiquidityCurve,
    /// Usable offers in the snapshot.
    pub total_offers: usize,
    /// How many of those are classified network-restricted.
    pub restricted_offers: usize,
}

impl fmt::Display for LiquidityCurveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} points | peak ${:.0} | Tor-restricted offers: {} out of {}",
            self.all.points.len(),
            self.all.max_liquidity_usd(),
            self.restricted_offers,
            self.total_offers,
        )
    }
}

// ---------------------------------------------------------------------------
// Sweep parameters
// ---------------------------------------------------------------------------

/// Parameters of one budget sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetSweepSpec {
    /// Upper end of the budget axis, in USD.
    pub range_max_usd: f64,
    /// Spacing of the coarse solver grid, in USD.
    pub coarse_step_usd: f64,
    /// Number of evenly spaced points on the dense output curve.
    pub fine_samples: usize,
    /// Budgets annotated with a fee percentage when they lie on the
    /// coarse grid.
    pub checkpoints_usd: Vec<f64>,
}

impl Default for BudgetSweepSpec {
    fn default() -> Self {
        Self {
            range_max_usd: 500.0,
            coarse_step_usd: 25.0,
            fine_samples: 201,
            checkpoints_usd: vec![10.0, 50.0, 100.0, 500.0],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
