//! Liquidity purchasing-power analysis.
//!
//! Computes, for a snapshot of Magma liquidity-sale offers, how much
//! inbound liquidity a buyer can obtain under a fiat budget, and sweeps
//! that question over a budget range to produce the curves behind the
//! `/liquiditychart` command.
//!
//! Pipeline: classify offers by network restrictions, expand each offer
//! into fixed-size purchasable chunks, solve a bounded knapsack per
//! budget, then densify and annotate the resulting series.

pub mod units;
pub mod classify;
pub mod chunks;
pub mod knapsack;
pub mod sweep;
