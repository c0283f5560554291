//! External data providers.
//!
//! Defines the source traits the bot consumes and the HTTP clients
//! behind them: Amboss Magma for liquidity offers, CoinGecko for the
//! BTC/USD rate, mempool.space for chain data. Traits keep the chart
//! service and the watcher testable against canned sources.

pub mod amboss;
pub mod coingecko;
pub mod mempool;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::Offer;

/// Source of Magma liquidity-sale offers.
#[async_trait]
pub trait OfferSource: Send + Sync {
    /// Fetch the current snapshot of enabled offers, fully detailed.
    async fn fetch_offers(&self) -> Result<Vec<Offer>>;
}

/// Source of the BTC/USD exchange rate.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current BTC price in USD, finite and positive.
    async fn btc_usd(&self) -> Result<f64>;
}

/// Source of Bitcoin chain data for transaction watching.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Confirmation count of a transaction, zero while unconfirmed.
    /// An error means the status is unknown, not that it is zero.
    async fn confirmations(&self, txid: &str) -> Result<u64>;

    /// Height of the current chain tip.
    async fn tip_height(&self) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use test_support::{FailingChain, FixedChain};
