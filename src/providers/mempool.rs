//! Bitcoin chain data from mempool.space.
//!
//! API: https://mempool.space/api (no key)
//!
//! Serves the transaction watcher: confirmation counts for watched
//! txids and the current tip height for block notifications.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::ChainSource;

const BASE_URL: &str = "https://mempool.space/api";

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TxInfo {
    /// Some esplora-compatible backends report this directly.
    #[serde(default)]
    confirmations: Option<u64>,
    #[serde(default)]
    status: Option<TxStatus>,
}

#[derive(Debug, Deserialize)]
struct TxStatus {
    #[serde(default)]
    confirmed: bool,
    #[serde(default)]
    block_height: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BlockInfo {
    height: u64,
}

/// Block height of a confirmed transaction, if the payload carries one.
fn confirmed_height(tx: &TxInfo) -> Option<u64> {
    tx.status
        .as_ref()
        .filter(|s| s.confirmed)
        .and_then(|s| s.block_height)
}

/// Confirmation count from a transaction payload and the chain tip.
///
/// An explicit positive `confirmations` field wins. Otherwise a
/// transaction confirmed at height `h` has `tip - h + 1` confirmations,
/// clamped at zero while the tip view lags behind. Unconfirmed
/// transactions have zero.
fn derive_confirmations(tx: &TxInfo, tip_height: u64) -> u64 {
    if let Some(c) = tx.confirmations {
        if c > 0 {
            return c;
        }
    }
    match confirmed_height(tx) {
        Some(h) => (tip_height + 1).saturating_sub(h),
        None => 0,
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct MempoolClient {
    http: Client,
}

impl MempoolClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("lnhelper/0.1.0")
            .build()
            .context("Failed to build HTTP client for mempool.space")?;
        Ok(Self { http })
    }

    async fn fetch_tx(&self, txid: &str) -> Result<TxInfo> {
        let url = format!("{BASE_URL}/tx/{txid}");
        debug!(url = %url, "Fetching transaction");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("mempool.space API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("mempool.space API error {status} for tx {txid}");
        }

        resp.json()
            .await
            .context("Failed to parse mempool.space transaction")
    }
}

#[async_trait]
impl ChainSource for MempoolClient {
    async fn confirmations(&self, txid: &str) -> Result<u64> {
        let tx = self.fetch_tx(txid).await?;
        // The tip is only needed when deriving from a block height.
        let needs_tip =
            !matches!(tx.confirmations, Some(c) if c > 0) && confirmed_height(&tx).is_some();
        let tip = if needs_tip { self.tip_height().await? } else { 0 };
        Ok(derive_confirmations(&tx, tip))
    }

    async fn tip_height(&self) -> Result<u64> {
        let url = format!("{BASE_URL}/blocks");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("mempool.space API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("mempool.space API error {status} for blocks");
        }

        let blocks: Vec<BlockInfo> = resp
            .json()
            .await
            .context("Failed to parse mempool.space block list")?;
        blocks
            .first()
            .map(|b| b.height)
            .ok_or_else(|| anyhow::anyhow!("mempool.space returned no blocks"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
