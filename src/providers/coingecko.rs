//! BTC/USD exchange rate from CoinGecko.
//!
//! API: https://api.coingecko.com/api/v3/simple/price (free tier, no key)
//!
//! Budgets arrive in USD and the solver runs on satoshis, so a bad rate
//! would corrupt every curve. The response is validated to be finite
//! and positive before anyone converts with it.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::PriceSource;

const PRICE_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd";

#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    #[serde(default)]
    bitcoin: Option<BitcoinPrice>,
}

#[derive(Debug, Deserialize)]
struct BitcoinPrice {
    #[serde(default)]
    usd: Option<f64>,
}

pub struct CoinGeckoClient {
    http: Client,
}

impl CoinGeckoClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("lnhelper/0.1.0")
            .build()
            .context("Failed to build HTTP client for CoinGecko")?;
        Ok(Self { http })
    }

    fn validate(price: f64) -> Result<f64> {
        if !price.is_finite() || price <= 0.0 {
            anyhow::bail!("CoinGecko returned an unusable BTC price: {price}");
        }
        Ok(price)
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn btc_usd(&self) -> Result<f64> {
        let resp = self
            .http
            .get(PRICE_URL)
            .send()
            .await
            .context("CoinGecko API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("CoinGecko API error {status}: {body}");
        }

        let data: SimplePriceResponse = resp
            .json()
            .await
            .context("Failed to parse CoinGecko response")?;

        let price = data
            .bitcoin
            .and_then(|b| b.usd)
            .ok_or_else(|| anyhow::anyhow!("CoinGecko response missing bitcoin price"))?;
        let price = Self::validate(price)?;
        debug!(price, "BTC/USD rate fetched");
        Ok(price)
    }
}
