//! Liquidity chart service.
//!
//! Wires the price and offer sources to the purchasing-power sweep,
//! runs the CPU-bound solve off the async runtime, and caches the
//! finished curve set so repeated `/liquiditychart` requests within the
//! TTL cost nothing. Stage strings go out through an optional channel
//! so the bot can live-edit its progress message.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::liquidity::sweep;
use crate::providers::{OfferSource, PriceSource};
use crate::types::{BudgetSweepSpec, LiquidityCurveSet};

/// Default cache TTL in minutes. The order book moves slowly.
const DEFAULT_CACHE_TTL_MINS: i64 = 60;

struct CachedCurves {
    curves: LiquidityCurveSet,
    computed_at: DateTime<Utc>,
}

pub struct ChartService {
    offers: Arc<dyn OfferSource>,
    price: Arc<dyn PriceSource>,
    sweep_spec: BudgetSweepSpec,
    cache_ttl: Duration,
    cache: Mutex<Option<CachedCurves>>,
}

impl ChartService {
    pub fn new(
        offers: Arc<dyn OfferSource>,
        price: Arc<dyn PriceSource>,
        sweep_spec: BudgetSweepSpec,
        cache_ttl_mins: Option<i64>,
    ) -> Self {
        Self {
            offers,
            price,
            sweep_spec,
            cache_ttl: Duration::minutes(cache_ttl_mins.unwrap_or(DEFAULT_CACHE_TTL_MINS)),
            cache: Mutex::new(None),
        }
    }

    /// The current curve set, freshly computed or straight from cache.
    ///
    /// Stage updates go to `progress` as they happen; a closed receiver
    /// is ignored. The cache lock is held across the whole computation,
    /// so concurrent requests wait for one compute instead of racing.
    pub async fn curves(
        &self,
        progress: Option<&UnboundedSender<String>>,
    ) -> Result<LiquidityCurveSet> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            let age = Utc::now() - cached.computed_at;
            if age < self.cache_ttl {
                debug!(age_mins = age.num_minutes(), "Serving cached liquidity curves");
                return Ok(cached.curves.clone());
            }
        }

        send_progress(progress, "Fetching BTC price...");
        let btc_usd = self.price.btc_usd().await.context("BTC price fetch failed")?;

        send_progress(progress, "Fetching Magma offers...");
        let offers = self
            .offers
            .fetch_offers()
            .await
            .context("Offer fetch failed")?;

        send_progress(progress, "Computing purchasing power...");
        let spec = self.sweep_spec.clone();
        let curves =
            tokio::task::spawn_blocking(move || sweep::sample_curves(&offers, btc_usd, &spec))
                .await
                .context("Curve computation task failed")?;

        info!(%curves, btc_usd, "Liquidity curves computed");
        *cache = Some(CachedCurves { curves: curves.clone(), computed_at: Utc::now() });
        Ok(curves)
    }
}

fn send_progress(progress: Option<&UnboundedSender<String>>, stage: &str) {
    if let Some(tx) = progress {
        let _ = tx.send(stage.to_string());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
