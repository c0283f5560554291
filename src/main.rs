//! LNHELPER: Telegram helper bot for Bitcoin transactions and
//! Lightning liquidity.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores the watch list from disk (or starts fresh), and multiplexes
//! Telegram long-polling with the periodic chain sweeps until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use lnhelper::bot::telegram::{Notifier, TelegramClient};
use lnhelper::bot::watcher::Watcher;
use lnhelper::bot::Bot;
use lnhelper::chart::ChartService;
use lnhelper::config::AppConfig;
use lnhelper::providers::amboss::AmbossClient;
use lnhelper::providers::coingecko::CoinGeckoClient;
use lnhelper::providers::mempool::MempoolClient;
use lnhelper::providers::ChainSource;
use lnhelper::storage::WatchStore;
use lnhelper::types::BudgetSweepSpec;

const BANNER: &str = r#"
 _     _   _ _          _
| |   | \ | | |__   ___| |_ __   ___ _ __
| |   |  \| | '_ \ / _ \ | '_ \ / _ \ '__|
| |___| |\  | | | |  __/ | |_) |  __/ |
|_____|_| \_|_| |_|\___|_| .__/ \___|_|
                         |_|
  Bitcoin transaction watcher / Magma liquidity scout
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        poll_timeout_secs = cfg.bot.poll_timeout_secs,
        confirmation_interval_secs = cfg.watch.confirmation_interval_secs,
        block_interval_secs = cfg.watch.block_interval_secs,
        "LNHELPER starting up"
    );

    // -- Restore or create watch state ------------------------------------

    let mut store = WatchStore::load(Some(&cfg.watch.state_file))?;

    // -- Initialise clients -----------------------------------------------

    let token = AppConfig::resolve_env(&cfg.bot.token_env)?;
    let telegram = TelegramClient::new(&token)?;

    let amboss_key = AppConfig::resolve_env(&cfg.amboss.api_key_env)?;
    let amboss = Arc::new(AmbossClient::new(
        amboss_key,
        Some(cfg.amboss.offer_concurrency),
    )?);
    let coingecko = Arc::new(CoinGeckoClient::new()?);
    let mempool: Arc<dyn ChainSource> = Arc::new(MempoolClient::new()?);

    let sweep_spec = BudgetSweepSpec {
        range_max_usd: cfg.chart.range_max_usd,
        coarse_step_usd: cfg.chart.coarse_step_usd,
        fine_samples: cfg.chart.fine_samples,
        checkpoints_usd: cfg.chart.checkpoints_usd.clone(),
    };
    let chart = Arc::new(ChartService::new(
        amboss,
        coingecko,
        sweep_spec,
        Some(cfg.chart.cache_minutes),
    ));

    let notifier: Arc<dyn Notifier> = Arc::new(telegram.clone());
    let bot = Bot::new(Arc::clone(&notifier), Arc::clone(&mempool), chart);
    let mut watcher = Watcher::new(mempool, notifier);

    // -- Main loop --------------------------------------------------------

    let mut confirmation_interval =
        tokio::time::interval(Duration::from_secs(cfg.watch.confirmation_interval_secs));
    let mut block_interval =
        tokio::time::interval(Duration::from_secs(cfg.watch.block_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut update_offset: i64 = 0;

    info!("Entering main loop. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            // Long-poll for chat messages. A sweep tick can cancel the
            // poll mid-flight; the offset only advances after handling,
            // so Telegram redelivers anything cancelled.
            updates = telegram.get_updates(update_offset, cfg.bot.poll_timeout_secs) => {
                match updates {
                    Ok(updates) => {
                        for update in updates {
                            update_offset = update_offset.max(update.update_id + 1);
                            if let Err(e) = bot.handle_update(update, &mut store).await {
                                error!(error = %e, "Update handling failed");
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "getUpdates failed, retrying shortly");
                        tokio::time::sleep(Duration::from_secs(3)).await;
                    }
                }
            }
            _ = confirmation_interval.tick() => {
                if let Err(e) = watcher.confirmation_sweep(&mut store).await {
                    error!(error = %e, "Confirmation sweep failed");
                }
            }
            _ = block_interval.tick() => {
                if let Err(e) = watcher.block_sweep(&store).await {
                    error!(error = %e, "Block sweep failed");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    // Save final state
    store.save()?;
    info!(
        watched = store.watch_count(),
        last_height = ?watcher.last_seen_height(),
        "LNHELPER shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lnhelper=info"));

    let json_logging = std::env::var("LNHELPER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
