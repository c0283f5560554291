//! Telegram bot front-end.
//!
//! `Bot` translates incoming updates into watch-store mutations and
//! chart requests. The main loop drives it together with the periodic
//! watcher sweeps; every handler finishes before the next update is
//! processed, so the store never sees concurrent mutation.

pub mod commands;
pub mod format;
pub mod telegram;
pub mod watcher;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chart::ChartService;
use crate::providers::ChainSource;
use crate::storage::WatchStore;

use commands::Command;
use telegram::{Notifier, Update};
use watcher::CONFIRMATION_TARGET;

pub struct Bot {
    notifier: Arc<dyn Notifier>,
    chain: Arc<dyn ChainSource>,
    chart: Arc<ChartService>,
}

impl Bot {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        chain: Arc<dyn ChainSource>,
        chart: Arc<ChartService>,
    ) -> Self {
        Self { notifier, chain, chart }
    }

    /// Handle one update. Store mutations are saved before returning.
    pub async fn handle_update(&self, update: Update, store: &mut WatchStore) -> Result<()> {
        let Some(message) = update.message else {
            return Ok(());
        };
        let Some(text) = message.text.as_deref() else {
            return Ok(());
        };
        let chat_id = message.chat.id;
        let command = commands::parse(text);
        debug!(chat_id, command = ?command, "Update received");

        match command {
            Command::Start => self.reply(chat_id, &format::welcome_text()).await,
            Command::Help => self.reply(chat_id, format::HELP_TEXT).await,
            Command::Unknown => self.reply(chat_id, &format::unknown_text()).await,
            Command::RemoveUsage => self.reply(chat_id, &format::remove_usage_text()).await,

            Command::NotifyBlocks => {
                let added = store.subscribe_blocks(chat_id);
                if added {
                    store.save()?;
                    info!(chat_id, "Block notifications enabled");
                }
                let text = if added {
                    "🔔 You'll hear about every new block."
                } else {
                    "🔔 Block notifications were already on."
                };
                self.reply(chat_id, text).await
            }

            Command::StopBlocks => {
                let removed = store.unsubscribe_blocks(chat_id);
                if removed {
                    store.save()?;
                    info!(chat_id, "Block notifications disabled");
                }
                let text = if removed {
                    "🔕 Block notifications stopped."
                } else {
                    "🔕 Block notifications weren't on."
                };
                self.reply(chat_id, text).await
            }

            Command::Status => {
                let text =
                    format::status_text(&store.watches_for(chat_id), store.is_subscribed(chat_id));
                self.reply(chat_id, &text).await
            }

            Command::Remove(txid) => {
                let removed = store.remove_watch(&txid, chat_id);
                if removed {
                    store.save()?;
                    info!(txid = %txid, chat_id, "Watch removed");
                }
                let text = if removed {
                    format::watch_removed_text(&txid)
                } else {
                    format::not_watching_text(&txid)
                };
                self.reply(chat_id, &text).await
            }

            Command::Watch(txid) => self.handle_watch(chat_id, &txid, store).await,
            Command::LiquidityChart => self.handle_chart(chat_id).await,
        }
    }

    // -- Handlers -----------------------------------------------------------

    async fn handle_watch(&self, chat_id: i64, txid: &str, store: &mut WatchStore) -> Result<()> {
        // One lookup up front: an already confirmed transaction gets an
        // immediate answer instead of a watch entry.
        let confirmations = match self.chain.confirmations(txid).await {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(txid = %txid, error = %e, "Initial confirmation check failed");
                None
            }
        };

        if let Some(c) = confirmations {
            if c >= CONFIRMATION_TARGET {
                return self
                    .reply(chat_id, &format::already_confirmed_text(txid, c))
                    .await;
            }
        }

        if store.add_watch(txid, chat_id) {
            store.save()?;
            info!(txid = %txid, chat_id, "Watch added");
            self.reply(chat_id, &format::watch_added_text(txid, confirmations))
                .await
        } else {
            self.reply(chat_id, &format::already_watching_text(txid))
                .await
        }
    }

    async fn handle_chart(&self, chat_id: i64) -> Result<()> {
        let placeholder = self
            .notifier
            .send_message(chat_id, "⏳ Crunching the Magma order book...")
            .await?;

        // Progress edits run beside the computation and stop when the
        // sender side drops.
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let notifier = Arc::clone(&self.notifier);
        let message_id = placeholder.message_id;
        let editor = tokio::spawn(async move {
            while let Some(stage) = rx.recv().await {
                if let Err(e) = notifier
                    .edit_message_text(chat_id, message_id, &format!("⏳ {stage}"))
                    .await
                {
                    debug!(error = %e, "Progress edit failed");
                }
            }
        });

        let result = self.chart.curves(Some(&tx)).await;
        drop(tx);
        let _ = editor.await;

        match result {
            Ok(curves) => {
                if let Err(e) = self
                    .notifier
                    .delete_message(chat_id, placeholder.message_id)
                    .await
                {
                    debug!(error = %e, "Placeholder delete failed");
                }
                self.reply(chat_id, &format::curve_text(&curves)).await
            }
            Err(e) => {
                warn!(error = %e, "Chart generation failed");
                self.notifier
                    .edit_message_text(
                        chat_id,
                        placeholder.message_id,
                        "⚠️ Couldn't compute the liquidity chart right now. Try again later.",
                    )
                    .await?;
                Ok(())
            }
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) -> Result<()> {
        self.notifier.send_message(chat_id, text).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
