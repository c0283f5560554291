//! Periodic chain sweeps.
//!
//! Two jobs run on fixed intervals from the main loop: the confirmation
//! sweep walks every watched transaction and notifies chats whose
//! target was reached, and the block sweep announces new chain tips to
//! subscribed chats.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::providers::ChainSource;
use crate::storage::WatchStore;

use super::format;
use super::telegram::Notifier;

/// Confirmations a transaction needs before watchers are notified.
pub const CONFIRMATION_TARGET: u64 = 6;

pub struct Watcher {
    chain: Arc<dyn ChainSource>,
    notifier: Arc<dyn Notifier>,
    /// Tip height seen by the previous block sweep. Not persisted; the
    /// first sweep after startup only records the tip.
    last_height: Option<u64>,
}

impl Watcher {
    pub fn new(chain: Arc<dyn ChainSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            chain,
            notifier,
            last_height: None,
        }
    }

    /// Tip height recorded by the last block sweep, for status logging.
    pub fn last_seen_height(&self) -> Option<u64> {
        self.last_height
    }

    /// Check every watched transaction, notify watchers whose target
    /// was reached, and prune finished entries. A failed lookup or a
    /// failed delivery keeps the watch for the next sweep.
    pub async fn confirmation_sweep(&self, store: &mut WatchStore) -> Result<()> {
        let txids = store.watched_txids();
        if txids.is_empty() {
            return Ok(());
        }
        debug!(count = txids.len(), "Confirmation sweep");

        let mut changed = false;
        for txid in txids {
            let confirmations = match self.chain.confirmations(&txid).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(txid = %txid, error = %e, "Confirmation lookup failed, keeping watch");
                    continue;
                }
            };
            if confirmations < CONFIRMATION_TARGET {
                continue;
            }

            for chat_id in store.pending_watchers(&txid) {
                let text = format::confirmed_text(&txid, confirmations);
                match self.notifier.send_message(chat_id, &text).await {
                    Ok(_) => {
                        store.mark_notified(&txid, chat_id);
                        changed = true;
                        info!(txid = %txid, chat_id, confirmations, "Confirmation notice delivered");
                    }
                    Err(e) => {
                        warn!(txid = %txid, chat_id, error = %e, "Notification failed, will retry next sweep")
                    }
                }
            }
        }

        let pruned = store.prune_notified();
        if pruned > 0 {
            changed = true;
            debug!(pruned, "Fully notified transactions dropped");
        }
        if changed {
            store.save()?;
        }
        Ok(())
    }

    /// Announce a new chain tip to subscribed chats. The first sweep
    /// only records the tip so restarts never replay old blocks.
    pub async fn block_sweep(&mut self, store: &WatchStore) -> Result<()> {
        let tip = match self.chain.tip_height().await {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "Tip height lookup failed, skipping block sweep");
                return Ok(());
            }
        };

        let Some(last) = self.last_height else {
            debug!(tip, "First block sweep, recording tip");
            self.last_height = Some(tip);
            return Ok(());
        };

        if tip <= last {
            return Ok(());
        }
        self.last_height = Some(tip);

        let subscribers = store.block_subscribers();
        info!(tip, subscribers = subscribers.len(), "New block, notifying subscribers");
        for chat_id in subscribers {
            if let Err(e) = self
                .notifier
                .send_message(chat_id, &format::new_block_text(tip))
                .await
            {
                warn!(chat_id, error = %e, "Block notification failed");
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
