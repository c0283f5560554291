//! Watch-list persistence.
//!
//! The bot's watch state (transactions awaiting confirmation and chats
//! subscribed to block notifications) lives in a JSON file whose field
//! names match earlier deployments, so existing state files keep
//! loading. The store owns the state and its path; handlers and sweeps
//! mutate it and call `save` at their mutation boundaries.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Default state file path.
const DEFAULT_STATE_FILE: &str = "bot_state.json";

/// One chat waiting on a transaction's confirmations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxWatcher {
    pub chat_id: i64,
    /// Whether the confirmation notice was already delivered.
    pub notified: bool,
}

/// The serialized watch state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchState {
    #[serde(default)]
    pub watched_tx: HashMap<String, Vec<TxWatcher>>,
    #[serde(default)]
    pub block_notify_users: HashSet<i64>,
}

/// Watch-list repository bound to a state file.
pub struct WatchStore {
    state: WatchState,
    path: String,
}

impl WatchStore {
    /// Load the store from `path`, starting fresh if the file is missing.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = path.unwrap_or(DEFAULT_STATE_FILE).to_string();

        if !Path::new(&path).exists() {
            info!(path = %path, "No saved watch state found, starting fresh");
            return Ok(Self { state: WatchState::default(), path });
        }

        let json = std::fs::read_to_string(&path)
            .context(format!("Failed to read watch state from {path}"))?;
        let state: WatchState = serde_json::from_str(&json)
            .context(format!("Failed to parse watch state from {path}"))?;

        info!(
            path = %path,
            watched = state.watched_tx.len(),
            block_subscribers = state.block_notify_users.len(),
            "Watch state loaded from disk"
        );
        Ok(Self { state, path })
    }

    /// Persist the current state to disk.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.state)
            .context("Failed to serialise watch state")?;
        std::fs::write(&self.path, &json)
            .context(format!("Failed to write watch state to {}", self.path))?;
        debug!(path = %self.path, "Watch state saved");
        Ok(())
    }

    // -- Transaction watches ------------------------------------------------

    /// Start watching a transaction for `chat_id`. False when the chat
    /// already watches it.
    pub fn add_watch(&mut self, txid: &str, chat_id: i64) -> bool {
        let watchers = self.state.watched_tx.entry(txid.to_string()).or_default();
        if watchers.iter().any(|w| w.chat_id == chat_id) {
            return false;
        }
        watchers.push(TxWatcher { chat_id, notified: false });
        true
    }

    /// Stop watching a transaction for `chat_id`. False when the chat was
    /// not watching it. The txid entry disappears once nobody watches it.
    pub fn remove_watch(&mut self, txid: &str, chat_id: i64) -> bool {
        let Some(watchers) = self.state.watched_tx.get_mut(txid) else {
            return false;
        };
        let before = watchers.len();
        watchers.retain(|w| w.chat_id != chat_id);
        let removed = watchers.len() < before;
        if watchers.is_empty() {
            self.state.watched_tx.remove(txid);
        }
        removed
    }

    /// Every transaction currently being watched.
    pub fn watched_txids(&self) -> Vec<String> {
        self.state.watched_tx.keys().cloned().collect()
    }

    /// Chats a confirmation notice for `txid` still has to reach.
    pub fn pending_watchers(&self, txid: &str) -> Vec<i64> {
        self.state
            .watched_tx
            .get(txid)
            .map(|watchers| {
                watchers
                    .iter()
                    .filter(|w| !w.notified)
                    .map(|w| w.chat_id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mark one chat's watch of `txid` as notified.
    pub fn mark_notified(&mut self, txid: &str, chat_id: i64) {
        if let Some(watchers) = self.state.watched_tx.get_mut(txid) {
            for watcher in watchers.iter_mut() {
                if watcher.chat_id == chat_id {
                    watcher.notified = true;
                }
            }
        }
    }

    /// Drop transactions whose watchers were all notified. Returns how
    /// many entries were removed.
    pub fn prune_notified(&mut self) -> usize {
        let before = self.state.watched_tx.len();
        self.state
            .watched_tx
            .retain(|_, watchers| watchers.iter().any(|w| !w.notified));
        before - self.state.watched_tx.len()
    }

    /// Watches held by one chat, sorted by txid for stable rendering.
    pub fn watches_for(&self, chat_id: i64) -> Vec<(String, bool)> {
        let mut watches: Vec<(String, bool)> = self
            .state
            .watched_tx
            .iter()
            .filter_map(|(txid, watchers)| {
                watchers
                    .iter()
                    .find(|w| w.chat_id == chat_id)
                    .map(|w| (txid.clone(), w.notified))
            })
            .collect();
        watches.sort();
        watches
    }

    pub fn watch_count(&self) -> usize {
        self.state.watched_tx.len()
    }

    // -- Block subscriptions ------------------------------------------------

    /// Subscribe a chat to new-block notifications. False if already on.
    pub fn subscribe_blocks(&mut self, chat_id: i64) -> bool {
        self.state.block_notify_users.insert(chat_id)
    }

    /// Unsubscribe a chat. False if it was not subscribed.
    pub fn unsubscribe_blocks(&mut self, chat_id: i64) -> bool {
        self.state.block_notify_users.remove(&chat_id)
    }

    pub fn is_subscribed(&self, chat_id: i64) -> bool {
        self.state.block_notify_users.contains(&chat_id)
    }

    /// All subscribed chats, sorted for deterministic delivery order.
    pub fn block_subscribers(&self) -> Vec<i64> {
        let mut subscribers: Vec<i64> = self.state.block_notify_users.iter().copied().collect();
        subscribers.sort_unstable();
        subscribers
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
