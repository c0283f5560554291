//! Chat message formatting.
//!
//! Every reply is HTML (`parse_mode: HTML`). Transaction ids sit in
//! `<code>` spans and the liquidity chart is rendered as a monospace
//! `<pre>` table sampled from the dense curve.

use crate::types::{LiquidityCurve, LiquidityCurveSet};

use super::watcher::CONFIRMATION_TARGET;

pub const HELP_TEXT: &str = "\
<b>LNHELPER commands</b>
/liquiditychart - Magma purchasing-power overview
/notifyblocks - message on every new block
/stopblocks - stop block notifications
/status - your watches and subscriptions
/remove &lt;txid&gt; - stop watching a transaction
/help - this message

Send a bare transaction id (64 hex characters) and I'll ping you once \
it reaches 6 confirmations.";

pub fn welcome_text() -> String {
    format!("👋 Welcome to LNHELPER!\n\n{HELP_TEXT}")
}

pub fn unknown_text() -> String {
    "🤔 I didn't understand that. Try /help, or paste a transaction id to watch it.".to_string()
}

pub fn remove_usage_text() -> String {
    "Usage: /remove &lt;txid&gt;".to_string()
}

// -- Watch replies ----------------------------------------------------------

pub fn watch_added_text(txid: &str, confirmations: Option<u64>) -> String {
    let status = match confirmations {
        Some(c) => format!("currently {c} of {CONFIRMATION_TARGET} confirmations"),
        None => "status unknown right now".to_string(),
    };
    format!("👀 Watching <code>{txid}</code> ({status}). I'll ping you at {CONFIRMATION_TARGET}.")
}

pub fn already_watching_text(txid: &str) -> String {
    format!("You're already watching <code>{txid}</code>.")
}

pub fn already_confirmed_text(txid: &str, confirmations: u64) -> String {
    format!("✅ <code>{txid}</code> already has {confirmations} confirmations. Nothing to watch.")
}

pub fn watch_removed_text(txid: &str) -> String {
    format!("🗑 Stopped watching <code>{txid}</code>.")
}

pub fn not_watching_text(txid: &str) -> String {
    format!("You're not watching <code>{txid}</code>.")
}

pub fn confirmed_text(txid: &str, confirmations: u64) -> String {
    format!("✅ <code>{txid}</code> has reached {confirmations} confirmations!")
}

pub fn new_block_text(height: u64) -> String {
    format!("⛏ New block mined: <code>{height}</code>")
}

// -- Status -----------------------------------------------------------------

pub fn status_text(watches: &[(String, bool)], block_subscribed: bool) -> String {
    let mut out = String::from("<b>Your watches</b>\n");
    if watches.is_empty() {
        out.push_str("No transactions watched.\n");
    }
    for (txid, notified) in watches {
        let mark = if *notified { "✅" } else { "⏳" };
        out.push_str(&format!("{mark} <code>{txid}</code>\n"));
    }
    out.push_str(if block_subscribed {
        "\n🔔 Block notifications: on"
    } else {
        "\n🔕 Block notifications: off"
    });
    out
}

// -- Liquidity chart --------------------------------------------------------

/// Render the curve set as a monospace table plus fee annotations.
///
/// The dense curve has a couple hundred points; the table samples
/// eleven evenly spaced rows so the message stays phone-sized.
pub fn curve_text(set: &LiquidityCurveSet) -> String {
    let mut out = String::from("<b>Magma liquidity purchasing power</b>\n");
    out.push_str(&format!(
        "Tor-restricted offers: {} out of {}\n\n",
        set.restricted_offers, set.total_offers
    ));

    out.push_str("<pre>");
    out.push_str(&format!(
        "{:>7}  {:>10}  {:>12}\n",
        "budget", "all offers", "Tor-eligible"
    ));
    for i in row_indices(set.all.points.len().min(set.tor_eligible.points.len())) {
        let all = &set.all.points[i];
        let tor = &set.tor_eligible.points[i];
        out.push_str(&format!(
            "{:>7}  {:>10}  {:>12}\n",
            format!("${:.0}", all.budget_usd),
            format!("${:.0}", all.liquidity_usd),
            format!("${:.0}", tor.liquidity_usd),
        ));
    }
    out.push_str("</pre>\n");

    let mut budgets: Vec<f64> = set
        .all
        .annotations
        .iter()
        .chain(&set.tor_eligible.annotations)
        .map(|a| a.budget_usd)
        .collect();
    budgets.sort_by(|a, b| a.total_cmp(b));
    budgets.dedup();

    for budget in budgets {
        out.push_str(&format!(
            "Fees at ${budget:.0}: {} all / {} Tor-eligible\n",
            fee_label(&set.all, budget),
            fee_label(&set.tor_eligible, budget),
        ));
    }

    out
}

fn fee_label(curve: &LiquidityCurve, budget: f64) -> String {
    curve
        .annotations
        .iter()
        .find(|a| a.budget_usd == budget)
        .map(|a| format!("{:.2}%", a.fee_percent))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Up to eleven evenly spaced indices over `0..len`, endpoints included.
fn row_indices(len: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    if len <= 11 {
        return (0..len).collect();
    }
    let mut indices: Vec<usize> = (0..=10).map(|i| i * (len - 1) / 10).collect();
    indices.dedup();
    indices
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
