//! Command parsing for incoming chat messages.
//!
//! Telegram delivers plain text; this maps it onto the bot's command
//! set. A bare 64-character hex string is treated as a transaction id
//! to watch, matching how people paste txids into the chat.

/// A parsed incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    NotifyBlocks,
    StopBlocks,
    LiquidityChart,
    Status,
    /// `/remove <txid>`
    Remove(String),
    /// `/remove` without an argument.
    RemoveUsage,
    /// A bare transaction id to start watching.
    Watch(String),
    /// Anything the bot does not understand.
    Unknown,
}

/// Whether `s` is a hex transaction id.
pub fn is_txid(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse one message's text.
///
/// Commands tolerate a trailing `@BotName` mention, which group chats
/// append when tapping a command.
pub fn parse(text: &str) -> Command {
    let text = text.trim();
    if !text.starts_with('/') {
        return if is_txid(text) {
            Command::Watch(text.to_string())
        } else {
            Command::Unknown
        };
    }

    let mut parts = text.split_whitespace();
    let command = parts.next().unwrap_or("");
    let command = command.split('@').next().unwrap_or(command);

    match command {
        "/start" => Command::Start,
        "/help" => Command::Help,
        "/notifyblocks" => Command::NotifyBlocks,
        "/stopblocks" => Command::StopBlocks,
        "/liquiditychart" => Command::LiquidityChart,
        "/status" => Command::Status,
        "/remove" => match parts.next() {
            Some(arg) => Command::Remove(arg.to_string()),
            None => Command::RemoveUsage,
        },
        _ => Command::Unknown,
    }
}
