//! Chat commands understood by the bot

/// A recognised slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// `/start` or `/help`
    Help,

    /// `/vpn_status`
    Status,

    /// `/vpn_restart`
    Restart,

    /// `/vpn_reconnect`
    Reconnect,

    /// Any other slash command
    Unknown(String),
}

pub const HELP_TEXT: &str = "<b>VPN Bot - Netbird control</b>\n\n\
/vpn_status - Show VPN status\n\
/vpn_restart - Restart the daemon\n\
/vpn_reconnect - Reconnect (down + up)";

impl BotCommand {
    /// Parse a message text; plain text is not a command
    ///
    /// Arguments after the command and a `@botname` suffix are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        if !word.starts_with('/') {
            return None;
        }

        let name = word.split('@').next().unwrap_or(word);
        Some(match name {
            "/start" | "/help" => BotCommand::Help,
            "/vpn_status" => BotCommand::Status,
            "/vpn_restart" => BotCommand::Restart,
            "/vpn_reconnect" => BotCommand::Reconnect,
            other => BotCommand::Unknown(other.to_string()),
        })
    }
}
