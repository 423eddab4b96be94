//! Notification sink configuration.
//!
//! Credentials never live in the config file; the Telegram sink reads
//! `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID` from the environment.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Telegram,
    /// Log messages instead of sending them.
    Log,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub sink: SinkKind,
    /// Bound on one Telegram send (milliseconds).
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

const fn default_send_timeout_ms() -> u64 {
    10_000
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::default(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}
