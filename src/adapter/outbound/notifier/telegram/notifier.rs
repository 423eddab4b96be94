//! Telegram delivery.
//!
//! Requires the `telegram` feature to be enabled.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{LinkPreviewOptions, ParseMode};
use tracing::{debug, info};

use crate::adapter::outbound::notifier::format::MessageFormatter;
use crate::domain::{EnrichedEvent, RenderedMessage};
use crate::error::{Error, Result};
use crate::port::outbound::notifier::Notifier;

/// Default bound on one `sendMessage` call.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the Telegram notifier.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API token obtained from BotFather.
    pub bot_token: String,
    /// Target chat ID for notifications.
    pub chat_id: i64,
    /// Bound on a single send.
    pub send_timeout: Duration,
}

impl TelegramConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads `TELEGRAM_BOT_TOKEN` (falling back to `TELEGRAM_TOKEN`) and
    /// `TELEGRAM_CHAT_ID`. Returns `None` if either is missing or the chat
    /// id is not a number.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .or_else(|_| std::env::var("TELEGRAM_TOKEN"))
            .ok()
            .filter(|t| !t.trim().is_empty())?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID")
            .ok()
            .and_then(|s| s.trim().parse().ok())?;

        Some(Self {
            bot_token,
            chat_id,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}

/// Sends each message to one chat with HTML parse mode.
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
    send_timeout: Duration,
    formatter: MessageFormatter,
}

impl TelegramNotifier {
    #[must_use]
    pub fn new(config: TelegramConfig, formatter: MessageFormatter) -> Self {
        info!(chat_id = config.chat_id, "Telegram notifier ready");
        Self {
            bot: Bot::new(&config.bot_token),
            chat_id: ChatId(config.chat_id),
            send_timeout: config.send_timeout,
            formatter,
        }
    }
}

fn no_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn render(&self, event: &EnrichedEvent) -> RenderedMessage {
        self.formatter.render(event)
    }

    async fn deliver(&self, message: &RenderedMessage) -> Result<()> {
        let request = self
            .bot
            .send_message(self.chat_id, message.text.clone())
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_preview());

        match tokio::time::timeout(self.send_timeout, request.send()).await {
            Ok(Ok(_)) => {
                debug!(event_id = %message.event_id, "Telegram message sent");
                Ok(())
            }
            Ok(Err(e)) => Err(Error::Delivery(e.to_string())),
            Err(_) => Err(Error::Timeout(
                u64::try_from(self.send_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    fn sink_name(&self) -> &'static str {
        "telegram"
    }
}
