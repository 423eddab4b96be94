//! Telegram Bot API sink.

pub mod notifier;

pub use notifier::{TelegramConfig, TelegramNotifier};
