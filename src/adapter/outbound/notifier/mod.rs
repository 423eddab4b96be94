//! Notification adapters.
//!
//! Implements the `port::outbound::notifier::Notifier` trait for the
//! Telegram sink and the dry-run log sink.

pub mod format;
pub mod log;
#[cfg(feature = "telegram")]
pub mod telegram;

pub use format::MessageFormatter;
pub use log::LogNotifier;
