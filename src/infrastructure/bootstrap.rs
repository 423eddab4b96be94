//! Composition root: builds the pipeline and its sources from [`Config`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::adapter::outbound::chain::{ChainLogStream, JsonRpcClient, VaultReader};
use crate::adapter::outbound::notifier::{LogNotifier, MessageFormatter};
#[cfg(feature = "telegram")]
use crate::adapter::outbound::notifier::telegram::{TelegramConfig, TelegramNotifier};
use crate::adapter::outbound::price::TickerPriceClient;
use crate::adapter::outbound::store::{FileCursorStore, MemoryCursorStore, SqliteCursorStore};
use crate::adapter::outbound::subgraph::{RateLimitPolicy, SubgraphSource};
use crate::application::{Enricher, Pipeline, WatermarkEngine};
use crate::domain::{Cursor, StreamName};
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::notifier::SinkKind;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::config::store::StoreBackend;
use crate::infrastructure::source::ReconnectingStream;
use crate::port::outbound::cursor::CursorStore;
use crate::port::outbound::notifier::Notifier;

/// Open the configured cursor store for the configured source's stream.
///
/// # Errors
///
/// Returns an error if the SQLite database cannot be opened or migrated.
pub fn build_store(config: &Config) -> Result<Arc<dyn CursorStore>> {
    let stream = StreamName::new(config.source.kind.stream_name());
    let path = config.store.resolved_path();
    let store: Arc<dyn CursorStore> = match config.store.backend {
        StoreBackend::Sqlite => Arc::new(SqliteCursorStore::open(&path, stream)?),
        StoreBackend::File => Arc::new(FileCursorStore::new(&path, stream)),
        StoreBackend::Memory => Arc::new(MemoryCursorStore::new()),
    };
    info!(backend = config.store.backend.label(), path = %path, "Cursor store ready");
    Ok(store)
}

/// Load the persisted cursor, falling back to `start_from` on a first run.
pub async fn build_engine(config: &Config, store: Arc<dyn CursorStore>) -> WatermarkEngine {
    let engine = WatermarkEngine::open(store.clone()).await;
    match config.source.start_from {
        Some(start) if engine.cursor().is_zero() => {
            info!(start_from = start, "No stored cursor, starting from configured position");
            WatermarkEngine::with_cursor(store, Cursor::new(start))
        }
        _ => engine,
    }
}

/// Token registry plus whichever remote lookups are configured.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be built.
pub fn build_enricher(config: &Config) -> Result<Enricher> {
    let timeout = Duration::from_millis(config.source.request_timeout_ms);
    let mut enricher = Enricher::new(
        config.enrichment.token_registry(),
        Duration::from_secs(config.enrichment.cache_ttl_secs),
    );

    match (&config.source.rpc_url, config.enrichment.positions) {
        (Some(rpc_url), true) => {
            let rpc = JsonRpcClient::new(rpc_url, timeout)?;
            enricher = enricher.with_positions(Arc::new(VaultReader::new(
                rpc,
                config.source.vault_address,
            )));
            info!(vault = %config.source.vault_address, "Position lookups enabled");
        }
        (None, true) => {
            info!("No rpc_url configured, position fields will use placeholders");
        }
        (_, false) => {}
    }

    if let Some(price_url) = &config.enrichment.price_url {
        enricher = enricher.with_prices(Arc::new(TickerPriceClient::new(price_url, timeout)?));
        info!(url = %price_url, "Price lookups enabled");
    }

    Ok(enricher)
}

/// Build the notification sink.
///
/// Dry runs and `sink = "log"` use the log sink. Otherwise Telegram
/// credentials must be present in the environment.
///
/// # Errors
///
/// Returns [`ConfigError::MissingField`] when the Telegram sink is selected
/// without credentials, or [`ConfigError::InvalidValue`] when the binary was
/// built without Telegram support.
pub fn build_notifier(config: &Config) -> Result<Arc<dyn Notifier>> {
    let formatter = MessageFormatter::new(config.enrichment.explorer_url.clone());

    if config.dry_run || config.notifier.sink == SinkKind::Log {
        if config.dry_run {
            warn!("Dry run, notifications are logged instead of sent");
        }
        return Ok(Arc::new(LogNotifier::new(formatter)));
    }

    build_telegram(config, formatter)
}

#[cfg(feature = "telegram")]
fn build_telegram(config: &Config, formatter: MessageFormatter) -> Result<Arc<dyn Notifier>> {
    let Some(telegram) = TelegramConfig::from_env() else {
        return Err(ConfigError::MissingField {
            field: "TELEGRAM_BOT_TOKEN",
        }
        .into());
    };
    let telegram =
        telegram.with_send_timeout(Duration::from_millis(config.notifier.send_timeout_ms));
    info!(chat_id = telegram.chat_id, "Telegram notifier enabled");
    Ok(Arc::new(TelegramNotifier::new(telegram, formatter)))
}

#[cfg(not(feature = "telegram"))]
fn build_telegram(_config: &Config, _formatter: MessageFormatter) -> Result<Arc<dyn Notifier>> {
    Err(ConfigError::InvalidValue {
        field: "sink",
        reason: "built without the telegram feature".into(),
    }
    .into())
}

/// Assemble store, engine, enricher and sink into a pipeline.
///
/// # Errors
///
/// Returns an error for store initialisation or sink configuration failures.
pub async fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let notifier = build_notifier(config)?;
    let store = build_store(config)?;
    let engine = build_engine(config, store).await;
    let enricher = build_enricher(config)?;
    Ok(Pipeline::new(engine, enricher, notifier))
}

/// Subgraph polling source.
///
/// # Errors
///
/// Returns an error if `subgraph_url` is missing or the HTTP client cannot
/// be built.
pub fn build_subgraph_source(config: &Config) -> Result<SubgraphSource> {
    let source = &config.source;
    let url = source.subgraph_url.as_deref().ok_or(ConfigError::MissingField {
        field: "subgraph_url",
    })?;
    SubgraphSource::new(
        url,
        Duration::from_millis(source.request_timeout_ms),
        RateLimitPolicy {
            max_retries: source.max_rate_limit_retries,
            default_wait: Duration::from_millis(source.rate_limit_default_wait_ms),
        },
    )
}

/// Chain log subscription wrapped for automatic reconnection.
///
/// # Errors
///
/// Returns an error if `ws_url` is missing.
pub fn build_chain_stream(config: &Config) -> Result<ReconnectingStream<ChainLogStream>> {
    let source = &config.source;
    let url = source
        .ws_url
        .as_deref()
        .ok_or(ConfigError::MissingField { field: "ws_url" })?;
    let inner = ChainLogStream::new(
        url,
        source.vault_address,
        source.router_address,
        Duration::from_secs(source.probe_interval_secs),
        Duration::from_secs(source.probe_timeout_secs),
    );
    Ok(ReconnectingStream::new(inner, config.reconnection.clone()))
}
