//! Relay lifecycle.

use tokio::sync::watch;
use tracing::info;

use super::poll::{run_polling, PollSettings};
use super::stream::{run_streaming, StreamSettings};
use crate::error::Result;
use crate::infrastructure::bootstrap::{build_chain_stream, build_pipeline, build_subgraph_source};
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::config::source::SourceKind;

/// Entry point wiring a configured source to the pipeline.
pub struct Relay;

impl Relay {
    /// Run until the process is interrupted.
    ///
    /// # Errors
    ///
    /// Returns an error for startup failures such as store initialisation or
    /// missing sink credentials. Transport failures, including the first
    /// connection, are retried with backoff and never end the relay.
    pub async fn run(config: Config) -> Result<()> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        Self::run_with_shutdown(config, shutdown_rx).await
    }

    /// Run with an externally controlled shutdown signal.
    ///
    /// # Errors
    ///
    /// See [`Relay::run`].
    pub async fn run_with_shutdown(config: Config, shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            source = config.source.kind.stream_name(),
            store = config.store.backend.label(),
            dry_run = config.dry_run,
            "Starting relay"
        );
        let mut pipeline = build_pipeline(&config).await?;

        match config.source.kind {
            SourceKind::Subgraph => {
                let source = build_subgraph_source(&config)?;
                run_polling(
                    &mut pipeline,
                    &source,
                    PollSettings::from(&config.source),
                    shutdown,
                )
                .await;
            }
            SourceKind::Chain => {
                let stream = build_chain_stream(&config)?;
                run_streaming(
                    &mut pipeline,
                    stream,
                    StreamSettings::from(&config.source),
                    shutdown,
                )
                .await?;
            }
        }

        info!(cursor = %pipeline.cursor(), "Relay stopped");
        Ok(())
    }
}
