//! Handler for the `run` command.

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use crate::adapter::inbound::cli::command::RunArgs;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::orchestration::Relay;

/// Load configuration with command-line overrides applied.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
#[allow(clippy::result_large_err)]
pub fn load_config(args: &RunArgs) -> Result<Config> {
    let mut config = Config::load(&args.config)?;
    config
        .logging
        .apply_overrides(args.log_level.as_deref(), args.json_logs);
    config.dry_run |= args.dry_run;
    Ok(config)
}

/// Execute the run command.
///
/// Ctrl-C flips the shutdown signal; the current cycle finishes before the
/// relay returns.
///
/// # Errors
///
/// Returns configuration and startup errors. Runtime errors are logged by
/// the relay and never surface here.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let config = load_config(args)?;
    config.init_logging();
    info!(version = env!("CARGO_PKG_VERSION"), config = %args.config.display(), "perpwatch starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let result = Relay::run_with_shutdown(config, shutdown_rx).await;
    if let Err(e) = &result {
        error!(error = %e, "Fatal error");
    }
    info!("perpwatch stopped");
    result
}
