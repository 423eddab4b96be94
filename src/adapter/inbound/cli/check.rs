//! Handler for `check config`.

use std::path::Path;

use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::config::notifier::SinkKind;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::config::source::SourceKind;

fn env_present(names: &[&str]) -> bool {
    names
        .iter()
        .any(|name| std::env::var(name).is_ok_and(|v| !v.trim().is_empty()))
}

/// Validate the configuration file without starting the relay.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    let config = Config::load(path)?;

    output::section("Configuration Check");
    output::field("Config", path.display());
    output::success("Configuration file is valid");

    output::section("Summary");
    let source = &config.source;
    output::field("Source", source.kind.stream_name());
    match source.kind {
        SourceKind::Subgraph => {
            output::field("Subgraph", source.subgraph_url.as_deref().unwrap_or("-"));
            output::field("Poll every", format!("{}s", source.poll_interval_secs));
        }
        SourceKind::Chain => {
            output::field("WebSocket", source.ws_url.as_deref().unwrap_or("-"));
            output::field("Vault", source.vault_address);
            output::field("Router", source.router_address);
        }
    }
    output::field("Store", format!("{} ({})", config.store.backend.label(), config.store.resolved_path()));
    output::field("Dry run", config.dry_run);

    if source.rpc_url.is_none() && config.enrichment.positions {
        output::warning("No rpc_url set, position fields will show placeholders");
    }
    if config.enrichment.price_url.is_none() {
        output::warning("No price_url set, mark prices come from events only");
    }

    if config.dry_run || config.notifier.sink == SinkKind::Log {
        output::field("Sink", "log");
    } else {
        let token = env_present(&["TELEGRAM_BOT_TOKEN", "TELEGRAM_TOKEN"]);
        let chat = env_present(&["TELEGRAM_CHAT_ID"]);
        if token && chat {
            output::success("Telegram credentials detected");
        } else {
            output::warning("Telegram sink selected but environment variables are missing");
            if !token {
                output::field("Missing", "TELEGRAM_BOT_TOKEN");
            }
            if !chat {
                output::field("Missing", "TELEGRAM_CHAT_ID");
            }
        }
    }

    output::success("Configuration check complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn valid_file_passes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "dry_run = true\n[source]\nsubgraph_url = \"https://example.com/graphql\""
        )
        .unwrap();
        assert!(execute_config(file.path()).is_ok());
    }

    #[test]
    fn invalid_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[source]\nkind = \"chain\"").unwrap();
        assert!(execute_config(file.path()).is_err());
    }
}
