//! Handler for `cursor show`.

use std::path::Path;

use chrono::DateTime;

use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::bootstrap::build_store;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::config::source::SourceKind;

/// Print the stored watermark for the configured source.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the store cannot be
/// opened.
pub async fn execute_show<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = Config::load(config_path)?;
    let store = build_store(&config)?;
    let cursor = store.load().await;

    output::section("Cursor");
    output::field("Stream", config.source.kind.stream_name());
    output::field("Store", store.backend_name());
    output::field("Delivery", store.capability().label());

    if cursor.is_zero() {
        output::field("Watermark", "none");
        output::warning("No cursor stored yet; the next run starts from the beginning or start_from");
        return Ok(());
    }

    output::field("Watermark", cursor.last_ts);
    match config.source.kind {
        SourceKind::Subgraph => {
            let at = i64::try_from(cursor.last_ts)
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map_or_else(|| "-".to_string(), |dt| dt.to_rfc3339());
            output::field("Next event at", at);
        }
        SourceKind::Chain => {
            output::field("Next block", cursor.last_ts);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn shows_cursor_from_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let cursor_path = dir.path().join("cursor.json");
        let config_path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            "[source]\nsubgraph_url = \"https://example.com/graphql\"\n[store]\nbackend = \"file\"\npath = {:?}",
            cursor_path.display().to_string()
        )
        .unwrap();

        assert!(execute_show(&config_path).await.is_ok());
    }
}
