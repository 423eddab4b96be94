//! Temporary config files.

use std::io::Write;

use tempfile::NamedTempFile;

pub const SUBGRAPH_URL: &str = "https://api.example.com/subgraphs/name/perps";

/// Write `contents` to a temp `.toml` file that lives as long as the handle.
pub fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("perpwatch-config-")
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

/// Minimal valid subgraph config logging to the given store file.
pub fn subgraph_with_file_store(cursor_path: &str) -> String {
    format!(
        "dry_run = true\n\n[source]\nsubgraph_url = \"{SUBGRAPH_URL}\"\n\n[store]\nbackend = \"file\"\npath = \"{cursor_path}\"\n"
    )
}
