//! Default file locations.
//!
//! A `config.toml` in the working directory wins; otherwise the config lives
//! under `~/.perpwatch/`.

use std::path::PathBuf;

const CONFIG_FILE: &str = "config.toml";

/// Returns the perpwatch home directory (`~/.perpwatch/`).
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".perpwatch")
}

/// Returns `./config.toml` when present, else `~/.perpwatch/config.toml`.
pub fn default_config() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        local
    } else {
        home_dir().join(CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_is_named_after_the_binary() {
        assert!(home_dir().ends_with(".perpwatch"));
    }

    #[test]
    fn default_config_is_a_toml_file() {
        assert_eq!(
            default_config().file_name().and_then(|n| n.to_str()),
            Some(CONFIG_FILE)
        );
    }
}
