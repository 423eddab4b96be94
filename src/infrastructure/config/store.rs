//! Cursor store configuration.

use serde::Deserialize;

/// Cursor store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// SQLite watermark plus seen-set.
    #[default]
    Sqlite,
    /// JSON watermark file without a seen-set.
    File,
    /// In-process only; state is lost on exit.
    Memory,
}

impl StoreBackend {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Database file for `sqlite`, JSON file for `file`.
    #[serde(default)]
    pub path: Option<String>,
}

impl StoreConfig {
    /// Configured path, or the backend's default file name.
    #[must_use]
    pub fn resolved_path(&self) -> String {
        self.path.clone().unwrap_or_else(|| match self.backend {
            StoreBackend::File => "perpwatch-cursor.json".into(),
            StoreBackend::Sqlite | StoreBackend::Memory => "perpwatch.db".into(),
        })
    }
}
