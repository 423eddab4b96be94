//! Cursor store backends.
//!
//! - [`file::FileCursorStore`] - JSON file, best-effort
//! - [`sqlite::SqliteCursorStore`] - SQLite via Diesel, deduplicating
//! - [`memory::MemoryCursorStore`] - process memory, for tests and dry runs

pub mod file;
pub mod memory;
pub mod sqlite;

pub use file::FileCursorStore;
pub use memory::MemoryCursorStore;
pub use sqlite::SqliteCursorStore;
