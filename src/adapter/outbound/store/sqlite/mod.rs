//! SQLite cursor store.
//!
//! Durable, deduplicating backend: the watermark and the boundary seen-set
//! live in two tables managed by embedded Diesel migrations.

pub mod connection;
pub mod model;
pub mod schema;
pub mod store;

pub use connection::{create_pool, run_migrations, DbPool};
pub use store::SqliteCursorStore;
