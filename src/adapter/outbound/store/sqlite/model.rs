//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{cursors, seen_events};

/// Database row for a stream's watermark.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = cursors)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CursorRow {
    pub stream: String,
    pub last_ts: i64,
    pub updated_at: String,
}

/// Database row for one delivered event at a boundary timestamp.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = seen_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SeenEventRow {
    pub stream: String,
    pub ts: i64,
    pub event_id: String,
}
