//! SQLite cursor store implementation.
//!
//! Diesel is synchronous, so every query runs on the blocking thread pool.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use tracing::warn;

use super::connection::{create_pool, run_migrations, DbPool};
use super::model::{CursorRow, SeenEventRow};
use super::schema::{cursors, seen_events};
use crate::domain::{Cursor, EventId, StoreCapability, StreamName};
use crate::error::{Error, Result};
use crate::port::outbound::cursor::CursorStore;

fn to_db_ts(ts: u64) -> Result<i64> {
    i64::try_from(ts).map_err(|_| Error::Parse(format!("timestamp {ts} out of range")))
}

fn from_db_ts(ts: i64) -> Result<u64> {
    u64::try_from(ts).map_err(|_| Error::Parse(format!("negative timestamp {ts} in store")))
}

/// SQLite-backed cursor store with a durable seen-set.
#[derive(Clone)]
pub struct SqliteCursorStore {
    pool: DbPool,
    stream: StreamName,
}

impl SqliteCursorStore {
    /// Create a store over an existing, migrated pool.
    #[must_use]
    pub fn new(pool: DbPool, stream: StreamName) -> Self {
        Self { pool, stream }
    }

    /// Open the database at `database_url`, running pending migrations.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be created or migrations fail.
    pub fn open(database_url: &str, stream: StreamName) -> Result<Self> {
        let pool = create_pool(database_url)?;
        run_migrations(&pool)?;
        Ok(Self::new(pool, stream))
    }

    /// Run a query on the blocking pool with a pooled connection.
    async fn with_conn<T, F>(&self, query: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection, &str) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let stream = self.stream.as_str().to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| Error::Connection(e.to_string()))?;
            query(&mut conn, &stream)
        })
        .await
        .map_err(|e| Error::Database(e.to_string()))?
    }

    async fn try_load(&self) -> Result<Option<Cursor>> {
        let row: Option<CursorRow> = self
            .with_conn(|conn, stream| {
                cursors::table
                    .find(stream)
                    .select(CursorRow::as_select())
                    .first(conn)
                    .optional()
                    .map_err(|e| Error::Database(e.to_string()))
            })
            .await?;
        row.map(|r| from_db_ts(r.last_ts).map(Cursor::new))
            .transpose()
    }

    /// Timestamps that currently hold seen-set entries, ascending.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn seen_buckets(&self) -> Result<Vec<u64>> {
        let rows: Vec<i64> = self
            .with_conn(|conn, stream| {
                seen_events::table
                    .filter(seen_events::stream.eq(stream))
                    .select(seen_events::ts)
                    .distinct()
                    .order(seen_events::ts.asc())
                    .load(conn)
                    .map_err(|e| Error::Database(e.to_string()))
            })
            .await?;
        rows.into_iter().map(from_db_ts).collect()
    }
}

#[async_trait]
impl CursorStore for SqliteCursorStore {
    async fn load(&self) -> Cursor {
        match self.try_load().await {
            Ok(cursor) => cursor.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, stream = %self.stream, "Failed to load cursor, starting from zero");
                Cursor::zero()
            }
        }
    }

    async fn save(&self, cursor: Cursor) -> Result<()> {
        let last_ts = to_db_ts(cursor.last_ts)?;
        self.with_conn(move |conn, stream| {
            let row = CursorRow {
                stream: stream.to_string(),
                last_ts,
                updated_at: Utc::now().to_rfc3339(),
            };
            diesel::replace_into(cursors::table)
                .values(&row)
                .execute(conn)
                .map_err(|e| Error::Database(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn mark_seen(&self, ts: u64, id: &EventId) -> Result<()> {
        let ts = to_db_ts(ts)?;
        let event_id = id.as_str().to_string();
        self.with_conn(move |conn, stream| {
            let row = SeenEventRow {
                stream: stream.to_string(),
                ts,
                event_id,
            };
            diesel::insert_or_ignore_into(seen_events::table)
                .values(&row)
                .execute(conn)
                .map_err(|e| Error::Database(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn is_seen(&self, ts: u64, id: &EventId) -> Result<bool> {
        let ts = to_db_ts(ts)?;
        let event_id = id.as_str().to_string();
        self.with_conn(move |conn, stream| {
            diesel::select(diesel::dsl::exists(
                seen_events::table
                    .filter(seen_events::stream.eq(stream))
                    .filter(seen_events::ts.eq(ts))
                    .filter(seen_events::event_id.eq(event_id)),
            ))
            .get_result(conn)
            .map_err(|e| Error::Database(e.to_string()))
        })
        .await
    }

    async fn rotate(&self, old_ts: u64, new_ts: u64) -> Result<()> {
        if new_ts <= old_ts {
            return Ok(());
        }
        let below = to_db_ts(new_ts)?;
        self.with_conn(move |conn, stream| {
            diesel::delete(
                seen_events::table
                    .filter(seen_events::stream.eq(stream))
                    .filter(seen_events::ts.lt(below)),
            )
            .execute(conn)
            .map_err(|e| Error::Database(e.to_string()))?;
            Ok(())
        })
        .await
    }

    fn capability(&self) -> StoreCapability {
        StoreCapability::Deduplicating
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
