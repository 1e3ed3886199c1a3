// crates/reqscan-db/src/storage.rs

use std::collections::HashSet;
use std::sync::Mutex;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::error;

use crate::status::DecodeStatusError;

/// Failure surfaced by the storage layer: either a raw driver error, or a
/// row whose `scan_status` column holds a value outside the four known
/// states. Unique-constraint violations on `put` are handled by the
/// caller before they ever reach this type — a duplicate is not an error.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Decode(#[from] DecodeStatusError),
}

/// Logs every database failure at `error!` right before converting it into
/// a `DatabaseError`, so the logging contract is uniform across every
/// driver call and every row-decode site, not just some of them.
pub(crate) fn log_db_err<E>(op: &'static str) -> impl Fn(E) -> DatabaseError
where
    E: std::fmt::Display,
    DatabaseError: From<E>,
{
    move |e| {
        error!("database error in {op}: {e}");
        DatabaseError::from(e)
    }
}

/// Thin async-capable handle wrapping the connection pool. Owns the
/// "table exists" bookkeeping so `RequestQueue::open` doesn't reissue
/// `CREATE TABLE IF NOT EXISTS` on every operation.
pub struct StorageAdapter {
    pool: PgPool,
    known_tables: Mutex<HashSet<String>>,
}

impl StorageAdapter {
    /// Open a connection pool sized from config.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(log_db_err("connect"))?;
        Ok(Self {
            pool,
            known_tables: Mutex::new(HashSet::new()),
        })
    }

    /// Wrap an already-open pool (tests, or a process sharing one pool
    /// across several scan tables).
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            known_tables: Mutex::new(HashSet::new()),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `"<prefix>_ResultList"`.
    pub fn table_name(prefix: &str) -> String {
        format!("{prefix}_ResultList")
    }

    /// Create the per-prefix table idempotently. Issued once per distinct
    /// prefix seen by this adapter; subsequent calls for an already-seen
    /// prefix are no-ops.
    pub async fn ensure_table(&self, prefix: &str) -> Result<(), DatabaseError> {
        let table = Self::table_name(prefix);
        {
            let known = self.known_tables.lock().unwrap();
            if known.contains(&table) {
                return Ok(());
            }
        }

        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{table}" (
                id          BIGSERIAL PRIMARY KEY,
                data        BYTEA NOT NULL,
                data_hash   VARCHAR(63) NOT NULL,
                scan_status INTEGER NOT NULL DEFAULT 0,
                time        BIGINT NOT NULL DEFAULT EXTRACT(EPOCH FROM now())::BIGINT
            )
            "#
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(log_db_err("ensure_table/create_table"))?;

        let idx = format!(
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "{table}_data_hash_idx" ON "{table}" (data_hash)"#
        );
        sqlx::query(&idx)
            .execute(&self.pool)
            .await
            .map_err(log_db_err("ensure_table/create_index"))?;

        self.known_tables.lock().unwrap().insert(table);
        Ok(())
    }
}
