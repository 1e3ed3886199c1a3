// crates/reqscan-db/src/queue.rs

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use sqlx::Row;

use reqscan_codec::CapturedRequest;

use crate::status::ScanStatus;
use crate::storage::{log_db_err, DatabaseError, StorageAdapter};

/// One row of a scan table.
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub id: i64,
    pub data: Vec<u8>,
    pub data_hash: String,
    pub scan_status: ScanStatus,
    pub time: i64,
}

impl ScanRecord {
    /// Decode `data` back into the captured request it was built from.
    pub fn request(&self) -> anyhow::Result<CapturedRequest> {
        reqscan_codec::decode(&self.data)
    }
}

/// `put`'s result: whether the record was newly inserted or was already
/// present by `data_hash`. A duplicate is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// The durable, monotonically-advancing work queue for one scan table.
///
/// One `RequestQueue` per (db, prefix) pair; exactly one consumer process
/// per table. `start_id` is owned exclusively by this instance and is never
/// mutated anywhere else.
pub struct RequestQueue {
    adapter: Arc<StorageAdapter>,
    table: String,
    start_id: AtomicI64,
}

impl RequestQueue {
    /// Open the queue: ensure the table exists, recompute `start_id`, and
    /// recover from an unclean prior shutdown by resetting any
    /// `IN_PROGRESS`/`FAILED` row back to `UNSCANNED`.
    pub async fn open(adapter: Arc<StorageAdapter>, prefix: &str) -> Result<Self, DatabaseError> {
        adapter.ensure_table(prefix).await?;
        let table = StorageAdapter::table_name(prefix);

        let queue = Self {
            adapter,
            table,
            start_id: AtomicI64::new(0),
        };

        let start_id = queue.compute_start_id().await?;
        queue.start_id.store(start_id, Ordering::SeqCst);
        queue.reset_unscanned_item().await?;

        Ok(queue)
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.adapter.pool()
    }

    /// `start_id = max(0, min_id_of_nonScanned - 1)`.
    async fn compute_start_id(&self) -> Result<i64, DatabaseError> {
        let sql = format!(
            r#"SELECT MIN(id) AS min_id FROM "{}" WHERE scan_status <> $1"#,
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(ScanStatus::Scanned.as_i32())
            .fetch_one(self.pool())
            .await
            .map_err(log_db_err("compute_start_id"))?;
        let min_id: Option<i64> = row.try_get("min_id").map_err(log_db_err("compute_start_id/min_id"))?;
        Ok(match min_id {
            None => 0,
            Some(m) => m - 1,
        })
    }

    /// The current high-water cursor: every id `<= start_id` is out of the
    /// working set.
    pub fn start_id(&self) -> i64 {
        self.start_id.load(Ordering::SeqCst)
    }

    /// `reset_unscanned_item`: any `IN_PROGRESS` or `FAILED` row becomes
    /// `UNSCANNED`. Recovers from an unclean prior shutdown; idempotent.
    pub async fn reset_unscanned_item(&self) -> Result<(), DatabaseError> {
        let sql = format!(
            r#"UPDATE "{}" SET scan_status = $1 WHERE scan_status > $2"#,
            self.table
        );
        sqlx::query(&sql)
            .bind(ScanStatus::Unscanned.as_i32())
            .bind(ScanStatus::Scanned.as_i32())
            .execute(self.pool())
            .await
            .map_err(log_db_err("reset_unscanned_item"))?;
        Ok(())
    }

    /// Serialize, hash, and insert a captured request. Returns
    /// `Duplicate` rather than an error when `data_hash` already exists.
    pub async fn put(&self, req: &CapturedRequest) -> anyhow::Result<InsertOutcome> {
        let data = reqscan_codec::encode(req)?;
        let data_hash = reqscan_codec::hash(req)?;

        let sql = format!(
            r#"
            INSERT INTO "{}" (data, data_hash)
            VALUES ($1, $2)
            ON CONFLICT (data_hash) DO NOTHING
            RETURNING id
            "#,
            self.table
        );
        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(&data)
            .bind(&data_hash)
            .fetch_optional(self.pool())
            .await
            .map_err(log_db_err("put"))?;

        Ok(if row.is_some() {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Duplicate
        })
    }

    /// Three-step dispatch protocol: probe for a starting id, claim up to
    /// `count` rows in id order, then fetch the claimed rows.
    /// Returned count is `<= count`; callers must not assume exact `count`.
    pub async fn get_new_scan(&self, count: i64) -> Result<Vec<ScanRecord>, DatabaseError> {
        if count <= 0 {
            return Ok(Vec::new());
        }
        let start_id = self.start_id();

        // Step 1: probe.
        let probe_sql = format!(
            r#"SELECT id FROM "{}" WHERE id > $1 AND scan_status = $2 ORDER BY id LIMIT 1"#,
            self.table
        );
        let probe: Option<(i64,)> = sqlx::query_as(&probe_sql)
            .bind(start_id)
            .bind(ScanStatus::Unscanned.as_i32())
            .fetch_optional(self.pool())
            .await
            .map_err(log_db_err("get_new_scan/probe"))?;
        let Some((fetch_start_id,)) = probe else {
            return Ok(Vec::new());
        };

        // Step 2: claim. `FOR UPDATE SKIP LOCKED` keeps this safe if ever run
        // against a table another process is touching manually, even though
        // this queue is meant to have a single consumer per table.
        let claim_sql = format!(
            r#"
            WITH to_claim AS (
                SELECT id FROM "{table}"
                WHERE scan_status = $1 AND id > $2
                ORDER BY id
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            UPDATE "{table}"
            SET scan_status = $4
            WHERE id IN (SELECT id FROM to_claim)
            RETURNING id
            "#,
            table = self.table
        );
        let claimed_ids: Vec<(i64,)> = sqlx::query_as(&claim_sql)
            .bind(ScanStatus::Unscanned.as_i32())
            .bind(start_id)
            .bind(count)
            .bind(ScanStatus::InProgress.as_i32())
            .fetch_all(self.pool())
            .await
            .map_err(log_db_err("get_new_scan/claim"))?;
        let n = claimed_ids.len() as i64;
        if n == 0 {
            return Ok(Vec::new());
        }

        // Step 3: fetch the claimed rows.
        let fetch_sql = format!(
            r#"
            SELECT id, data, data_hash, scan_status, time
            FROM "{}"
            WHERE id >= $1 AND scan_status = $2
            ORDER BY id
            LIMIT $3
            "#,
            self.table
        );
        let rows = sqlx::query(&fetch_sql)
            .bind(fetch_start_id)
            .bind(ScanStatus::InProgress.as_i32())
            .bind(n)
            .fetch_all(self.pool())
            .await
            .map_err(log_db_err("get_new_scan/fetch"))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(decode_row(row)?);
        }
        Ok(out)
    }

    /// Mark the contiguous batch through `last_id` as complete: rows in
    /// `failed_ids` become `FAILED`, the rest of the `IN_PROGRESS` range
    /// becomes `SCANNED`, then `start_id` advances to
    /// `MAX(id) WHERE status = SCANNED` in the dispatched range — not to
    /// `last_id` itself, so a trailing run of `FAILED` ids does not
    /// spuriously advance past them. No-op if `last_id <= start_id`.
    ///
    /// Order matters: failures are marked before successes, or a failed row
    /// still sitting at `IN_PROGRESS` would be swept up by the
    /// `SCANNED` update.
    pub async fn mark_result(&self, last_id: i64, failed_ids: &[i64]) -> Result<(), DatabaseError> {
        let start_id = self.start_id();
        if last_id <= start_id {
            return Ok(());
        }

        if !failed_ids.is_empty() {
            let sql = format!(
                r#"
                UPDATE "{}"
                SET scan_status = $1
                WHERE id <= $2 AND id > $3 AND id = ANY($4)
                "#,
                self.table
            );
            sqlx::query(&sql)
                .bind(ScanStatus::Failed.as_i32())
                .bind(last_id)
                .bind(start_id)
                .bind(failed_ids)
                .execute(self.pool())
                .await
                .map_err(log_db_err("mark_result/fail"))?;
        }

        let sql = format!(
            r#"
            UPDATE "{}"
            SET scan_status = $1
            WHERE id <= $2 AND id > $3 AND scan_status = $4
            "#,
            self.table
        );
        sqlx::query(&sql)
            .bind(ScanStatus::Scanned.as_i32())
            .bind(last_id)
            .bind(start_id)
            .bind(ScanStatus::InProgress.as_i32())
            .execute(self.pool())
            .await
            .map_err(log_db_err("mark_result/scanned"))?;

        let sql = format!(
            r#"SELECT MAX(id) AS max_id FROM "{}" WHERE id > $1 AND scan_status = $2"#,
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(start_id)
            .bind(ScanStatus::Scanned.as_i32())
            .fetch_one(self.pool())
            .await
            .map_err(log_db_err("mark_result/advance"))?;
        let max_id: Option<i64> = row.try_get("max_id").map_err(log_db_err("mark_result/advance_maxid"))?;
        if let Some(new_start_id) = max_id {
            self.start_id.store(new_start_id, Ordering::SeqCst);
        }

        Ok(())
    }

    /// `(total, scanned)`. Eventually consistent under concurrent `put`s.
    pub async fn get_scan_count(&self) -> Result<(i64, i64), DatabaseError> {
        let scanned_sql = format!(
            r#"SELECT COUNT(*) AS n FROM "{}" WHERE scan_status = $1"#,
            self.table
        );
        let scanned: (i64,) = sqlx::query_as(&scanned_sql)
            .bind(ScanStatus::Scanned.as_i32())
            .fetch_one(self.pool())
            .await
            .map_err(log_db_err("get_scan_count/scanned"))?;

        let total_sql = format!(r#"SELECT COUNT(*) AS n FROM "{}""#, self.table);
        let total: (i64,) = sqlx::query_as(&total_sql)
            .fetch_one(self.pool())
            .await
            .map_err(log_db_err("get_scan_count/total"))?;

        Ok((total.0, scanned.0))
    }

    /// `time` of the most recently inserted row, or 0 if the table is
    /// empty.
    pub async fn get_last_time(&self) -> Result<i64, DatabaseError> {
        let sql = format!(
            r#"SELECT time FROM "{}" ORDER BY time DESC LIMIT 1"#,
            self.table
        );
        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .fetch_optional(self.pool())
            .await
            .map_err(log_db_err("get_last_time"))?;
        Ok(row.map(|(t,)| t).unwrap_or(0))
    }
}

/// A row whose `scan_status` column is out of range is a decode error, not
/// a guessed status: the caller (`get_new_scan`) propagates it rather than
/// silently substituting a status nobody wrote to the row.
fn decode_row(row: sqlx::postgres::PgRow) -> Result<ScanRecord, DatabaseError> {
    let id = row.try_get("id").map_err(log_db_err("decode_row/id"))?;
    let data = row.try_get("data").map_err(log_db_err("decode_row/data"))?;
    let data_hash = row
        .try_get("data_hash")
        .map_err(log_db_err("decode_row/data_hash"))?;
    let status_raw: i32 = row
        .try_get("scan_status")
        .map_err(log_db_err("decode_row/scan_status"))?;
    let scan_status =
        ScanStatus::from_i32(status_raw).map_err(log_db_err("decode_row/scan_status_range"))?;
    let time = row.try_get("time").map_err(log_db_err("decode_row/time"))?;

    Ok(ScanRecord {
        id,
        data,
        data_hash,
        scan_status,
        time,
    })
}
