// crates/reqscan-daemon/src/worker.rs
//!
//! The scanner-module driver: pull a batch from the queue, translate each
//! record into an outbound probe, send them all concurrently through the
//! shared session, and report the batch's completion back. This loop owns
//! no correctness contract of its own — dispatch safety belongs to the
//! queue and concurrency bounding belongs to the session.
//!
//! Exactly one task runs `get_new_scan`/`mark_result` per queue; probing
//! the batch's records concurrently below runs many in-flight tasks on one
//! event loop, bounded by the session's own semaphore rather than by this
//! loop spawning one dispatcher per worker.

use std::sync::Arc;
use std::time::Duration;

use reqscan_db::RequestQueue;
use reqscan_http::ProbeSession;
use tracing::{debug, warn};

use crate::error::CoreError;

/// How many records one `get_new_scan` call asks for.
pub const BATCH_SIZE: i64 = 16;

/// How long an idle dispatcher waits before polling the queue again.
const IDLE_BACKOFF: Duration = Duration::from_millis(500);

/// Runs forever, dispatching batches from `queue` through `session`. Safe
/// to call exactly once per queue; see the single-consumer note above.
pub async fn run(queue: Arc<RequestQueue>, session: Arc<ProbeSession>) {
    loop {
        let batch = match queue.get_new_scan(BATCH_SIZE).await {
            Ok(batch) => batch,
            Err(e) => {
                let e = CoreError::from(e);
                warn!("get_new_scan failed, backing off: {e}");
                tokio::time::sleep(IDLE_BACKOFF).await;
                continue;
            }
        };

        if batch.is_empty() {
            tokio::time::sleep(IDLE_BACKOFF).await;
            continue;
        }

        let last_id = batch.last().map(|r| r.id).expect("checked non-empty above");

        let mut tasks = Vec::with_capacity(batch.len());
        for record in batch {
            let id = record.id;
            let session = Arc::clone(&session);
            let handle = tokio::spawn(async move {
                let request = match record.request() {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("record {id} failed to decode, treating as failed: {e}");
                        return false;
                    }
                };
                match session.send(&request).await {
                    Ok(response) => {
                        debug!("record {id} probed, status={}", response.status);
                        true
                    }
                    Err(e) => {
                        let e = CoreError::from(e);
                        warn!("record {id} probe failed: {e}");
                        false
                    }
                }
            });
            tasks.push((id, handle));
        }

        let mut failed_ids = Vec::new();
        for (id, task) in tasks {
            match task.await {
                Ok(true) => {}
                Ok(false) => failed_ids.push(id),
                Err(e) => {
                    warn!("probe task for record {id} panicked: {e}");
                    failed_ids.push(id);
                }
            }
        }

        if let Err(e) = queue.mark_result(last_id, &failed_ids).await {
            let e = CoreError::from(e);
            warn!("mark_result failed for batch through {last_id}: {e}");
        }
    }
}
