// crates/reqscan-daemon/src/state.rs
//!
//! Shared runtime state for reqscan-daemon. Handlers receive
//! `State<Arc<AppState>>` from Axum; this module owns nothing async itself.

use std::sync::Arc;
use std::time::Instant;

use reqscan_db::RequestQueue;
use reqscan_http::ProbeSession;
use serde::Serialize;

/// Cloneable (Arc) handle shared across all Axum handlers and worker tasks.
pub struct AppState {
    pub queue: Arc<RequestQueue>,
    pub session: Arc<ProbeSession>,
    pub prefix: String,
    started_at: Instant,
}

impl AppState {
    pub fn new(queue: Arc<RequestQueue>, session: Arc<ProbeSession>, prefix: String) -> Self {
        Self {
            queue,
            session,
            prefix,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Point-in-time progress snapshot, returned by `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub prefix: String,
    pub uptime_secs: u64,
    pub total: i64,
    pub scanned: i64,
    pub start_id: i64,
    pub last_insert_time: i64,
}
