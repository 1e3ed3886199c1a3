// crates/reqscan-db/tests/common/mod.rs
//
// Scenario tests need a real Postgres. Point `RESULTQUEUE_TEST_DATABASE_URL`
// at one to run them; otherwise each test prints a notice and returns early,
// so CI lanes without a database still pass.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use reqscan_db::StorageAdapter;

static COUNTER: AtomicU64 = AtomicU64::new(0);

pub async fn adapter() -> Option<Arc<StorageAdapter>> {
    let url = std::env::var("RESULTQUEUE_TEST_DATABASE_URL").ok()?;
    let adapter = StorageAdapter::connect(&url, 5)
        .await
        .expect("connect to test database");
    Some(Arc::new(adapter))
}

/// A fresh, collision-free table prefix for one test run.
pub fn unique_prefix(label: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("t_{label}_{ts}_{n}")
}
