// crates/reqscan-db/tests/scenario_dedup.rs
//
// Insert two records with identical payload; first put succeeds, second
// reports duplicate, and the count reflects one row.

mod common;

use reqscan_codec::CapturedRequest;
use reqscan_db::{InsertOutcome, RequestQueue};

fn sample() -> CapturedRequest {
    CapturedRequest {
        method: "GET".to_string(),
        url: "https://target.internal/".to_string(),
        headers: Default::default(),
        body: Vec::new(),
        meta: serde_json::json!({}),
    }
}

#[tokio::test]
async fn duplicate_insert_is_not_an_error() {
    let Some(adapter) = common::adapter().await else {
        eprintln!("skipping: RESULTQUEUE_TEST_DATABASE_URL not set");
        return;
    };
    let prefix = common::unique_prefix("dedup");
    let queue = RequestQueue::open(adapter, &prefix).await.unwrap();

    let req = sample();
    let first = queue.put(&req).await.unwrap();
    let second = queue.put(&req).await.unwrap();

    assert_eq!(first, InsertOutcome::Inserted);
    assert_eq!(second, InsertOutcome::Duplicate);

    let (total, scanned) = queue.get_scan_count().await.unwrap();
    assert_eq!((total, scanned), (1, 0));
}
