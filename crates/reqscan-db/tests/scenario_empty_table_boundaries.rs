// crates/reqscan-db/tests/scenario_empty_table_boundaries.rs
//
// Boundary behaviors on a table that has never had a row inserted, and the
// `count = 0` edge case for get_new_scan.

mod common;

use reqscan_codec::CapturedRequest;
use reqscan_db::RequestQueue;

#[tokio::test]
async fn empty_table_boundaries() {
    let Some(adapter) = common::adapter().await else {
        eprintln!("skipping: RESULTQUEUE_TEST_DATABASE_URL not set");
        return;
    };
    let prefix = common::unique_prefix("empty");
    let queue = RequestQueue::open(adapter, &prefix).await.unwrap();

    assert!(queue.get_new_scan(3).await.unwrap().is_empty());
    assert_eq!(queue.get_scan_count().await.unwrap(), (0, 0));
    assert_eq!(queue.get_last_time().await.unwrap(), 0);

    let req = CapturedRequest {
        method: "GET".to_string(),
        url: "https://target.internal/".to_string(),
        headers: Default::default(),
        body: Vec::new(),
        meta: serde_json::json!({}),
    };
    queue.put(&req).await.unwrap();

    assert!(queue.get_new_scan(0).await.unwrap().is_empty());
}
