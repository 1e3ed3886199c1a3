// crates/reqscan-db/tests/scenario_dispatch_and_complete.rs
//
// 5 records inserted, a batch of 3 claimed and completed, then the
// remaining 2 dispatched on the next call.

mod common;

use reqscan_codec::CapturedRequest;
use reqscan_db::{RequestQueue, ScanStatus};

fn req(n: usize) -> CapturedRequest {
    CapturedRequest {
        method: "GET".to_string(),
        url: format!("https://target.internal/{n}"),
        headers: Default::default(),
        body: Vec::new(),
        meta: serde_json::json!({}),
    }
}

#[tokio::test]
async fn dispatch_then_complete_advances_cursor() {
    let Some(adapter) = common::adapter().await else {
        eprintln!("skipping: RESULTQUEUE_TEST_DATABASE_URL not set");
        return;
    };
    let prefix = common::unique_prefix("dispatch");
    let queue = RequestQueue::open(adapter, &prefix).await.unwrap();

    for i in 1..=5 {
        queue.put(&req(i)).await.unwrap();
    }

    let batch = queue.get_new_scan(3).await.unwrap();
    let ids: Vec<i64> = batch.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(batch.iter().all(|r| r.scan_status == ScanStatus::InProgress));

    queue.mark_result(3, &[]).await.unwrap();
    assert_eq!(queue.start_id(), 3);

    let next = queue.get_new_scan(10).await.unwrap();
    let next_ids: Vec<i64> = next.iter().map(|r| r.id).collect();
    assert_eq!(next_ids, vec![4, 5]);
}
