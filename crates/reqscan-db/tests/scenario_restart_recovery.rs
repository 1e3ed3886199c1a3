// crates/reqscan-db/tests/scenario_restart_recovery.rs
//
// A queue reopened on the same table resets any IN_PROGRESS/FAILED rows
// back to UNSCANNED and recomputes start_id.

mod common;

use reqscan_codec::CapturedRequest;
use reqscan_db::RequestQueue;

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
async fn reopening_recovers_in_progress_rows() {
    let Some(adapter) = common::adapter().await else {
        eprintln!("skipping: RESULTQUEUE_TEST_DATABASE_URL not set");
        return;
    };
    let prefix = common::unique_prefix("restart");

    {
        let queue = RequestQueue::open(adapter.clone(), &prefix).await.unwrap();
        for i in 1..=3 {
            queue.put(&req(i)).await.unwrap();
        }
        let batch = queue.get_new_scan(3).await.unwrap();
        assert_eq!(batch.len(), 3);
        // Process crashes here: rows 1-3 are left IN_PROGRESS, queue dropped
        // without a mark_result call.
    }

    let reopened = RequestQueue::open(adapter, &prefix).await.unwrap();
    assert_eq!(reopened.start_id(), 0);

    let batch = reopened.get_new_scan(3).await.unwrap();
    let ids: Vec<i64> = batch.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}
