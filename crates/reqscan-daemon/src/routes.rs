// crates/reqscan-daemon/src/routes.rs
//!
//! HTTP surface: a single progress-polling endpoint. The queue's own
//! read-only operations (`get_scan_count`, `get_last_time`) do all the
//! work; this module is pure translation into JSON.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::{AppState, StatusSnapshot};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .with_state(state)
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusSnapshot> {
    let (total, scanned) = state.queue.get_scan_count().await.unwrap_or((0, 0));
    let last_insert_time = state.queue.get_last_time().await.unwrap_or(0);

    Json(StatusSnapshot {
        prefix: state.prefix.clone(),
        uptime_secs: state.uptime_secs(),
        total,
        scanned,
        start_id: state.queue.start_id(),
        last_insert_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use reqscan_db::{RequestQueue, StorageAdapter};
    use reqscan_http::ProbeSession;
    use std::time::Duration;
    use tower::ServiceExt;

    #[tokio::test]
    async fn status_route_reports_empty_queue() {
        let Ok(url) = std::env::var("RESULTQUEUE_TEST_DATABASE_URL") else {
            eprintln!("skipping: RESULTQUEUE_TEST_DATABASE_URL not set");
            return;
        };
        let adapter = Arc::new(StorageAdapter::connect(&url, 2).await.unwrap());
        let queue = Arc::new(
            RequestQueue::open(adapter, "t_daemon_status_route")
                .await
                .unwrap(),
        );
        let session = Arc::new(ProbeSession::new(1, Duration::from_secs(5), 0).unwrap());
        let state = Arc::new(AppState::new(queue, session, "t_daemon_status_route".into()));

        let app = build_router(state);
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/status")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let snapshot: StatusSnapshot = serde_json::from_slice(&body).unwrap();
        assert_eq!(snapshot.total, 0);
        assert_eq!(snapshot.scanned, 0);
    }
}
