// crates/reqscan-http/src/session.rs

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info};

use reqscan_codec::CapturedRequest;

use crate::context::ContextGuard;
use crate::method::{HttpMethod, UnknownHttpMethod};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    UnknownMethod(#[from] UnknownHttpMethod),
    #[error("scan request failed after exhausting retries")]
    ScanRequestFailed,
    #[error("failed to build outbound request: {0}")]
    Build(#[source] reqwest::Error),
}

/// `{status, headers, body}` returned by a successful `send`.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Per-scanner-module HTTP client, constructed once and reused by every
/// worker task of that module. The connection pool is the only shared
/// mutable resource within a module; `max_concurrent_request` is enforced
/// by a semaphore guarding every `send` call.
pub struct ProbeSession {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
    retry_times: u32,
    next_correlation_id: AtomicU64,
}

impl ProbeSession {
    /// Build a client with no cookie jar, no redirect following, and TLS
    /// verification disabled — the scanner replays captured requests
    /// verbatim against internal/staging hosts with self-signed certs.
    /// `request_timeout` bounds connect-through-body-read for a single
    /// attempt.
    pub fn new(
        max_concurrent_request: usize,
        request_timeout: Duration,
        retry_times: u32,
    ) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(ProbeError::Build)?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(max_concurrent_request)),
            retry_times,
            next_correlation_id: AtomicU64::new(1),
        })
    }

    /// Idempotent close: draining pooled connections is automatic once the
    /// last clone of the underlying `reqwest::Client` is dropped, so close
    /// is a no-op here beyond documenting the contract — closing must be
    /// idempotent and must drain pooled connections.
    pub async fn close(&self) {}

    /// Translate `request` into an outbound call and send it, retrying on
    /// timeout/transport errors up to `retry_times` additional attempts
    /// with a fixed 1s backoff floor. Unknown methods are rejected before
    /// any network I/O or semaphore acquisition.
    pub async fn send(&self, request: &CapturedRequest) -> Result<ProbeResponse, ProbeError> {
        let method = HttpMethod::from_str(&request.method)?;

        let _permit = self
            .permits
            .acquire()
            .await
            .expect("semaphore never closed");

        let correlation_id = self.next_correlation_id.fetch_add(1, Ordering::Relaxed);
        let mut retries_left = self.retry_times;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let guard = ContextGuard::enter(correlation_id, attempt);
            let outcome = self.try_once(method, request).await;
            drop(guard);

            match outcome {
                Ok(response) => return Ok(response),
                Err(AttemptError::Transport(e)) => {
                    info!("scan probe timeout/transport error, retrying: {e}");
                }
                Err(AttemptError::Other(e)) => {
                    error!("scan probe failed unexpectedly: {e:?}");
                }
            }

            if retries_left == 0 {
                return Err(ProbeError::ScanRequestFailed);
            }
            retries_left -= 1;
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    async fn try_once(
        &self,
        method: HttpMethod,
        request: &CapturedRequest,
    ) -> Result<ProbeResponse, AttemptError> {
        let mut builder = self.client.request(method.into(), &request.url);
        for (k, v) in &request.headers {
            builder = builder.header(k, v);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body = response.bytes().await.map_err(classify)?.to_vec();

        Ok(ProbeResponse {
            status,
            headers,
            body,
        })
    }
}

enum AttemptError {
    Transport(reqwest::Error),
    Other(reqwest::Error),
}

fn classify(e: reqwest::Error) -> AttemptError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        AttemptError::Transport(e)
    } else {
        AttemptError::Other(e)
    }
}
