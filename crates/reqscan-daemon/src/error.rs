// crates/reqscan-daemon/src/error.rs
//!
//! `reqscan-db` and `reqscan-http` have no dependency relationship to each
//! other and so no shared place to define one error enum; this crate
//! depends on both, so it's the classifier that lets the worker loop log a
//! DB failure and an exhausted-retry probe failure the same way regardless
//! of which library raised it.

use reqscan_db::DatabaseError;
use reqscan_http::ProbeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("scan request failed after exhausting retries")]
    ScanRequestFailed,
    #[error("unknown HTTP method: {0}")]
    UnknownHttpMethod(String),
}

impl From<ProbeError> for CoreError {
    fn from(e: ProbeError) -> Self {
        match e {
            ProbeError::UnknownMethod(m) => CoreError::UnknownHttpMethod(m.0),
            ProbeError::ScanRequestFailed | ProbeError::Build(_) => CoreError::ScanRequestFailed,
        }
    }
}
