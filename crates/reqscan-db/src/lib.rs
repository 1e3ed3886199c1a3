// crates/reqscan-db/src/lib.rs
//!
//! Storage adapter and request queue. One `StorageAdapter` wraps the
//! connection pool; one `RequestQueue` per (adapter, prefix) pair owns the
//! `start_id` cursor and the dispatch protocol.

mod queue;
mod status;
mod storage;

pub use queue::{InsertOutcome, RequestQueue, ScanRecord};
pub use status::{DecodeStatusError, ScanStatus};
pub use storage::{DatabaseError, StorageAdapter};
