// crates/reqscan-http/src/lib.rs
//!
//! Concurrency-bounded HTTP client shared by all worker tasks of a scanner
//! module, plus the scoped context hook invoked around every attempt.

mod context;
mod method;
mod session;

pub use context::ContextGuard;
pub use method::{HttpMethod, UnknownHttpMethod};
pub use session::{ProbeError, ProbeResponse, ProbeSession};
