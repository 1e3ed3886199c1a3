// crates/reqscan-http/src/context.rs

use tracing::span::EnteredSpan;

/// Scoped acquire/release pair invoked around every HTTP attempt. Acquire
/// runs before the request starts; release runs on every exit path
/// — including early return, `?`-propagated errors, and task cancellation —
/// because it rides on `Drop`, not on an explicit "finally" the caller could
/// forget to call.
///
/// A typical use is to stamp a per-request correlation id into the logging
/// context, which is exactly what entering a `tracing` span does: every log
/// line emitted while the guard is alive carries `attempt` and
/// `correlation_id` fields.
pub struct ContextGuard {
    _span: EnteredSpan,
}

impl ContextGuard {
    pub fn enter(correlation_id: u64, attempt: u32) -> Self {
        let span = tracing::info_span!("scan_probe", correlation_id, attempt).entered();
        Self { _span: span }
    }
}
