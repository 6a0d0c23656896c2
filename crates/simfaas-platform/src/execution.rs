//! In-flight execution accounting.

use crate::counters::PlatformCounters;
use crate::record::FunctionRecord;
use std::time::Duration;
use tokio::time::Instant;

/// Holds one slot in both the per-function and the platform-wide
/// active-execution counters. The slot is released on drop, so the counters
/// stay paired even if the owning future is cancelled mid-sleep.
pub(crate) struct ExecutionGuard<'a> {
    record: &'a FunctionRecord,
    counters: &'a PlatformCounters,
}

impl<'a> ExecutionGuard<'a> {
    pub(crate) fn enter(record: &'a FunctionRecord, counters: &'a PlatformCounters) -> Self {
        record.execution_started();
        counters.execution_started();
        Self { record, counters }
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.record.execution_finished();
        self.counters.execution_finished();
    }
}

/// Simulates an execution of `runtime` and returns the elapsed time.
///
/// `last_executed_at` is recorded before the execution slot is released, so
/// the reaper never sees a finished execution with a stale timestamp.
pub(crate) async fn execute(
    record: &FunctionRecord,
    counters: &PlatformCounters,
    runtime: Duration,
) -> Duration {
    let guard = ExecutionGuard::enter(record, counters);
    let started = Instant::now();
    tokio::time::sleep(runtime).await;
    let finished = Instant::now();
    record.mark_executed(finished).await;
    drop(guard);
    finished - started
}
