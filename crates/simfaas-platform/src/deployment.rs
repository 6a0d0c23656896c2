//! Cold-start simulation and the UNDEPLOYED <-> WARM transitions.
//!
//! Both directions of the transition happen while holding the record lock,
//! so at most one caller per function pays the cold start per cold
//! transition. Callers that queued behind the winner re-check the state
//! once they get the lock and return without further delay.

use crate::counters::PlatformCounters;
use crate::record::{FunctionRecord, InstanceState};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Deploys the function's instance if it is not already warm.
///
/// Returns the cold-start latency this call paid, which is zero unless this
/// caller performed the transition.
pub(crate) async fn deploy(record: &FunctionRecord, counters: &PlatformCounters) -> Duration {
    if record.is_warm() {
        return Duration::ZERO;
    }

    let started = Instant::now();
    let mut timestamps = record.lock().await;
    if record.is_warm() {
        return Duration::ZERO;
    }

    tokio::time::sleep(record.config().cold_start).await;
    record.set_instance_state(InstanceState::Warm);
    timestamps.deployed_at = Some(Instant::now());
    counters.instance_deployed();
    drop(timestamps);

    info!("{}: deployed instance (0 -> 1)", record.name());
    started.elapsed()
}

/// Reclaims a warm instance that has been idle for longer than its
/// keep-warm window.
///
/// A record whose lock is held (deploying, or recording an execution) is
/// busy and skipped. Returns whether the instance was reclaimed.
pub(crate) fn reclaim_if_idle(
    record: &FunctionRecord,
    counters: &PlatformCounters,
    now: Instant,
) -> bool {
    if !record.is_warm() || record.active_executions() > 0 {
        return false;
    }

    let Some(timestamps) = record.try_lock() else {
        return false;
    };
    if !record.is_warm()
        || record.active_executions() > 0
        || !timestamps.idle_past(record.config().keep_warm, now)
    {
        return false;
    }

    record.set_instance_state(InstanceState::Undeployed);
    counters.instance_reclaimed();
    drop(timestamps);

    info!("{}: cleaned up instance (1 -> 0)", record.name());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use simfaas_common::FunctionConfig;
    use std::sync::Arc;

    fn record(cold_start: Duration, keep_warm: Duration) -> Arc<FunctionRecord> {
        Arc::new(FunctionRecord::new(
            "fn",
            FunctionConfig::new(cold_start, keep_warm, Duration::ZERO),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_deploy_pays_cold_start_once() {
        let counters = PlatformCounters::default();
        let record = record(Duration::from_secs(2), Duration::from_secs(5));

        let first = deploy(&record, &counters).await;
        assert_eq!(first, Duration::from_secs(2));
        assert!(record.is_warm());
        assert!(record.deployed_at().await.is_some());
        assert_eq!(counters.active_instances(), 1);

        let second = deploy(&record, &counters).await;
        assert_eq!(second, Duration::ZERO);
        assert_eq!(counters.active_instances(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_deploys_serialize_on_lock() {
        let counters = Arc::new(PlatformCounters::default());
        let record = record(Duration::from_secs(1), Duration::from_secs(5));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let record = record.clone();
                let counters = counters.clone();
                tokio::spawn(async move { deploy(&record, &counters).await })
            })
            .collect();

        let mut cold = 0;
        for handle in handles {
            if !handle.await.unwrap().is_zero() {
                cold += 1;
            }
        }
        assert_eq!(cold, 1);
        assert_eq!(counters.active_instances(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reclaim_requires_idle_window() {
        let counters = PlatformCounters::default();
        let record = record(Duration::ZERO, Duration::from_secs(5));
        deploy(&record, &counters).await;

        assert!(!reclaim_if_idle(&record, &counters, Instant::now()));
        assert!(record.is_warm());

        let later = Instant::now() + Duration::from_secs(6);
        assert!(reclaim_if_idle(&record, &counters, later));
        assert!(!record.is_warm());
        assert_eq!(counters.active_instances(), 0);

        // Already undeployed: nothing to do.
        assert!(!reclaim_if_idle(&record, &counters, later));
        assert_eq!(counters.active_instances(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reclaim_skips_active_and_locked_records() {
        let counters = PlatformCounters::default();
        let record = record(Duration::ZERO, Duration::ZERO);
        deploy(&record, &counters).await;
        let later = Instant::now() + Duration::from_secs(1);

        record.execution_started();
        assert!(!reclaim_if_idle(&record, &counters, later));
        record.execution_finished();

        let guard = record.lock().await;
        assert!(!reclaim_if_idle(&record, &counters, later));
        drop(guard);

        assert!(reclaim_if_idle(&record, &counters, later));
    }
}
