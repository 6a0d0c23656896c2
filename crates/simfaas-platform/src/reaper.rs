//! Background task reclaiming idle warm instances.

use crate::counters::PlatformCounters;
use crate::deployment::reclaim_if_idle;
use crate::registry::FunctionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error};

pub(crate) struct Reaper {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Reaper {
    /// Spawns the reaper loop on the given runtime.
    pub(crate) fn spawn(
        runtime: &tokio::runtime::Handle,
        registry: Arc<FunctionRegistry>,
        counters: Arc<PlatformCounters>,
        interval: Duration,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = runtime.spawn(reap_loop(registry, counters, interval, stop_rx));
        Self { stop_tx, handle }
    }

    /// Signals the loop and waits for it to exit. A tick already in progress
    /// finishes first; no new tick starts.
    pub(crate) async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.handle.await {
            error!("Reaper task failed: {}", e);
        }
    }
}

async fn reap_loop(
    registry: Arc<FunctionRegistry>,
    counters: Arc<PlatformCounters>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!("Reaper started (interval: {:?})", interval);

    loop {
        tokio::select! {
            biased;
            // Also fires when the sender is dropped along with the platform.
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        let reclaimed = reap_idle(&registry, &counters, Instant::now());
        if reclaimed > 0 {
            debug!("Reaper reclaimed {} instance(s)", reclaimed);
        }
    }

    debug!("Reaper stopped");
}

/// One scan over the registry. Returns the number of reclaimed instances.
pub(crate) fn reap_idle(
    registry: &FunctionRegistry,
    counters: &PlatformCounters,
    now: Instant,
) -> usize {
    if registry.is_empty() {
        return 0;
    }
    let mut reclaimed = 0;
    registry.for_each(|record| {
        if reclaim_if_idle(record, counters, now) {
            reclaimed += 1;
        }
        true
    });
    reclaimed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::deploy;
    use simfaas_common::FunctionConfig;

    fn config(keep_warm_secs: u64) -> FunctionConfig {
        FunctionConfig::new(
            Duration::ZERO,
            Duration::from_secs(keep_warm_secs),
            Duration::ZERO,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_idle_only_expired_records() {
        let registry = FunctionRegistry::new();
        let counters = PlatformCounters::default();
        registry.define("short", config(1));
        registry.define("long", config(60));
        registry.define("cold", config(1));

        deploy(&registry.get("short").unwrap(), &counters).await;
        deploy(&registry.get("long").unwrap(), &counters).await;
        assert_eq!(counters.active_instances(), 2);

        let reclaimed = reap_idle(&registry, &counters, Instant::now() + Duration::from_secs(2));
        assert_eq!(reclaimed, 1);
        assert!(!registry.get("short").unwrap().is_warm());
        assert!(registry.get("long").unwrap().is_warm());
        assert!(!registry.get("cold").unwrap().is_warm());
        assert_eq!(counters.active_instances(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_reclaims_and_stops() {
        let registry = Arc::new(FunctionRegistry::new());
        let counters = Arc::new(PlatformCounters::default());
        registry.define("fn", config(2));
        deploy(&registry.get("fn").unwrap(), &counters).await;

        let reaper = Reaper::spawn(
            &tokio::runtime::Handle::current(),
            registry.clone(),
            counters.clone(),
            Duration::from_secs(1),
        );

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(registry.get("fn").unwrap().is_warm());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!registry.get("fn").unwrap().is_warm());
        assert_eq!(counters.active_instances(), 0);

        reaper.stop().await;

        // Stopped: a newly idle instance stays warm.
        deploy(&registry.get("fn").unwrap(), &counters).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(registry.get("fn").unwrap().is_warm());
    }
}
