use dashmap::DashMap;
use serde::Serialize;
use simfaas_platform::Platform;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

// Metrics tracking
#[derive(Debug, Default)]
pub struct ServerMetrics {
    requests: DashMap<String, AtomicU64>,
    /// Simulated resource usage at the last sample.
    resource_usage: AtomicU64,
    /// Sum of all samples.
    resource_usage_total: AtomicU64,
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub active_executions: u32,
    pub active_instances: u32,
    pub functions: usize,
    pub fn_resource_usage: u64,
    pub fn_resource_usage_total: u64,
    pub requests: BTreeMap<String, u64>,
}

impl ServerMetrics {
    pub fn record_request(&self, path: &str) {
        if let Some(count) = self.requests.get(path) {
            count.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.requests
            .entry(path.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_count(&self, path: &str) -> u64 {
        self.requests
            .get(path)
            .map(|count| count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn record_usage_sample(&self, active_executions: u32) {
        let sample = u64::from(active_executions);
        self.resource_usage.store(sample, Ordering::Relaxed);
        self.resource_usage_total.fetch_add(sample, Ordering::Relaxed);
    }

    pub fn resource_usage(&self) -> u64 {
        self.resource_usage.load(Ordering::Relaxed)
    }

    pub fn resource_usage_total(&self) -> u64 {
        self.resource_usage_total.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, platform: &Platform) -> MetricsSnapshot {
        MetricsSnapshot {
            active_executions: platform.active_executions(),
            active_instances: platform.active_instances(),
            functions: platform.function_count(),
            fn_resource_usage: self.resource_usage(),
            fn_resource_usage_total: self.resource_usage_total(),
            requests: self
                .requests
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

/// Samples the platform's active executions on every tick, publishing them
/// as simulated resource usage.
pub fn spawn_usage_sampler(
    platform: Platform,
    metrics: Arc<ServerMetrics>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            metrics.record_usage_sample(platform.active_executions());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use simfaas_common::FunctionConfig;

    #[test]
    fn test_request_counts() {
        let metrics = ServerMetrics::default();
        metrics.record_request("/v2/tapService");
        metrics.record_request("/v2/tapService");
        metrics.record_request("/");

        assert_eq!(metrics.request_count("/v2/tapService"), 2);
        assert_eq!(metrics.request_count("/"), 1);
        assert_eq!(metrics.request_count("/metrics"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_usage_sampler() {
        let platform = Platform::new();
        platform.define(
            "sleep",
            FunctionConfig::new(Duration::ZERO, Duration::ZERO, Duration::from_millis(2500)),
        );
        let metrics = Arc::new(ServerMetrics::default());
        let sampler = spawn_usage_sampler(platform.clone(), metrics.clone(), Duration::from_secs(1));

        let runs: Vec<_> = (0..2)
            .map(|_| {
                let platform = platform.clone();
                tokio::spawn(async move { platform.run("sleep", None).await })
            })
            .collect();
        for run in runs {
            run.await.unwrap().unwrap();
        }

        // Samples at 1s and 2s saw both executions.
        assert_eq!(metrics.resource_usage(), 2);
        assert_eq!(metrics.resource_usage_total(), 4);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(metrics.resource_usage(), 0);
        assert_eq!(metrics.resource_usage_total(), 4);

        let snapshot = metrics.snapshot(&platform);
        assert_eq!(snapshot.functions, 1);
        assert_eq!(snapshot.active_executions, 0);
        sampler.abort();
    }
}
