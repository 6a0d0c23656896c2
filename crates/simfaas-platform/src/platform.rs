use crate::counters::PlatformCounters;
use crate::deployment;
use crate::execution;
use crate::reaper::Reaper;
use crate::record::FunctionRecord;
use crate::registry::FunctionRegistry;
use chrono::Utc;
use simfaas_common::{ExecutionReport, FaasError, FunctionConfig, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, instrument};

pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// How often the reaper scans for idle warm instances.
    pub reap_interval: Duration,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            reap_interval: DEFAULT_REAP_INTERVAL,
        }
    }
}

enum Lifecycle {
    Created,
    Running(Reaper),
    Closed,
}

struct PlatformInner {
    registry: Arc<FunctionRegistry>,
    counters: Arc<PlatformCounters>,
    config: PlatformConfig,
    lifecycle: Mutex<Lifecycle>,
}

/// Simulated FaaS platform: function registry, single-instance deployments
/// with cold starts, and a reaper for idle instances.
#[derive(Clone)]
pub struct Platform {
    inner: Arc<PlatformInner>,
}

impl Default for Platform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform {
    pub fn new() -> Self {
        Self::with_config(PlatformConfig::default())
    }

    pub fn with_config(config: PlatformConfig) -> Self {
        Self {
            inner: Arc::new(PlatformInner {
                registry: Arc::new(FunctionRegistry::new()),
                counters: Arc::new(PlatformCounters::default()),
                config,
                lifecycle: Mutex::new(Lifecycle::Created),
            }),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts the reaper. Only the first call has an effect; calls on a
    /// running or closed platform are no-ops.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle();
        if !matches!(*lifecycle, Lifecycle::Created) {
            debug!("Platform already started, ignoring start");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| FaasError::Runtime(format!("cannot start reaper: {e}")))?;
        *lifecycle = Lifecycle::Running(Reaper::spawn(
            &runtime,
            self.inner.registry.clone(),
            self.inner.counters.clone(),
            self.inner.config.reap_interval,
        ));
        info!(
            "Platform started (reap interval: {:?})",
            self.inner.config.reap_interval
        );
        Ok(())
    }

    /// Stops the reaper. In-flight `run`/`deploy` calls are not interrupted.
    pub async fn close(&self) -> Result<()> {
        let previous = std::mem::replace(&mut *self.lifecycle(), Lifecycle::Closed);
        if let Lifecycle::Running(reaper) = previous {
            reaper.stop().await;
            info!("Platform closed");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle(), Lifecycle::Running(_))
    }

    pub fn define(&self, name: &str, config: FunctionConfig) {
        self.inner.registry.define(name, config);
    }

    pub fn get(&self, name: &str) -> Option<Arc<FunctionRecord>> {
        self.inner.registry.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.inner.registry.contains(name)
    }

    pub fn function_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Visits every function until `visitor` returns false. No snapshot
    /// isolation: records may change while being visited.
    pub fn range_functions<F>(&self, visitor: F)
    where
        F: FnMut(&Arc<FunctionRecord>) -> bool,
    {
        self.inner.registry.for_each(visitor);
    }

    pub fn active_executions(&self) -> u32 {
        self.inner.counters.active_executions()
    }

    pub fn active_instances(&self) -> u32 {
        self.inner.counters.active_instances()
    }

    fn lookup(&self, name: &str) -> Result<Arc<FunctionRecord>> {
        self.get(name)
            .ok_or_else(|| FaasError::FunctionNotFound(name.to_string()))
    }

    /// Explicitly prewarms a function, returning the cold-start latency
    /// paid by this call.
    #[instrument(skip(self))]
    pub async fn deploy(&self, name: &str) -> Result<Duration> {
        let record = self.lookup(name)?;
        Ok(deployment::deploy(&record, &self.inner.counters).await)
    }

    /// Prewarms a function without waiting for the cold start to finish.
    pub fn deploy_in_background(&self, name: &str) -> Result<()> {
        let record = self.lookup(name)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| FaasError::Runtime(format!("cannot prewarm {name}: {e}")))?;
        let counters = self.inner.counters.clone();
        runtime.spawn(async move {
            let cold_start = deployment::deploy(&record, &counters).await;
            debug!("{}: prewarmed (cold start: {:?})", record.name(), cold_start);
        });
        Ok(())
    }

    /// Simulates one invocation, deploying the instance first if it is cold.
    ///
    /// `runtime_override` replaces the function's configured runtime.
    #[instrument(skip(self))]
    pub async fn run(
        &self,
        name: &str,
        runtime_override: Option<Duration>,
    ) -> Result<ExecutionReport> {
        let started_at = Utc::now();
        let record = self.lookup(name)?;

        let cold_start = if record.is_warm() {
            Duration::ZERO
        } else {
            deployment::deploy(&record, &self.inner.counters).await
        };

        let runtime = runtime_override.unwrap_or_else(|| record.config().runtime);
        let runtime = execution::execute(&record, &self.inner.counters, runtime).await;
        let finished_at = Utc::now();

        let report = ExecutionReport {
            started_at,
            finished_at,
            cold_start,
            runtime,
        };
        debug!(
            "{}: executed on {} instance ({})",
            name,
            if report.was_cold() { "cold" } else { "warm" },
            report
        );
        Ok(report)
    }
}
