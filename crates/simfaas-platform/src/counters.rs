use std::sync::atomic::{AtomicU32, Ordering};

/// Platform-wide aggregates, updated alongside the per-record state.
#[derive(Debug, Default)]
pub struct PlatformCounters {
    active_instances: AtomicU32,
    active_executions: AtomicU32,
}

impl PlatformCounters {
    pub fn active_instances(&self) -> u32 {
        self.active_instances.load(Ordering::Acquire)
    }

    pub fn active_executions(&self) -> u32 {
        self.active_executions.load(Ordering::Acquire)
    }

    pub(crate) fn instance_deployed(&self) {
        self.active_instances.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn instance_reclaimed(&self) {
        self.active_instances.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn execution_started(&self) {
        self.active_executions.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn execution_finished(&self) {
        self.active_executions.fetch_sub(1, Ordering::AcqRel);
    }
}
