//! Per-function state container.

use simfaas_common::FunctionConfig;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

/// Deployment state of the single instance a function may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InstanceState {
    Undeployed = 0,
    Warm = 1,
}

impl InstanceState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => InstanceState::Undeployed,
            _ => InstanceState::Warm,
        }
    }
}

/// Timestamps that are read and written together under the record lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timestamps {
    /// Last 0 -> 1 transition.
    pub deployed_at: Option<Instant>,
    /// Last completed execution.
    pub last_executed_at: Option<Instant>,
}

impl Timestamps {
    /// True when neither the deployment nor the last execution happened
    /// within `keep_warm` of `now`. A keep-warm past the clock's range never
    /// expires.
    pub fn idle_past(&self, keep_warm: Duration, now: Instant) -> bool {
        let expired = |at: Option<Instant>| {
            at.map_or(true, |at| {
                at.checked_add(keep_warm)
                    .map_or(false, |expiry| expiry < now)
            })
        };
        expired(self.deployed_at) && expired(self.last_executed_at)
    }
}

#[derive(Debug)]
pub struct FunctionRecord {
    name: String,
    config: RwLock<FunctionConfig>,
    state: AtomicU8,
    active: AtomicU32,
    timestamps: Mutex<Timestamps>,
}

impl FunctionRecord {
    pub fn new(name: impl Into<String>, config: FunctionConfig) -> Self {
        Self {
            name: name.into(),
            config: RwLock::new(config),
            state: AtomicU8::new(InstanceState::Undeployed as u8),
            active: AtomicU32::new(0),
            timestamps: Mutex::new(Timestamps::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> FunctionConfig {
        *self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrites the configuration; instance and execution state are kept.
    pub(crate) fn replace_config(&self, config: FunctionConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Lock-free read, may be momentarily stale.
    pub fn instance_state(&self) -> InstanceState {
        InstanceState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_warm(&self) -> bool {
        self.instance_state() == InstanceState::Warm
    }

    // Only called while holding the timestamps lock.
    pub(crate) fn set_instance_state(&self, state: InstanceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn active_executions(&self) -> u32 {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn execution_started(&self) {
        self.active.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn execution_finished(&self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Timestamps> {
        self.timestamps.lock().await
    }

    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, Timestamps>> {
        self.timestamps.try_lock().ok()
    }

    pub async fn timestamps(&self) -> Timestamps {
        *self.timestamps.lock().await
    }

    pub async fn deployed_at(&self) -> Option<Instant> {
        self.timestamps().await.deployed_at
    }

    pub async fn last_executed_at(&self) -> Option<Instant> {
        self.timestamps().await.last_executed_at
    }

    pub(crate) async fn mark_executed(&self, at: Instant) {
        self.lock().await.last_executed_at = Some(at);
    }
}
