//! Function lifecycle engine of the FaaS simulator.
//!
//! Every execution is a timed suspension; the engine reproduces cold starts,
//! keep-warm retention and concurrent execution accounting without running
//! any workload.

mod counters;
mod deployment;
mod execution;
mod platform;
mod reaper;
pub mod record;
pub mod registry;

pub use counters::PlatformCounters;
pub use platform::{Platform, PlatformConfig, DEFAULT_REAP_INTERVAL};
pub use record::{FunctionRecord, InstanceState, Timestamps};
pub use registry::FunctionRegistry;

// Re-export dependencies potentially needed by consumers (like the facade)
pub use simfaas_common as common;
pub use simfaas_common::{ExecutionReport, FaasError, FunctionConfig, Result};
