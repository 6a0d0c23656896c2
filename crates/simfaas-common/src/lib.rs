// Re-export dependencies used in public interfaces of common types

use std::fmt::Display;
use std::time::Duration;

use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaasError {
    #[error("function does not exist: {0}")]
    FunctionNotFound(String),

    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Runtime Error: {0}")]
    Runtime(String),
}

// Define the primary Result type for simulator operations
pub type Result<T> = std::result::Result<T, FaasError>;

/// Timing parameters of a simulated function, fixed at definition time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfig {
    /// Latency paid once per cold transition before the instance is warm.
    #[serde(with = "duration_nanos")]
    pub cold_start: Duration,
    /// How long an idle instance is retained after its last deploy or execution.
    #[serde(with = "duration_nanos")]
    pub keep_warm: Duration,
    /// Nominal runtime, used when a call does not override it.
    #[serde(with = "duration_nanos")]
    pub runtime: Duration,
}

impl FunctionConfig {
    pub fn new(cold_start: Duration, keep_warm: Duration, runtime: Duration) -> Self {
        Self {
            cold_start,
            keep_warm,
            runtime,
        }
    }
}

/// Result of one simulated invocation.
///
/// The serialized form is consumed by benchmarking clients and must keep its
/// field names and units: `started_at`/`finished_at` are UNIX epoch
/// nanoseconds, `coldStart`/`runtime` are durations in nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    #[serde(with = "chrono::serde::ts_nanoseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_nanoseconds")]
    pub finished_at: DateTime<Utc>,
    #[serde(rename = "coldStart", with = "duration_nanos")]
    pub cold_start: Duration,
    #[serde(with = "duration_nanos")]
    pub runtime: Duration,
}

impl ExecutionReport {
    pub fn was_cold(&self) -> bool {
        !self.cold_start.is_zero()
    }
}

impl Display for ExecutionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ExecutionReport(started_at: {}, finished_at: {}, cold_start: {:?}, runtime: {:?})",
            self.started_at.to_rfc3339(),
            self.finished_at.to_rfc3339(),
            self.cold_start,
            self.runtime
        )
    }
}

/// Serde adapter encoding a `Duration` as an integer count of nanoseconds.
pub mod duration_nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_nanos)
    }
}
