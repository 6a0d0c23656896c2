pub mod config;
pub mod fission;
pub mod metrics;
pub mod routes;
pub mod types;

pub use config::Cli;
pub use fission::{FnFactory, Fission};
pub use metrics::{spawn_usage_sampler, ServerMetrics};
pub use routes::{create_app, ApiError, AppState};

/// Function defined at startup; Fission's sleep workflow calls it.
pub const DEFAULT_FUNCTION: &str = "sleep";
