//! Emulation of the parts of the Fission control plane a workflow engine
//! talks to, backed by the simulated platform.

use simfaas_common::{ExecutionReport, FaasError, FunctionConfig, Result};
use simfaas_platform::Platform;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Builds the configuration of functions created on first use.
pub type FnFactory = Arc<dyn Fn(&str) -> FunctionConfig + Send + Sync>;

#[derive(Clone)]
pub struct Fission {
    platform: Platform,
    fn_factory: FnFactory,
    /// Automatically define functions that are called before being defined.
    create_undefined_functions: bool,
}

impl Fission {
    pub fn new(platform: Platform, fn_factory: FnFactory) -> Self {
        Self {
            platform,
            fn_factory,
            create_undefined_functions: true,
        }
    }

    /// Every function gets the same timing configuration.
    pub fn with_function_config(platform: Platform, config: FunctionConfig) -> Self {
        Self::new(platform, Arc::new(move |_: &str| config))
    }

    pub fn create_undefined_functions(mut self, enabled: bool) -> Self {
        self.create_undefined_functions = enabled;
        self
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn start(&self) -> Result<()> {
        self.platform.start()
    }

    pub async fn close(&self) -> Result<()> {
        self.platform.close().await
    }

    fn create_if_undefined(&self, fn_name: &str) {
        if self.create_undefined_functions && !self.platform.is_defined(fn_name) {
            let config = (self.fn_factory)(fn_name);
            self.platform.define(fn_name, config);
            info!("Created new function {} with config: {:?}", fn_name, config);
        }
    }

    /// Maps a function to its service name, which is the function name
    /// itself.
    pub fn get_service_for_function(&self, fn_name: &str) -> Result<String> {
        self.create_if_undefined(fn_name);
        self.platform
            .get(fn_name)
            .map(|record| record.name().to_string())
            .ok_or_else(|| FaasError::FunctionNotFound(fn_name.to_string()))
    }

    /// Prewarms the function behind a service URL. The cold start happens in
    /// the background; this returns as soon as it is scheduled.
    pub fn tap_service(&self, svc_url: &str) -> Result<()> {
        if svc_url.is_empty() {
            return Err(FaasError::InvalidRequest("no url provided to tap".to_string()));
        }
        let fn_name = svc_to_fn(svc_url);
        self.create_if_undefined(&fn_name);
        self.platform.deploy_in_background(&fn_name)
    }

    /// Runs a function; `runtime` overrides its configured runtime.
    pub async fn run(&self, fn_name: &str, runtime: Option<Duration>) -> Result<ExecutionReport> {
        self.create_if_undefined(fn_name);
        self.platform.run(fn_name, runtime).await
    }
}

/// Service URLs point at the function by host name. Anything that is not
/// an absolute URL with a host is taken as the function name verbatim.
pub fn svc_to_fn(svc: &str) -> String {
    url::Url::parse(svc)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| svc.to_string())
}
