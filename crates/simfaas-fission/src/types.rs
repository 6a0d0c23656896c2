use serde::{Deserialize, Serialize};
use simfaas_common::{FaasError, Result};
use std::time::Duration;

/// Function metadata posted to `/v2/getServiceForFunction`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// Optional body of a function call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepPayload {
    /// In seconds (e.g. 1.043)
    pub runtime: f64,
}

/// Query parameters of a function call.
#[derive(Debug, Default, Deserialize)]
pub struct RunQuery {
    pub runtime: Option<String>,
}

/// Application info served at `/`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionInfo {
    pub name: String,
    pub build_time: String,
}

pub fn seconds_to_duration(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| FaasError::InvalidRequest(format!("invalid runtime {seconds}: {e}")))
}

/// Resolves the runtime override of a function call: the `runtime` query
/// parameter wins, then a JSON body. Without either the function's own
/// runtime applies.
pub fn runtime_override(query: Option<&str>, body: &[u8]) -> Result<Option<Duration>> {
    if let Some(raw) = query.filter(|raw| !raw.is_empty()) {
        let seconds: f64 = raw
            .parse()
            .map_err(|e| FaasError::InvalidRequest(format!("invalid runtime {raw:?}: {e}")))?;
        return seconds_to_duration(seconds).map(Some);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let payload: SleepPayload = serde_json::from_slice(body)
        .map_err(|e| FaasError::InvalidRequest(format!("invalid payload: {e}")))?;
    seconds_to_duration(payload.runtime).map(Some)
}
