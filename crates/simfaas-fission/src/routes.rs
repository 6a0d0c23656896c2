use crate::fission::Fission;
use crate::metrics::{MetricsSnapshot, ServerMetrics};
use crate::types::{runtime_override, ObjectMeta, RunQuery, VersionInfo};
use axum::{
    body::Bytes,
    extract::{MatchedPath, Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use simfaas_common::{ExecutionReport, FaasError};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub const APP_NAME: &str = "simfaas";

#[derive(Clone)]
pub struct AppState {
    pub fission: Fission,
    pub metrics: Arc<ServerMetrics>,
    pub build_time: String,
}

impl AppState {
    pub fn new(fission: Fission, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            fission,
            metrics,
            build_time: option_env!("SIMFAAS_BUILD_TIME").unwrap_or_default().to_string(),
        }
    }
}

/// Plain-text error response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl From<FaasError> for ApiError {
    fn from(err: FaasError) -> Self {
        let status = match &err {
            FaasError::FunctionNotFound(_) => StatusCode::NOT_FOUND,
            FaasError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Application info
        .route("/", get(version_handler))

        // Mocked Fission control plane
        .route("/v2/functions/*name", get(functions_get_handler))
        .route("/v2/tapService", post(tap_service_handler))
        .route("/v2/getServiceForFunction", post(get_service_for_function_handler))

        // Function execution
        .route("/fission-function/*path", any(function_run_handler))

        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), count_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn count_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(path) = request.extensions().get::<MatchedPath>() {
        state.metrics.record_request(path.as_str());
    }
    next.run(request).await
}

async fn version_handler(State(state): State<AppState>) -> Json<VersionInfo> {
    Json(VersionInfo {
        name: APP_NAME.to_string(),
        build_time: state.build_time.clone(),
    })
}

// Function lookups always succeed with an empty object.
async fn functions_get_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({}))
}

async fn tap_service_handler(
    State(state): State<AppState>,
    body: String,
) -> Result<StatusCode, ApiError> {
    let svc_url = body.trim();
    if let Err(e) = state.fission.tap_service(svc_url) {
        warn!("{}: failed to prewarm: {}", svc_url, e);
        return Err(ApiError {
            status: StatusCode::BAD_REQUEST,
            message: "failed to parse service to tap".to_string(),
        });
    }
    info!("{}: prewarmed instance", svc_url);
    Ok(StatusCode::OK)
}

async fn get_service_for_function_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<String, ApiError> {
    let meta: ObjectMeta = serde_json::from_slice(&body).map_err(|_| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: "failed to parse function metadata".to_string(),
    })?;
    Ok(state.fission.get_service_for_function(&meta.name)?)
}

async fn function_run_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<RunQuery>,
    body: Bytes,
) -> Result<Json<ExecutionReport>, ApiError> {
    let fn_name = path.rsplit('/').next().unwrap_or_default();
    if fn_name.is_empty() {
        return Err(FaasError::InvalidRequest("no function name in path".to_string()).into());
    }
    let runtime = runtime_override(query.runtime.as_deref(), &body)?;

    let report = state.fission.run(fn_name, runtime).await?;
    Ok(Json(report))
}

async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot(state.fission.platform()))
}
