//! HTTP request handlers

use crate::api::models::{EndpointInfo, HealthResponse, InferenceRequest};
use crate::error::AppError;
use crate::AppState;
use axum::extract::{Json, State};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Serve one inference request.
///
/// The response body is the bare base64-encoded PNG; the hosting platform
/// wraps it in its own envelope.
#[utoipa::path(
    post,
    path = "/",
    tag = "Inference",
    request_body = InferenceRequest,
    responses(
        (status = 200, description = "Base64-encoded PNG image", body = String),
        (status = 400, description = "Malformed request"),
        (status = 502, description = "Generation failed")
    )
)]
pub async fn invoke(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InferenceRequest>,
) -> Result<String, AppError> {
    let request_id = Uuid::new_v4();
    let prompt_preview: String = request.inputs.chars().take(100).collect();

    info!(
        %request_id,
        prompt = %prompt_preview,
        lora = ?request.parameters.lora_url,
        steps = request.parameters.num_inference_steps,
        guidance = request.parameters.guidance_scale,
        width = request.parameters.width,
        height = request.parameters.height,
        "Received inference request"
    );

    state.metrics.record_received();

    let mut handler = state.handler.lock().await;
    match handler.handle(request).await {
        Ok(encoded) => {
            state.metrics.record_completed();
            info!(%request_id, bytes = encoded.len(), "Returning image");
            Ok(encoded)
        }
        Err(e) => {
            state.metrics.record_failed();
            Err(e)
        }
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.model.clone(),
        device: state.device.clone(),
    })
}

/// Endpoint introspection: model, device, LoRA slot, counters.
///
/// Waits for any in-flight generation before probing the engine.
#[utoipa::path(
    get,
    path = "/info",
    tag = "Health",
    responses((status = 200, description = "Endpoint state", body = EndpointInfo))
)]
pub async fn endpoint_info(State(state): State<Arc<AppState>>) -> Json<EndpointInfo> {
    let handler = state.handler.lock().await;
    let engine_healthy = handler.pipeline_healthy().await;

    Json(EndpointInfo {
        model: state.model.clone(),
        device: state.device.clone(),
        active_lora: handler.active_lora().map(String::from),
        engine_healthy,
        started_at: state.started_at,
        requests: state.metrics.snapshot(),
    })
}

/// Metrics endpoint (Prometheus text format)
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    let stats = state.metrics.snapshot();

    format!(
        "# HELP endpoint_requests_received_total Inference requests received\n\
         # TYPE endpoint_requests_received_total counter\n\
         endpoint_requests_received_total {}\n\
         # HELP endpoint_requests_completed_total Inference requests completed\n\
         # TYPE endpoint_requests_completed_total counter\n\
         endpoint_requests_completed_total {}\n\
         # HELP endpoint_requests_failed_total Inference requests failed\n\
         # TYPE endpoint_requests_failed_total counter\n\
         endpoint_requests_failed_total {}\n",
        stats.received, stats.completed, stats.failed
    )
}
