//! HTTP route definitions

use crate::api::handlers;
use crate::api::models::*;
use crate::middleware::auth::require_api_key;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "SDXL LoRA Serving API",
        description = "Text-to-image inference endpoint with per-request dynamic LoRA loading",
        license(name = "MIT"),
    ),
    paths(
        handlers::invoke,
        handlers::health_check,
        handlers::endpoint_info,
    ),
    components(schemas(
        InferenceRequest,
        GenerationParameters,
        HealthResponse,
        EndpointInfo,
        RequestStats,
    )),
    tags(
        (name = "Inference", description = "Image generation"),
        (name = "Health", description = "Health and introspection"),
    )
)]
pub struct ApiDoc;

/// Create the main application router
pub fn create_router(state: Arc<crate::AppState>) -> Router {
    // The invocation route carries the optional API-key check; health and
    // introspection stay open for the platform's probes.
    let invoke_route = Router::new().route("/", post(handlers::invoke));

    let invoke_route = if state.settings.auth.enabled {
        invoke_route.layer(from_fn_with_state(state.clone(), require_api_key))
    } else {
        invoke_route
    };

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/info", get(handlers::endpoint_info))
        .route("/metrics", get(handlers::metrics))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(invoke_route)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
