//! API key authentication middleware
//!
//! Only layered onto the invocation route, and only when authentication is
//! enabled in the settings (the hosting platform usually terminates auth
//! before requests reach this process).

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::warn;

use crate::error::{ErrorDetail, ErrorResponse};
use crate::AppState;

/// Reject requests that do not carry a configured API key
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let api_key = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.strip_prefix("Bearer ").unwrap_or(h).to_string());

    match api_key {
        Some(key) if state.settings.auth.api_keys.contains(&key) => next.run(request).await,
        Some(_) => {
            warn!("Invalid API key provided");
            unauthorized("Invalid API key")
        }
        None => {
            warn!("No API key provided");
            unauthorized("API key required. Provide via Authorization header: 'Bearer YOUR_API_KEY'")
        }
    }
}

fn unauthorized(message: &str) -> Response {
    let body = Json(ErrorResponse {
        error: ErrorDetail {
            message: message.to_string(),
            r#type: "authentication_error".to_string(),
            code: Some("invalid_api_key".to_string()),
        },
    });

    (StatusCode::UNAUTHORIZED, body).into_response()
}
