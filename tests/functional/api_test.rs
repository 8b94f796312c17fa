//! Full-router tests over the HTTP surface

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use image::{DynamicImage, RgbImage};
use std::sync::Arc;
use tower::ServiceExt;

use sdxl_lora_serving::api::routes::create_router;
use sdxl_lora_serving::config::Settings;
use sdxl_lora_serving::error::Result;
use sdxl_lora_serving::handler::EndpointHandler;
use sdxl_lora_serving::pipeline::{DiffusionPipeline, GenerationOptions};
use sdxl_lora_serving::response::png;
use sdxl_lora_serving::AppState;

struct StubPipeline;

#[async_trait]
impl DiffusionPipeline for StubPipeline {
    fn model_id(&self) -> &str {
        "stub/base-model"
    }

    fn device(&self) -> &str {
        "cpu"
    }

    async fn load_lora_weights(&mut self, _reference: &str) -> Result<()> {
        Ok(())
    }

    async fn unload_lora_weights(&mut self) -> Result<()> {
        Ok(())
    }

    async fn generate(&self, _options: &GenerationOptions) -> Result<DynamicImage> {
        Ok(DynamicImage::ImageRgb8(RgbImage::new(8, 8)))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

fn test_router(settings: Settings) -> axum::Router {
    let handler = EndpointHandler::new(Box::new(StubPipeline));
    create_router(Arc::new(AppState::new(settings, handler)))
}

fn invoke_request(body: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_invoke_returns_base64_png() {
    let app = test_router(Settings::default());

    let response = app
        .oneshot(invoke_request(
            r#"{"inputs": "a cat", "parameters": {"seed": 42}}"#,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let encoded = body_string(response).await;
    let bytes = png::decode(&encoded).unwrap();
    let image = image::load_from_memory(&bytes).unwrap();
    assert_eq!(image.width(), 8);
}

#[tokio::test]
async fn test_invoke_rejects_malformed_json() {
    let app = test_router(Settings::default());

    let response = app
        .oneshot(invoke_request("{not json", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_router(Settings::default());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "stub/base-model");
    assert_eq!(body["device"], "cpu");
}

#[tokio::test]
async fn test_info_reports_lora_slot() {
    let app = test_router(Settings::default());

    app.clone()
        .oneshot(invoke_request(
            r#"{"inputs": "a cat", "parameters": {"lora_url": "some/repo"}}"#,
            None,
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::get("/info").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["active_lora"], "some/repo");
    assert_eq!(body["engine_healthy"], true);
    assert_eq!(body["requests"]["completed"], 1);
}

#[tokio::test]
async fn test_metrics_counts_requests() {
    let app = test_router(Settings::default());

    app.clone()
        .oneshot(invoke_request(r#"{"inputs": "a cat"}"#, None))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = body_string(response).await;
    assert!(body.contains("endpoint_requests_received_total 1"));
    assert!(body.contains("endpoint_requests_completed_total 1"));
}

#[tokio::test]
async fn test_auth_guards_the_invoke_route() {
    let mut settings = Settings::default();
    settings.auth.enabled = true;
    settings.auth.api_keys = vec!["secret-key".to_string()];
    let app = test_router(settings);

    let denied = app
        .clone()
        .oneshot(invoke_request(r#"{"inputs": "a cat"}"#, None))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let allowed = app
        .clone()
        .oneshot(invoke_request(r#"{"inputs": "a cat"}"#, Some("secret-key")))
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);

    // Health stays open for platform probes
    let health = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}
