//! Engine adapter tests against a mock worker

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sdxl_lora_serving::config::{EngineConfig, ModelConfig};
use sdxl_lora_serving::pipeline::{DiffusionPipeline, EnginePipeline, GenerationOptions};
use sdxl_lora_serving::response::png;

fn engine_config(server: &MockServer) -> EngineConfig {
    EngineConfig {
        endpoint: server.uri(),
        timeout_ms: 5000,
        health_check_path: "/health".to_string(),
    }
}

fn options() -> GenerationOptions {
    GenerationOptions {
        prompt: "a cat".to_string(),
        negative_prompt: String::new(),
        num_inference_steps: 28,
        guidance_scale: 5.0,
        width: 1024,
        height: 1024,
        seed: None,
        lora_scale: None,
    }
}

async fn mount_setup(server: &MockServer, device: &str) {
    Mock::given(method("POST"))
        .and(path("/setup"))
        .and(body_partial_json(json!({ "device": device })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_id": "stabilityai/stable-diffusion-xl-base-1.0",
            "device": device,
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_connect_uses_preferred_device() {
    let server = MockServer::start().await;
    mount_setup(&server, "cuda").await;

    let pipeline = EnginePipeline::connect(&engine_config(&server), &ModelConfig::default())
        .await
        .unwrap();

    assert_eq!(pipeline.device(), "cuda");
    assert_eq!(
        pipeline.model_id(),
        "stabilityai/stable-diffusion-xl-base-1.0"
    );
}

#[tokio::test]
async fn test_connect_falls_back_to_slower_device() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/setup"))
        .and(body_partial_json(json!({ "device": "cuda" })))
        .respond_with(ResponseTemplate::new(503).set_body_string("no gpu available"))
        .mount(&server)
        .await;
    mount_setup(&server, "cpu").await;

    let pipeline = EnginePipeline::connect(&engine_config(&server), &ModelConfig::default())
        .await
        .unwrap();

    assert_eq!(pipeline.device(), "cpu");
}

#[tokio::test]
async fn test_connect_fails_when_no_device_available() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/setup"))
        .respond_with(ResponseTemplate::new(503).set_body_string("engine still warming up"))
        .mount(&server)
        .await;

    let result = EnginePipeline::connect(&engine_config(&server), &ModelConfig::default()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_generate_decodes_engine_payload() {
    let server = MockServer::start().await;
    mount_setup(&server, "cuda").await;

    let reference_image =
        image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(4, 4, image::Rgb([1, 2, 3])));
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "image": png::encode_png(&reference_image).unwrap(),
        })))
        .mount(&server)
        .await;

    let pipeline = EnginePipeline::connect(&engine_config(&server), &ModelConfig::default())
        .await
        .unwrap();
    let image = pipeline.generate(&options()).await.unwrap();

    assert_eq!(image.width(), 4);
    assert_eq!(image.height(), 4);
}

#[tokio::test]
async fn test_generate_surfaces_engine_errors() {
    let server = MockServer::start().await;
    mount_setup(&server, "cuda").await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("CUDA out of memory"))
        .mount(&server)
        .await;

    let pipeline = EnginePipeline::connect(&engine_config(&server), &ModelConfig::default())
        .await
        .unwrap();
    let error = pipeline.generate(&options()).await.unwrap_err();

    assert!(error.to_string().contains("CUDA out of memory"));
}

#[tokio::test]
async fn test_lora_load_and_unload_round_trip() {
    let server = MockServer::start().await;
    mount_setup(&server, "cuda").await;
    Mock::given(method("POST"))
        .and(path("/lora/load"))
        .and(body_partial_json(json!({ "reference": "some/repo" })))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/lora/unload"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut pipeline = EnginePipeline::connect(&engine_config(&server), &ModelConfig::default())
        .await
        .unwrap();

    pipeline.load_lora_weights("some/repo").await.unwrap();
    pipeline.unload_lora_weights().await.unwrap();
}

#[tokio::test]
async fn test_lora_load_failure_is_an_error() {
    let server = MockServer::start().await;
    mount_setup(&server, "cuda").await;
    Mock::given(method("POST"))
        .and(path("/lora/load"))
        .respond_with(ResponseTemplate::new(404).set_body_string("unknown repository"))
        .mount(&server)
        .await;

    let mut pipeline = EnginePipeline::connect(&engine_config(&server), &ModelConfig::default())
        .await
        .unwrap();

    assert!(pipeline.load_lora_weights("missing/repo").await.is_err());
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    mount_setup(&server, "cuda").await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let pipeline = EnginePipeline::connect(&engine_config(&server), &ModelConfig::default())
        .await
        .unwrap();

    assert!(pipeline.health_check().await);
}
