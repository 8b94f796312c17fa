//! HTTP adapter for the diffusion engine worker
//!
//! The engine process owns the actual model: weight loading, LoRA
//! resolution, sampling, and tensor placement. This adapter speaks its
//! small HTTP protocol and hands decoded images back to the handler.

use async_trait::async_trait;
use image::DynamicImage;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, ModelConfig};
use crate::error::{AppError, Result};
use crate::pipeline::traits::{DiffusionPipeline, GenerationOptions};
use crate::response::png;

/// Production pipeline backed by a colocated diffusion engine worker
pub struct EnginePipeline {
    client: Client,
    base_url: String,
    health_check_path: String,
    model_id: String,
    device: String,
}

#[derive(Debug, Serialize)]
struct SetupRequest<'a> {
    model_id: &'a str,
    device: &'a str,
    dtype: &'a str,
    attention_slicing: bool,
}

#[derive(Debug, Deserialize)]
struct SetupResponse {
    model_id: String,
    device: String,
}

#[derive(Debug, Serialize)]
struct LoraLoadRequest<'a> {
    reference: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiGenerateRequest<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    num_inference_steps: u32,
    guidance_scale: f32,
    width: u32,
    height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lora_scale: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiGenerateResponse {
    /// Base64-encoded PNG, optionally in data-URL form
    image: String,
}

impl EnginePipeline {
    /// Connect to the engine worker and perform one-time initialization:
    /// install the base model, pick a compute device, and enable the
    /// configured memory optimizations.
    ///
    /// The preferred device is tried first; if the engine rejects it the
    /// setup is retried on the fallback device.
    pub async fn connect(engine: &EngineConfig, model: &ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(engine.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create engine client: {}", e)))?;

        let base_url = engine.endpoint.trim_end_matches('/').to_string();

        let setup = match Self::setup(&client, &base_url, model, &model.preferred_device).await {
            Ok(setup) => {
                info!(device = %setup.device, model = %setup.model_id, "Base model loaded");
                setup
            }
            Err(e) => {
                warn!(
                    device = %model.preferred_device,
                    fallback = %model.fallback_device,
                    error = %e,
                    "Preferred device unavailable, falling back"
                );
                let setup =
                    Self::setup(&client, &base_url, model, &model.fallback_device).await?;
                info!(
                    device = %setup.device,
                    model = %setup.model_id,
                    "Base model loaded on fallback device"
                );
                setup
            }
        };

        Ok(Self {
            client,
            base_url,
            health_check_path: engine.health_check_path.clone(),
            model_id: setup.model_id,
            device: setup.device,
        })
    }

    async fn setup(
        client: &Client,
        base_url: &str,
        model: &ModelConfig,
        device: &str,
    ) -> Result<SetupResponse> {
        let request = SetupRequest {
            model_id: &model.base_model,
            device,
            dtype: &model.dtype,
            attention_slicing: model.attention_slicing,
        };

        let response = client
            .post(format!("{}/setup", base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EngineUnavailable(format!(
                "Engine setup on device '{}' returned {}: {}",
                device, status, body
            )));
        }

        Ok(response.json::<SetupResponse>().await?)
    }
}

#[async_trait]
impl DiffusionPipeline for EnginePipeline {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn device(&self) -> &str {
        &self.device
    }

    async fn load_lora_weights(&mut self, reference: &str) -> Result<()> {
        debug!(reference = %reference, "Requesting LoRA load");

        let response = self
            .client
            .post(format!("{}/lora/load", self.base_url))
            .json(&LoraLoadRequest { reference })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "LoRA load for '{}' returned {}: {}",
                reference, status, body
            )));
        }

        Ok(())
    }

    async fn unload_lora_weights(&mut self) -> Result<()> {
        debug!("Requesting LoRA unload");

        let response = self
            .client
            .post(format!("{}/lora/unload", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "LoRA unload returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn generate(&self, options: &GenerationOptions) -> Result<DynamicImage> {
        let request = ApiGenerateRequest {
            prompt: &options.prompt,
            negative_prompt: &options.negative_prompt,
            num_inference_steps: options.num_inference_steps,
            guidance_scale: options.guidance_scale,
            width: options.width,
            height: options.height,
            seed: options.seed,
            lora_scale: options.lora_scale,
        };

        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "Engine returned {}: {}",
                status, body
            )));
        }

        let payload = response.json::<ApiGenerateResponse>().await?;
        let bytes = png::decode(&payload.image)?;
        let image = image::load_from_memory(&bytes)?;

        Ok(image)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}{}", self.base_url, self.health_check_path);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Engine health check failed");
                false
            }
        }
    }
}
