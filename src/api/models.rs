//! API request and response models (hosted-endpoint wire format)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Inference request as delivered by the hosting platform
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct InferenceRequest {
    /// The prompt to generate an image from
    #[serde(default)]
    pub inputs: String,

    /// Generation options; every key is optional and unrecognized keys
    /// are ignored
    #[serde(default)]
    pub parameters: GenerationParameters,
}

/// Recognized generation options with their defaults
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct GenerationParameters {
    /// LoRA weights to apply: a URL or a repository id. Absent means
    /// "no LoRA".
    #[serde(default, alias = "lora_identifier")]
    pub lora_url: Option<String>,

    /// Strength applied to LoRA weights during generation
    #[serde(default = "default_lora_scale")]
    pub lora_scale: f32,

    /// Number of inference steps
    #[serde(default = "default_num_inference_steps")]
    pub num_inference_steps: u32,

    /// Guidance / CFG scale
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f32,

    /// Things to avoid in the image
    #[serde(default)]
    pub negative_prompt: String,

    /// Image width in pixels
    #[serde(default = "default_dimension")]
    pub width: u32,

    /// Image height in pixels
    #[serde(default = "default_dimension")]
    pub height: u32,

    /// Seed for reproducibility; absent or -1 means unseeded
    #[serde(default)]
    pub seed: Option<i64>,
}

fn default_lora_scale() -> f32 {
    0.8
}

fn default_num_inference_steps() -> u32 {
    28
}

fn default_guidance_scale() -> f32 {
    5.0
}

fn default_dimension() -> u32 {
    1024
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            lora_url: None,
            lora_scale: default_lora_scale(),
            num_inference_steps: default_num_inference_steps(),
            guidance_scale: default_guidance_scale(),
            negative_prompt: String::new(),
            width: default_dimension(),
            height: default_dimension(),
            seed: None,
        }
    }
}

impl GenerationParameters {
    /// Normalize the seed: absent or the -1 sentinel means unseeded
    pub fn effective_seed(&self) -> Option<i64> {
        self.seed.filter(|&seed| seed != -1)
    }
}

/// Health check response
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: String,
    pub device: String,
}

/// Request counters reported by the info endpoint
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RequestStats {
    pub received: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Endpoint introspection response
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct EndpointInfo {
    pub model: String,
    pub device: String,
    /// Reference of the currently applied LoRA weights, if any
    pub active_lora: Option<String>,
    pub engine_healthy: bool,
    pub started_at: DateTime<Utc>,
    pub requests: RequestStats,
}
