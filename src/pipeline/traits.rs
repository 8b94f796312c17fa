//! Common traits and types for the generation pipeline

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Parameters for a single generation call, fully resolved.
///
/// `lora_scale` is present only when LoRA weights are actually applied to
/// the pipeline; `seed` is present only for seeded (reproducible) requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// The prompt to generate an image from
    pub prompt: String,

    /// Things to avoid in the image
    pub negative_prompt: String,

    /// Number of iterative refinement steps
    pub num_inference_steps: u32,

    /// Classifier-free guidance scale
    pub guidance_scale: f32,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Seed for the random generator; `None` means unseeded
    pub seed: Option<i64>,

    /// Strength applied to loaded LoRA weights, when any are loaded
    pub lora_scale: Option<f32>,
}

/// Trait for the text-to-image generation capability.
///
/// The handler is written against this seam; the real implementation
/// delegates synthesis, weight resolution, and tensor placement to an
/// external diffusion engine.
#[async_trait]
pub trait DiffusionPipeline: Send + Sync {
    /// Identifier of the base model this pipeline serves
    fn model_id(&self) -> &str;

    /// Compute device the pipeline ended up on
    fn device(&self) -> &str;

    /// Fetch and apply LoRA weights for the given reference
    /// (a URL or a repository id)
    async fn load_lora_weights(&mut self, reference: &str) -> Result<()>;

    /// Remove any currently applied LoRA weights
    async fn unload_lora_weights(&mut self) -> Result<()>;

    /// Produce an image for the given options
    async fn generate(&self, options: &GenerationOptions) -> Result<DynamicImage>;

    /// Check whether the pipeline can currently serve requests
    async fn health_check(&self) -> bool;
}
