//! Request handler - LoRA slot management and generation
//!
//! One handler instance owns the pipeline and the LoRA slot for the
//! lifetime of the process. Calls into [`EndpointHandler::handle`] must be
//! serialized by the caller; the handler itself holds no locks.

pub mod lora;

use tracing::{error, info, warn};

use crate::api::models::InferenceRequest;
use crate::error::Result;
use crate::pipeline::{DiffusionPipeline, GenerationOptions};
use crate::response::png;
use lora::{plan_transition, LoraAction, SwapOutcome};

/// Serves inference requests against a single long-lived pipeline,
/// swapping LoRA weights in and out as requests ask for them.
pub struct EndpointHandler {
    pipeline: Box<dyn DiffusionPipeline>,
    /// Reference of the LoRA currently applied to the pipeline.
    /// This field is the single source of truth for the slot state.
    active_lora: Option<String>,
}

impl EndpointHandler {
    /// Wrap an initialized pipeline. The LoRA slot starts empty.
    pub fn new(pipeline: Box<dyn DiffusionPipeline>) -> Self {
        Self {
            pipeline,
            active_lora: None,
        }
    }

    /// Reference of the currently applied LoRA weights, if any
    pub fn active_lora(&self) -> Option<&str> {
        self.active_lora.as_deref()
    }

    /// Identifier of the base model being served
    pub fn model_id(&self) -> &str {
        self.pipeline.model_id()
    }

    /// Compute device the pipeline runs on
    pub fn device(&self) -> &str {
        self.pipeline.device()
    }

    /// Probe the pipeline for liveness
    pub async fn pipeline_healthy(&self) -> bool {
        self.pipeline.health_check().await
    }

    /// Serve one request: reconcile the LoRA slot, generate, and return
    /// the image as a base64-encoded PNG string.
    ///
    /// LoRA failures degrade to base-model output; generation failures
    /// propagate to the caller unchanged.
    pub async fn handle(&mut self, request: InferenceRequest) -> Result<String> {
        let params = request.parameters;

        let outcome = self.reconcile_lora(params.lora_url.as_deref()).await;
        if outcome == SwapOutcome::DegradedToBase {
            warn!("Serving request with the base model after LoRA load failure");
        }

        let seed = params.effective_seed();
        let options = GenerationOptions {
            prompt: request.inputs,
            negative_prompt: params.negative_prompt,
            num_inference_steps: params.num_inference_steps,
            guidance_scale: params.guidance_scale,
            width: params.width,
            height: params.height,
            seed,
            // Only meaningful while LoRA weights are applied
            lora_scale: self.active_lora.as_ref().map(|_| params.lora_scale),
        };

        if let Some(seed) = options.seed {
            info!(seed, device = %self.pipeline.device(), "Using seeded generator");
        }

        let image = self.pipeline.generate(&options).await.map_err(|e| {
            error!(error = %e, "Image generation failed");
            e
        })?;

        png::encode_png(&image)
    }

    /// Bring the pipeline's LoRA state in line with the request.
    ///
    /// The slot field records desired state: an unload failure is logged
    /// and does not keep stale weights pinned in the field, while a load
    /// failure empties the slot so generation falls back to the base model.
    async fn reconcile_lora(&mut self, requested: Option<&str>) -> SwapOutcome {
        let (actions, target) = plan_transition(self.active_lora.as_deref(), requested);

        if actions.is_empty() {
            if self.active_lora.is_some() {
                info!(lora = ?self.active_lora, "LoRA already loaded (cached)");
            }
            return SwapOutcome::Unchanged;
        }

        let mut outcome = if target.is_some() {
            SwapOutcome::Swapped
        } else {
            SwapOutcome::Cleared
        };
        self.active_lora = target;

        for action in actions {
            match action {
                LoraAction::Unload => match self.pipeline.unload_lora_weights().await {
                    Ok(()) => info!("Unloaded previous LoRA"),
                    Err(e) => warn!(error = %e, "Failed to unload LoRA weights"),
                },
                LoraAction::Load(reference) => {
                    match self.pipeline.load_lora_weights(&reference).await {
                        Ok(()) => info!(lora = %reference, "LoRA loaded"),
                        Err(e) => {
                            warn!(lora = %reference, error = %e, "Failed to load LoRA weights");
                            self.active_lora = None;
                            outcome = SwapOutcome::DegradedToBase;
                        }
                    }
                }
            }
        }

        outcome
    }
}
