//! SDXL LoRA Serving
//!
//! A Rust serving endpoint for a text-to-image diffusion model with
//! per-request dynamic LoRA loading: requests may name a LoRA weight set
//! (URL or repository id) which is swapped into the long-lived pipeline,
//! cached by reference, and applied with a configurable strength.

pub mod api;
pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod pipeline;
pub mod response;

pub use error::{AppError, Result};

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use api::models::RequestStats;
use handler::EndpointHandler;

/// Request counters, shared across all routes
#[derive(Debug, Default)]
pub struct RequestMetrics {
    received: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl RequestMetrics {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RequestStats {
        RequestStats {
            received: self.received.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Application state shared across all handlers
///
/// The mutex serializes requests into the single handler slot; the
/// handler assumes exclusive access for the duration of one call.
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub handler: Arc<Mutex<EndpointHandler>>,
    pub metrics: RequestMetrics,
    pub model: String,
    pub device: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Assemble application state around an initialized handler
    pub fn new(settings: config::Settings, handler: EndpointHandler) -> Self {
        let model = handler.model_id().to_string();
        let device = handler.device().to_string();

        Self {
            settings: Arc::new(settings),
            handler: Arc::new(Mutex::new(handler)),
            metrics: RequestMetrics::default(),
            model,
            device,
            started_at: Utc::now(),
        }
    }
}
