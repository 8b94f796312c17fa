//! Main entry point for the SDXL LoRA serving endpoint

use sdxl_lora_serving::{
    api, config::Settings, handler::EndpointHandler, pipeline::EnginePipeline, AppState,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load()?;
    settings.validate()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.clone()));

    if settings.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    info!("Starting SDXL LoRA serving endpoint");
    info!(
        model = %settings.model.base_model,
        engine = %settings.engine.endpoint,
        "Loaded configuration: server={}:{}",
        settings.server.host,
        settings.server.port
    );

    // One-time blocking initialization: base model, device, optimizations
    let pipeline = EnginePipeline::connect(&settings.engine, &settings.model).await?;

    // The LoRA slot starts empty on every process start
    let handler = EndpointHandler::new(Box::new(pipeline));

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let app_state = Arc::new(AppState::new(settings, handler));

    // Build the router
    let app = api::routes::create_router(app_state);

    info!("Server listening on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
