//! Configuration module - settings loading and validation

pub mod settings;

pub use settings::{
    AuthConfig, EngineConfig, LoggingConfig, ModelConfig, ServerConfig, Settings,
};
