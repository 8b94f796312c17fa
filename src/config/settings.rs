//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    pub model: ModelConfig,
    pub engine: EngineConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
///
/// The hosting platform normally terminates authentication in front of the
/// endpoint, so this is disabled unless keys are explicitly configured.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_keys: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Base model configuration
///
/// The base model is fixed for the lifetime of the process; only LoRA
/// weights are swapped per request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default = "default_base_model")]
    pub base_model: String,
    #[serde(default = "default_dtype")]
    pub dtype: String,
    #[serde(default = "default_true")]
    pub attention_slicing: bool,
    #[serde(default = "default_preferred_device")]
    pub preferred_device: String,
    #[serde(default = "default_fallback_device")]
    pub fallback_device: String,
}

fn default_base_model() -> String {
    "stabilityai/stable-diffusion-xl-base-1.0".to_string()
}

fn default_dtype() -> String {
    "fp16".to_string()
}

fn default_true() -> bool {
    true
}

fn default_preferred_device() -> String {
    "cuda".to_string()
}

fn default_fallback_device() -> String {
    "cpu".to_string()
}

/// Diffusion engine worker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_engine_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_health_check_path")]
    pub health_check_path: String,
}

fn default_engine_endpoint() -> String {
    "http://127.0.0.1:7860".to_string()
}

fn default_engine_timeout() -> u64 {
    120000
}

fn default_health_check_path() -> String {
    "/health".to_string()
}

impl Settings {
    /// Load settings from the default configuration file and environment
    /// variables. `SDXL_SERVING_CONFIG` overrides the file location.
    pub fn load() -> Result<Self> {
        let path = std::env::var("SDXL_SERVING_CONFIG")
            .unwrap_or_else(|_| "config/endpoint.yaml".to_string());
        Self::load_from_path(path)
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let format = if path.extension().map_or(false, |ext| ext == "yaml" || ext == "yml") {
            FileFormat::Yaml
        } else {
            FileFormat::Toml
        };

        let mut builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("auth.enabled", false)?
            .set_default("auth.api_keys", Vec::<String>::new())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .set_default("model.base_model", default_base_model())?
            .set_default("model.dtype", default_dtype())?
            .set_default("model.attention_slicing", true)?
            .set_default("model.preferred_device", default_preferred_device())?
            .set_default("model.fallback_device", default_fallback_device())?
            .set_default("engine.endpoint", default_engine_endpoint())?
            .set_default("engine.timeout_ms", default_engine_timeout() as i64)?
            .set_default("engine.health_check_path", default_health_check_path())?;

        if path.exists() {
            builder = builder.add_source(File::from(path).format(format));
        }

        builder = builder.add_source(
            Environment::with_prefix("SDXL_SERVING")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "Server port cannot be 0".to_string(),
            )));
        }

        if self.model.base_model.is_empty() {
            return Err(AppError::Config(config::ConfigError::Message(
                "Base model identifier cannot be empty".to_string(),
            )));
        }

        if self.engine.endpoint.is_empty() {
            return Err(AppError::Config(config::ConfigError::Message(
                "Engine endpoint cannot be empty".to_string(),
            )));
        }

        if self.auth.enabled && self.auth.api_keys.is_empty() {
            return Err(AppError::Config(config::ConfigError::Message(
                "Authentication is enabled but no API keys are configured".to_string(),
            )));
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            auth: AuthConfig {
                enabled: false,
                api_keys: vec![],
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
            model: ModelConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_model: default_base_model(),
            dtype: default_dtype(),
            attention_slicing: true,
            preferred_device: default_preferred_device(),
            fallback_device: default_fallback_device(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: default_engine_endpoint(),
            timeout_ms: default_engine_timeout(),
            health_check_path: default_health_check_path(),
        }
    }
}
