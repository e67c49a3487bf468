use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported backends for round generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAI,
}

impl Provider {
    pub fn default_image_model(&self) -> &'static str {
        match self {
            Provider::Gemini => gemini_content::DEFAULT_IMAGE_MODEL,
            Provider::OpenAI => "gpt-image-1",
        }
    }

    pub fn default_text_model(&self) -> &'static str {
        match self {
            Provider::Gemini => gemini_content::DEFAULT_TEXT_MODEL,
            Provider::OpenAI => "gpt-4o",
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub gemini_api_key: Option<SecretString>,
    pub openai_api_key: Option<SecretString>,
    pub image_model: String,
    pub text_model: String,
    pub generation_timeout: Duration,
    pub log_level: Level,
    pub prompts_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_str =
            std::env::var("CONTENT_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "gemini" => Provider::Gemini,
            "openai" => Provider::OpenAI,
            other => {
                return Err(ConfigError::InvalidValue(
                    "CONTENT_PROVIDER".to_string(),
                    format!("'{}' is not one of 'gemini', 'openai'", other),
                ));
            }
        };

        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok().map(SecretString::from);
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok().map(SecretString::from);

        let image_model = std::env::var("IMAGE_MODEL")
            .unwrap_or_else(|_| provider.default_image_model().to_string());
        let text_model = std::env::var("TEXT_MODEL")
            .unwrap_or_else(|_| provider.default_text_model().to_string());

        let timeout_str =
            std::env::var("GENERATION_TIMEOUT_SECS").unwrap_or_else(|_| "90".to_string());
        let generation_timeout = timeout_str
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "GENERATION_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a positive number of seconds", timeout_str),
                )
            })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        match provider {
            Provider::Gemini => {
                if gemini_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "GEMINI_API_KEY must be set for 'gemini' provider".to_string(),
                    ));
                }
            }
            Provider::OpenAI => {
                if openai_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "OPENAI_API_KEY must be set for 'openai' provider".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            bind_address,
            provider,
            gemini_api_key,
            openai_api_key,
            image_model,
            text_model,
            generation_timeout,
            log_level,
            prompts_path,
        })
    }
}
